//! Reconciliation logic for ClusterConfig resources.
//!
//! This module is organized by lifecycle stage:
//! - `validate`: create, import and update validation
//! - `provisioner`: network prerequisites created before the cluster
//! - `lifecycle`: create, import, creation polling, upgrade and update passes
//! - `nodepool`: node pool convergence
//! - `teardown`: ordered deletion when a record is removed
//! - `upstream` / `requests`: conversions between the record and provider models
//!
//! Every handler returns an [`Outcome`] or an error. The dispatcher is the only
//! place that writes `status.failureMessage`, and it never blocks on a
//! provider operation: long waits are expressed as a requeue delay.

pub mod requests;
pub mod upstream;
mod lifecycle;
mod nodepool;
mod provisioner;
mod teardown;
mod validate;

#[cfg(test)]
mod lifecycle_test;
#[cfg(test)]
mod nodepool_test;
#[cfg(test)]
mod teardown_test;

pub use lifecycle::cluster_upgradeable;
pub use validate::{validate_create_fields, validate_node_pools, validate_update};

use crate::backoff::FibonacciBackoff;
use crate::driver::DriverCache;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::settings::Settings;
use crate::store::{ClusterConfigStore, update_spec_with_retry, update_status_with_retry};
use cce_client::CloudClientTrait;
use crds::{ClusterConfig, ClusterConfigSpec, ClusterConfigStatus, ClusterPhase};
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Finalizer guarding cloud resources until teardown completes
pub const FINALIZER: &str = "cce.dcops.microscaler.io/cluster-cleanup";

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing left to do until the record changes
    Done,
    /// Run again after the delay
    Requeue(Duration),
}

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::default(),
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// `namespace/name` of a record, used in logs and as the backoff key
pub fn record_key(config: &ClusterConfig) -> String {
    format!("{}/{}", config.namespace().unwrap_or_default(), config.name_any())
}

/// Whether the record holds the id of any cluster or network resource
fn has_provider_resources(config: &ClusterConfig) -> bool {
    let status = config.observed();
    [
        &config.spec.cluster_id,
        &status.cluster_id,
        &status.created_vpc_id,
        &status.created_subnet_id,
        &status.created_nat_gateway_id,
        &status.created_snat_rule_id,
        &status.created_cluster_eip_id,
        &status.created_snat_rule_eip_id,
    ]
    .iter()
    .any(|id| !id.is_empty())
}

/// Reconciles ClusterConfig resources.
pub struct Reconciler {
    pub(crate) store: Arc<dyn ClusterConfigStore>,
    pub(crate) drivers: DriverCache,
    pub(crate) settings: Settings,
    pub(crate) metrics: Metrics,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(store: Arc<dyn ClusterConfigStore>, drivers: DriverCache, settings: Settings, metrics: Metrics) -> Self {
        Self {
            store,
            drivers,
            settings,
            metrics,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Tunables in use
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Metrics sink
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one reconciliation pass over a record
    ///
    /// Records marked for deletion go through teardown. Everything else gets
    /// the finalizer, then the handler for its phase, and the result passes
    /// through the error-recording wrapper.
    pub async fn reconcile_cluster_config(&self, config: &ClusterConfig) -> Result<Outcome, ControllerError> {
        if config.metadata.deletion_timestamp.is_some() {
            return self.on_remove(config).await;
        }

        let config = self.ensure_finalizer(config).await?;
        let result = self.dispatch(&config).await;
        self.record_error(&config, result).await
    }

    async fn dispatch(&self, config: &ClusterConfig) -> Result<Outcome, ControllerError> {
        debug!(
            "Reconciling ClusterConfig {} in phase {:?}",
            record_key(config),
            config.phase().as_str()
        );
        match config.phase() {
            ClusterPhase::NotCreated => self.create(config).await,
            ClusterPhase::Importing => self.import_cluster(config).await,
            ClusterPhase::Creating => self.wait_for_creation_complete(config).await,
            ClusterPhase::Active | ClusterPhase::Updating => self.check_and_update(config).await,
        }
    }

    /// Deletion hook
    ///
    /// Imported clusters are released without touching the provider. Owned
    /// clusters keep the finalizer until teardown reports nothing left to do.
    async fn on_remove(&self, config: &ClusterConfig) -> Result<Outcome, ControllerError> {
        if !config.finalizers().iter().any(|f| f == FINALIZER) {
            return Ok(Outcome::Done);
        }

        if config.spec.imported {
            info!(
                "ClusterConfig {} is imported, releasing without deleting cloud resources",
                record_key(config)
            );
        } else if !has_provider_resources(config) {
            info!(
                "ClusterConfig {} never provisioned cloud resources, releasing",
                record_key(config)
            );
        } else {
            let driver = self.driver(config).await?;
            if let Outcome::Requeue(delay) = self.teardown(driver.as_ref(), config).await? {
                return Ok(Outcome::Requeue(delay));
            }
            info!("Teardown of ClusterConfig {} complete", record_key(config));
        }

        self.store.remove_finalizer(config, FINALIZER).await?;
        Ok(Outcome::Done)
    }

    async fn ensure_finalizer(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError> {
        if config.finalizers().iter().any(|f| f == FINALIZER) {
            return Ok(config.clone());
        }
        debug!("Adding finalizer to ClusterConfig {}", record_key(config));
        self.store.add_finalizer(config, FINALIZER).await
    }

    /// Write the handler's failure into `status.failureMessage`
    ///
    /// A repeat of the recorded message is not written again; instead the
    /// pass sleeps for the throttle delay. A new failure moves an active
    /// record to updating. The handler's result is returned unchanged.
    async fn record_error(
        &self,
        config: &ClusterConfig,
        result: Result<Outcome, ControllerError>,
    ) -> Result<Outcome, ControllerError> {
        let message = match &result {
            Ok(_) => String::new(),
            Err(e) => {
                warn!("Reconciliation of ClusterConfig {} failed: {}", record_key(config), e);
                e.failure_message()
            }
        };

        if config.observed().failure_message == message {
            if !message.is_empty() {
                tokio::time::sleep(self.settings.duplicate_failure_throttle).await;
            }
            return result;
        }

        let recorded = self
            .update_status(config, |status| {
                if !message.is_empty() && status.phase == ClusterPhase::Active {
                    status.phase = ClusterPhase::Updating;
                }
                status.failure_message = message.clone();
            })
            .await;
        if let Err(e) = recorded {
            error!(
                "Error recording ClusterConfig {} failure message: {}",
                record_key(config),
                e
            );
        }
        result
    }

    /// Cloud client for the record's credentials
    pub(crate) async fn driver(&self, config: &ClusterConfig) -> Result<Arc<dyn CloudClientTrait>, ControllerError> {
        self.drivers.driver_for(self.store.as_ref(), config).await
    }

    /// Compare-and-swap status write
    pub(crate) async fn update_status<F>(&self, config: &ClusterConfig, mutate: F) -> Result<ClusterConfig, ControllerError>
    where
        F: FnMut(&mut ClusterConfigStatus) + Send,
    {
        update_status_with_retry(self.store.as_ref(), config, self.settings.status_retries, mutate).await
    }

    /// Compare-and-swap spec write
    pub(crate) async fn update_spec<F>(&self, config: &ClusterConfig, mutate: F) -> Result<ClusterConfig, ControllerError>
    where
        F: FnMut(&mut ClusterConfigSpec) + Send,
    {
        update_spec_with_retry(self.store.as_ref(), config, self.settings.status_retries, mutate).await
    }

    /// Move the record to `phase`, skipping the write when already there
    pub(crate) async fn set_phase(&self, config: &ClusterConfig, phase: ClusterPhase) -> Result<ClusterConfig, ControllerError> {
        if config.phase() == phase {
            return Ok(config.clone());
        }
        info!(
            "ClusterConfig {} phase {:?} -> {:?}",
            record_key(config),
            config.phase().as_str(),
            phase.as_str()
        );
        self.update_status(config, |status| status.phase = phase).await
    }

    /// Keep the record in `updating` and come back after `delay`
    pub(crate) async fn enqueue_update(&self, config: &ClusterConfig, delay: Duration) -> Result<Outcome, ControllerError> {
        self.set_phase(config, ClusterPhase::Updating).await?;
        Ok(Outcome::Requeue(delay))
    }

    /// Get the Fibonacci backoff duration for a resource based on its error count
    ///
    /// Returns (backoff, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(resource_key.to_string()).or_insert_with(BackoffState::new);
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(60), 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}
