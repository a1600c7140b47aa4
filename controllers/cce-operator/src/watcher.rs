//! ClusterConfig watcher.
//!
//! Drives the reconciler from a `kube_runtime::Controller`. The runtime
//! guarantees at most one in-flight reconciliation per record, reconnects the
//! watch on failure and stops on SIGTERM or ctrl-c.
//!
//! Handler outcomes map onto runtime actions here: a finished pass is
//! revisited after the resync interval, a requeue keeps its delay, and a
//! failure is retried with the record's Fibonacci backoff.

use crate::error::ControllerError;
use crate::metrics::ReconcileOutcome;
use crate::reconciler::{Outcome, Reconciler, record_key};
use crds::ClusterConfig;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{Controller, watcher, controller::{Action, Config as ControllerConfig}};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Wait after the last event before reconciling, so bursts of status
/// writes collapse into one pass
const DEBOUNCE: Duration = Duration::from_secs(5);

/// Watches ClusterConfig resources and reconciles them.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    api: Api<ClusterConfig>,
    concurrency: u16,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, api: Api<ClusterConfig>, concurrency: u16) -> Self {
        Self {
            reconciler,
            api,
            concurrency,
        }
    }

    /// Run the controller loop until a shutdown signal arrives
    pub async fn watch_cluster_configs(&self) -> Result<(), ControllerError> {
        info!(
            "Starting ClusterConfig watcher (concurrency {})",
            self.concurrency
        );

        let controller_config = ControllerConfig::default()
            .debounce(DEBOUNCE)
            .concurrency(self.concurrency);

        Controller::new(self.api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((object, action)) => debug!("Reconciled {}: {:?}", object, action),
                    Err(e) => error!("ClusterConfig controller error: {}", e),
                }
            })
            .await;

        info!("ClusterConfig watcher stopped");
        Ok(())
    }
}

/// One reconciliation pass as seen by the runtime
pub async fn reconcile(config: Arc<ClusterConfig>, reconciler: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let key = record_key(&config);
    let started = Instant::now();

    match reconciler.reconcile_cluster_config(&config).await {
        Ok(Outcome::Done) => {
            reconciler.reset_error(&key);
            reconciler
                .metrics()
                .record_reconcile(ReconcileOutcome::Success, started.elapsed());
            Ok(Action::requeue(reconciler.settings().resync_interval))
        }
        Ok(Outcome::Requeue(delay)) => {
            reconciler.reset_error(&key);
            reconciler
                .metrics()
                .record_reconcile(ReconcileOutcome::Requeue, started.elapsed());
            debug!("ClusterConfig {} requeued in {:?}", key, delay);
            Ok(Action::requeue(delay))
        }
        Err(e) => {
            reconciler
                .metrics()
                .record_reconcile(ReconcileOutcome::Error, started.elapsed());
            Err(e)
        }
    }
}

/// Requeue a failed record with its Fibonacci backoff
pub fn error_policy(config: Arc<ClusterConfig>, error: &ControllerError, reconciler: Arc<Reconciler>) -> Action {
    let key = record_key(&config);
    reconciler.increment_error(&key);
    let (backoff, error_count) = reconciler.get_backoff_for_resource(&key);
    warn!(
        "Reconciliation of ClusterConfig {} failed (attempt {}), retrying in {:?}: {}",
        key, error_count, backoff, error
    );
    Action::requeue(backoff)
}
