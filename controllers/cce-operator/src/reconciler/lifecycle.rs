//! Cluster lifecycle handlers
//!
//! One handler per phase: `create` for a new record, `import_cluster` for an
//! adopted one, `wait_for_creation_complete` while the provider builds the
//! cluster, and `check_and_update` once it exists. Busy provider states are
//! never contended with; the handler asks to be run again later instead.

use super::requests::{create_cluster_request, update_cluster_request, upgrade_cluster_request};
use super::upstream::build_upstream_cluster_state;
use super::validate::{validate_create_fields, validate_update};
use super::{Outcome, Reconciler, record_key};
use crate::error::ControllerError;
use cce_client::{self as cloud, CloudClientTrait, ClusterState, UpgradeTaskState};
use crds::{ClusterConfig, ClusterEndpoint, ClusterPhase};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

const EXTERNAL_CERT_CONTEXT: &str = "externalClusterTLSVerify";
const INTERNAL_CERT_CONTEXT: &str = "internalCluster";

/// Whether `target` is a newer major.minor than `current`
///
/// Patch levels and pre-release suffixes are ignored. A target older than
/// the current version is an error.
pub fn cluster_upgradeable(current: &str, target: &str) -> Result<bool, ControllerError> {
    if current == target {
        return Ok(false);
    }
    let from = major_minor(current)?;
    let to = major_minor(target)?;
    match to.cmp(&from) {
        std::cmp::Ordering::Equal => Ok(false),
        std::cmp::Ordering::Greater => Ok(true),
        std::cmp::Ordering::Less => Err(ControllerError::Validation(format!(
            "unsupported to downgrade cluster from {:?} to {:?}",
            current, target
        ))),
    }
}

fn major_minor(version: &str) -> Result<(u64, u64), ControllerError> {
    let invalid = || ControllerError::Validation(format!("invalid version {:?}", version));
    let core = version
        .trim_start_matches('v')
        .split(['-', '+'])
        .next()
        .unwrap_or_default();
    let parts = core
        .split('.')
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    match parts.as_slice() {
        [major, minor] | [major, minor, _] => Ok((*major, *minor)),
        _ => Err(invalid()),
    }
}

/// Host of the last `External` endpoint, if any parses as a URL
fn external_endpoint_host(cluster: &cloud::Cluster) -> Option<String> {
    cluster
        .status
        .as_ref()?
        .endpoints
        .iter()
        .filter(|e| e.endpoint_type.as_deref() == Some("External"))
        .filter_map(|e| url::Url::parse(e.url.as_deref()?).ok())
        .filter_map(|u| u.host_str().map(str::to_string))
        .last()
}

fn endpoints(cluster: &cloud::Cluster) -> Vec<ClusterEndpoint> {
    cluster
        .status
        .iter()
        .flat_map(|s| s.endpoints.iter())
        .map(|e| ClusterEndpoint {
            url: e.url.clone().unwrap_or_default(),
            endpoint_type: e.endpoint_type.clone().unwrap_or_default(),
        })
        .collect()
}

/// Pick the kubeconfig context the endpoint secret is built from
///
/// The external context wins when public access is on; otherwise the last
/// internal context is used.
pub(crate) fn select_cert_endpoint(cert: &cloud::ClusterCert, public_access: bool) -> Option<&cloud::ClusterCertEndpoint> {
    if public_access {
        if let Some(external) = cert
            .clusters
            .iter()
            .find(|c| c.name.as_deref() == Some(EXTERNAL_CERT_CONTEXT))
        {
            return external.cluster.as_ref();
        }
    }
    cert.clusters
        .iter()
        .filter(|c| c.name.as_deref() == Some(INTERNAL_CERT_CONTEXT))
        .last()
        .and_then(|c| c.cluster.as_ref())
}

/// Secret named after the record holding the API endpoint and CA data
pub(crate) fn endpoint_secret(config: &ClusterConfig, endpoint: String, ca: String) -> Secret {
    let owner = OwnerReference {
        api_version: ClusterConfig::api_version(&()).to_string(),
        kind: ClusterConfig::kind(&()).to_string(),
        name: config.name_any(),
        uid: config.uid().unwrap_or_default(),
        ..OwnerReference::default()
    };
    Secret {
        metadata: ObjectMeta {
            name: Some(config.name_any()),
            namespace: config.namespace(),
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([
            ("endpoint".to_string(), ByteString(endpoint.into_bytes())),
            ("ca".to_string(), ByteString(ca.into_bytes())),
        ])),
        ..Secret::default()
    }
}

impl Reconciler {
    /// Handler for a record that has not been created yet
    pub(crate) async fn create(&self, config: &ClusterConfig) -> Result<Outcome, ControllerError> {
        self.check_duplicate_record_name(config).await?;
        validate_create_fields(config)?;
        let driver = self.driver(config).await?;
        self.validate_against_provider(driver.as_ref(), config).await?;

        if config.spec.imported {
            info!(
                "Importing cluster {} for ClusterConfig {}",
                config.spec.cluster_id,
                record_key(config)
            );
            self.set_phase(config, ClusterPhase::Importing).await?;
            return Ok(Outcome::Requeue(Duration::ZERO));
        }

        let config = self.provision_network(driver.as_ref(), config).await?;

        let recorded_id = config.observed().cluster_id.clone();
        if !recorded_id.is_empty() {
            match driver.show_cluster(&recorded_id).await {
                Ok(_) => {
                    info!(
                        "Cluster {} for ClusterConfig {} already exists, waiting for creation",
                        recorded_id,
                        record_key(&config)
                    );
                    self.set_phase(&config, ClusterPhase::Creating).await?;
                    return Ok(Outcome::Requeue(self.settings.creation_poll));
                }
                Err(e) if e.is_not_found() => {
                    debug!(
                        "Recorded cluster {} for ClusterConfig {} is gone, creating again",
                        recorded_id,
                        record_key(&config)
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        let created = driver.create_cluster(&create_cluster_request(&config)).await?;
        self.metrics.record_provider_call("create_cluster");
        let cluster_id = created
            .metadata
            .and_then(|m| m.uid)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ControllerError::InvalidResponse("create cluster returned invalid value".to_string()))?;
        info!(
            "Requested cluster {} ({}) for ClusterConfig {}",
            config.spec.name,
            cluster_id,
            record_key(&config)
        );

        self.update_status(&config, |status| {
            status.cluster_id = cluster_id.clone();
            status.phase = ClusterPhase::Creating;
            status.failure_message.clear();
        })
        .await?;
        Ok(Outcome::Requeue(self.settings.creation_poll))
    }

    /// Handler for an adopted cluster: copy the observed state, then go active
    pub(crate) async fn import_cluster(&self, config: &ClusterConfig) -> Result<Outcome, ControllerError> {
        let driver = self.driver(config).await?;
        let cluster_id = config.spec.cluster_id.clone();
        let cluster = driver.show_cluster(&cluster_id).await?;
        let pools = driver.list_node_pools(&cluster_id).await?;
        let upstream = build_upstream_cluster_state(&cluster, &pools)?;

        let external_ip = external_endpoint_host(&cluster).unwrap_or_default();
        if !external_ip.is_empty() {
            info!(
                "Imported cluster {} for ClusterConfig {} has external IP {}",
                cluster_id,
                record_key(config),
                external_ip
            );
        }
        let endpoints = endpoints(&cluster);
        let zone = cluster.spec.as_ref().and_then(|s| s.az.clone()).unwrap_or_default();

        let config = self
            .update_status(config, |status| {
                status.cluster_id = cluster_id.clone();
                status.node_pools = upstream.node_pools.clone();
                status.host_network = upstream.host_network.clone();
                status.container_network = upstream.container_network.clone();
                status.cluster_external_ip = external_ip.clone();
                status.endpoints = endpoints.clone();
                status.available_zone = zone.clone();
            })
            .await?;

        self.create_ca_secret(driver.as_ref(), &config).await?;
        self.set_phase(&config, ClusterPhase::Active).await?;
        Ok(Outcome::Done)
    }

    /// Handler while the provider builds the cluster
    pub(crate) async fn wait_for_creation_complete(&self, config: &ClusterConfig) -> Result<Outcome, ControllerError> {
        let driver = self.driver(config).await?;
        let cluster = driver.show_cluster(&config.observed().cluster_id).await?;
        let (Some(status), Some(metadata)) = (&cluster.status, &cluster.metadata) else {
            return Err(ControllerError::InvalidResponse(
                "show cluster returned invalid value".to_string(),
            ));
        };

        match status.phase {
            Some(ClusterState::Unavailable) => Err(ControllerError::Operation(format!(
                "creation failed for cluster {:?}: {}",
                metadata.name,
                status.reason.as_deref().unwrap_or_default()
            ))),
            Some(ClusterState::Available) => {
                self.create_ca_secret(driver.as_ref(), config)
                    .await
                    .map_err(|e| ControllerError::Operation(format!("createCASecret: {}", e.failure_message())))?;
                info!("Cluster {} for ClusterConfig {} created", metadata.name, record_key(config));
                self.set_phase(config, ClusterPhase::Updating).await?;
                Ok(Outcome::Requeue(Duration::ZERO))
            }
            phase => {
                info!(
                    "Waiting for cluster {} of ClusterConfig {}, provider status {:?}",
                    metadata.name,
                    record_key(config),
                    phase
                );
                Ok(Outcome::Requeue(self.settings.creation_poll))
            }
        }
    }

    /// Create the endpoint secret unless it already exists
    pub(crate) async fn create_ca_secret(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<(), ControllerError> {
        let namespace = config.namespace().unwrap_or_default();
        let name = config.name_any();
        if self.store.get_secret(&namespace, &name).await?.is_some() {
            debug!("Endpoint secret {}/{} already exists", namespace, name);
            return Ok(());
        }

        let cert = driver
            .create_cluster_cert(&config.observed().cluster_id, self.settings.ca_cert_days)
            .await?;
        if cert.clusters.is_empty() {
            return Err(ControllerError::InvalidResponse(
                "createCASecret failed: no clusters returned".to_string(),
            ));
        }
        let endpoint = select_cert_endpoint(&cert, config.spec.public_access)
            .ok_or_else(|| ControllerError::InvalidResponse("failed to find cluster endpoint".to_string()))?;

        let secret = endpoint_secret(
            config,
            endpoint.server.clone().unwrap_or_default(),
            endpoint.certificate_authority_data.clone().unwrap_or_default(),
        );
        match self.store.create_secret(&namespace, &secret).await {
            Ok(_) => {
                info!("Created endpoint secret {}/{}", namespace, name);
                Ok(())
            }
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Handler for an existing cluster: wait out busy states, then converge
    pub(crate) async fn check_and_update(&self, config: &ClusterConfig) -> Result<Outcome, ControllerError> {
        if let Err(e) = validate_update(config) {
            // Counts as a failing update until the spec is fixed
            self.set_phase(config, ClusterPhase::Updating).await?;
            return Err(e);
        }

        let driver = self.driver(config).await?;
        let cluster_id = config.observed().cluster_id.clone();
        let cluster = driver.show_cluster(&cluster_id).await?;
        let (Some(state), Some(cluster_spec)) = (cluster.state(), &cluster.spec) else {
            return Err(ControllerError::InvalidResponse(
                "show cluster returned invalid data".to_string(),
            ));
        };
        if matches!(
            state,
            ClusterState::Deleting | ClusterState::Resizing | ClusterState::Upgrading
        ) {
            info!(
                "Waiting for cluster {} of ClusterConfig {} to leave status {:?}",
                cluster_id,
                record_key(config),
                state
            );
            return self.enqueue_update(config, self.settings.busy_wait).await;
        }

        let mut config = config.clone();
        let zone = cluster_spec.az.clone().unwrap_or_default();
        if config.observed().available_zone != zone {
            config = self
                .update_status(&config, |status| status.available_zone = zone.clone())
                .await?;
        }

        let task_id = config.observed().upgrade_cluster_task_id.clone();
        if !task_id.is_empty() {
            match self.poll_upgrade_task(driver.as_ref(), &config, &task_id).await? {
                Some(updated) => config = updated,
                None => return self.enqueue_update(&config, self.settings.busy_wait).await,
            }
        }

        let raw_pools = driver.list_node_pools(&cluster_id).await?;
        if raw_pools.is_empty() {
            info!("Cluster {} of ClusterConfig {} has no node pools", cluster_id, record_key(&config));
        }
        if let Some(busy) = raw_pools.iter().find(|p| p.state().is_some_and(|s| s.is_busy())) {
            info!(
                "Waiting for node pool {} of ClusterConfig {}, status {:?}",
                busy.metadata.as_ref().map(|m| m.name.as_str()).unwrap_or_default(),
                record_key(&config),
                busy.state()
            );
            return self.enqueue_update(&config, self.settings.busy_wait).await;
        }

        let upstream = build_upstream_cluster_state(&cluster, &raw_pools)?;
        let observed = config.observed();
        if observed.node_pools != upstream.node_pools
            || observed.host_network != upstream.host_network
            || observed.container_network != upstream.container_network
        {
            config = self
                .update_status(&config, |status| {
                    status.node_pools = upstream.node_pools.clone();
                    status.host_network = upstream.host_network.clone();
                    status.container_network = upstream.container_network.clone();
                })
                .await?;
        }

        if config.spec.imported {
            if config.spec.node_pools.is_empty() && !upstream.node_pools.is_empty() {
                debug!(
                    "Adopting {} observed node pools into ClusterConfig {}",
                    upstream.node_pools.len(),
                    record_key(&config)
                );
                config = self
                    .update_spec(&config, |spec| spec.node_pools = upstream.node_pools.clone())
                    .await?;
            }
            self.set_phase(&config, ClusterPhase::Active).await?;
            return Ok(Outcome::Done);
        }

        if !config.spec.version.is_empty()
            && !upstream.version.is_empty()
            && cluster_upgradeable(&upstream.version, &config.spec.version)?
        {
            let task = driver
                .upgrade_cluster(&cluster_id, &upgrade_cluster_request(&config.spec.version))
                .await?;
            self.metrics.record_provider_call("upgrade_cluster");
            let task_id = task
                .metadata
                .and_then(|m| m.uid)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ControllerError::InvalidResponse("upgrade cluster returned invalid value".to_string()))?;
            info!(
                "Upgrading cluster {} of ClusterConfig {} from {} to {}, task {}",
                cluster_id,
                record_key(&config),
                upstream.version,
                config.spec.version,
                task_id
            );
            config = self
                .update_status(&config, |status| status.upgrade_cluster_task_id = task_id.clone())
                .await?;
            return self.enqueue_update(&config, self.settings.converge_requeue).await;
        }

        let mut changed = false;
        let security_group = &config.spec.host_network.security_group;
        if config.spec.description != upstream.description
            || (!security_group.is_empty() && *security_group != upstream.host_network.security_group)
        {
            driver
                .update_cluster(&cluster_id, &update_cluster_request(&config))
                .await?;
            self.metrics.record_provider_call("update_cluster");
            info!("Updated metadata of cluster {} for ClusterConfig {}", cluster_id, record_key(&config));
            changed = true;
        }

        let deleting: HashSet<String> = raw_pools
            .iter()
            .filter(|p| p.state() == Some(&cloud::NodePoolState::Deleting))
            .filter_map(|p| p.metadata.as_ref().and_then(|m| m.uid.clone()))
            .collect();
        let (config, pools_changed) = self
            .converge_node_pools(driver.as_ref(), &config, &upstream.node_pools, &deleting)
            .await?;
        changed |= pools_changed;

        if changed {
            return self.enqueue_update(&config, self.settings.converge_requeue).await;
        }
        if config.phase() != ClusterPhase::Active {
            info!("ClusterConfig {} finished updating", record_key(&config));
        }
        self.set_phase(&config, ClusterPhase::Active).await?;
        Ok(Outcome::Done)
    }

    /// Poll the recorded upgrade task
    ///
    /// Returns the record with the task cleared once it succeeded or expired,
    /// `None` while it is still running.
    async fn poll_upgrade_task(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
        task_id: &str,
    ) -> Result<Option<ClusterConfig>, ControllerError> {
        let cluster_id = &config.observed().cluster_id;
        let phase = match driver.show_upgrade_task(cluster_id, task_id).await {
            Ok(task) => task.status.and_then(|s| s.phase),
            Err(e) if e.is_not_found() => {
                debug!("Upgrade task {} of ClusterConfig {} expired", task_id, record_key(config));
                Some(UpgradeTaskState::Success)
            }
            Err(e) => return Err(e.into()),
        };

        match phase {
            Some(UpgradeTaskState::Success) => {
                info!("Upgrade task {} of ClusterConfig {} finished", task_id, record_key(config));
                let updated = self
                    .update_status(config, |status| status.upgrade_cluster_task_id.clear())
                    .await?;
                Ok(Some(updated))
            }
            Some(UpgradeTaskState::Failed) => {
                self.update_status(config, |status| status.upgrade_cluster_task_id.clear())
                    .await?;
                Err(ControllerError::Operation(format!(
                    "upgrade task {} for cluster {} failed",
                    task_id, cluster_id
                )))
            }
            phase => {
                info!(
                    "Waiting for upgrade task {} of ClusterConfig {}, status {:?}",
                    task_id,
                    record_key(config),
                    phase
                );
                Ok(None)
            }
        }
    }
}
