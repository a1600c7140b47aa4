//! Record store for ClusterConfig resources.
//!
//! The reconciler only reaches the Kubernetes API through
//! [`ClusterConfigStore`]: record reads and writes, finalizers, and the two
//! secrets it touches (the credential secret it reads and the endpoint
//! secret it creates). [`KubeStore`] is the production implementation; the
//! tests run against an in-memory store with the same conflict semantics.
//!
//! Writes never mutate the caller's record. Every write returns the record as
//! stored, and callers replace their copy only with that value.

mod kube_store;
#[cfg(test)]
pub mod memory;

pub use kube_store::KubeStore;

use crate::error::ControllerError;
use crds::{ClusterConfig, ClusterConfigSpec, ClusterConfigStatus};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::{debug, warn};

/// Storage operations on ClusterConfig records and companion secrets
#[async_trait::async_trait]
pub trait ClusterConfigStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<ClusterConfig, ControllerError>;

    /// List records in one namespace, or in all namespaces for `None`
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ClusterConfig>, ControllerError>;

    /// Write spec and metadata; fails with a conflict if the record changed
    async fn update(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError>;

    /// Write the status subresource; fails with a conflict if the record changed
    async fn update_status(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError>;

    async fn add_finalizer(&self, config: &ClusterConfig, finalizer: &str) -> Result<ClusterConfig, ControllerError>;

    async fn remove_finalizer(&self, config: &ClusterConfig, finalizer: &str) -> Result<(), ControllerError>;

    /// Fetch a secret, `None` when it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ControllerError>;

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, ControllerError>;
}

/// Apply `mutate` to the record's status and persist it, retrying on conflict
///
/// The first attempt uses `config` as given; after a conflict the record is
/// re-fetched and the mutation reapplied to the fresh copy. Gives up after
/// `retries` attempts and returns the last conflict.
pub async fn update_status_with_retry<F>(
    store: &dyn ClusterConfigStore,
    config: &ClusterConfig,
    retries: u32,
    mut mutate: F,
) -> Result<ClusterConfig, ControllerError>
where
    F: FnMut(&mut ClusterConfigStatus) + Send,
{
    let namespace = config.namespace().unwrap_or_default();
    let name = config.name_any();
    let mut current = config.clone();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let mut desired = current.clone();
        mutate(desired.status_mut());

        match store.update_status(&desired).await {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_conflict() && attempt < retries.max(1) => {
                debug!(
                    "Status update conflict for ClusterConfig {}/{} (attempt {}), re-fetching",
                    namespace, name, attempt
                );
                current = store.get(&namespace, &name).await?;
            }
            Err(e) => {
                if e.is_conflict() {
                    warn!(
                        "Giving up status update for ClusterConfig {}/{} after {} conflicts",
                        namespace, name, attempt
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Apply `mutate` to the record's spec and persist it, retrying on conflict
pub async fn update_spec_with_retry<F>(
    store: &dyn ClusterConfigStore,
    config: &ClusterConfig,
    retries: u32,
    mut mutate: F,
) -> Result<ClusterConfig, ControllerError>
where
    F: FnMut(&mut ClusterConfigSpec) + Send,
{
    let namespace = config.namespace().unwrap_or_default();
    let name = config.name_any();
    let mut current = config.clone();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let mut desired = current.clone();
        mutate(&mut desired.spec);

        match store.update(&desired).await {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_conflict() && attempt < retries.max(1) => {
                debug!(
                    "Spec update conflict for ClusterConfig {}/{} (attempt {}), re-fetching",
                    namespace, name, attempt
                );
                current = store.get(&namespace, &name).await?;
            }
            Err(e) => return Err(e),
        }
    }
}
