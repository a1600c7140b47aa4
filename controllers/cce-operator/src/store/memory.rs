//! In-memory ClusterConfigStore for tests
//!
//! Mirrors the API server behaviour the reconciler relies on: resource
//! versions bump on every write, stale writes fail with a conflict, status
//! writes leave the spec alone, and a record marked for deletion disappears
//! once its last finalizer is removed.

use super::ClusterConfigStore;
use crate::error::ControllerError;
use crds::ClusterConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use kube::error::ErrorResponse;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Key = (String, String);

#[derive(Default)]
struct State {
    configs: BTreeMap<Key, ClusterConfig>,
    secrets: BTreeMap<Key, Secret>,
    next_version: u64,
    // Conflicts to inject on the next status writes
    pending_conflicts: u32,
    status_writes: u32,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

fn api_error(code: u16, reason: &str, message: String) -> ControllerError {
    ControllerError::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

fn key_of(config: &ClusterConfig) -> Key {
    (config.namespace().unwrap_or_default(), config.name_any())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a record as if a user had applied it
    pub fn insert(&self, mut config: ClusterConfig) -> ClusterConfig {
        let mut state = self.lock();
        state.next_version += 1;
        config.metadata.resource_version = Some(state.next_version.to_string());
        if config.metadata.uid.is_none() {
            config.metadata.uid = Some(format!("uid-{}", config.name_any()));
        }
        state.configs.insert(key_of(&config), config.clone());
        config
    }

    /// Current stored copy of a record
    pub fn stored(&self, namespace: &str, name: &str) -> Option<ClusterConfig> {
        self.lock().configs.get(&(namespace.to_string(), name.to_string())).cloned()
    }

    /// Mark a record for deletion, as the API server does when finalizers remain
    pub fn mark_deleted(&self, namespace: &str, name: &str) -> Option<ClusterConfig> {
        let mut state = self.lock();
        state.next_version += 1;
        let version = state.next_version.to_string();
        let config = state.configs.get_mut(&(namespace.to_string(), name.to_string()))?;
        config.metadata.deletion_timestamp = serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).ok();
        config.metadata.resource_version = Some(version);
        Some(config.clone())
    }

    /// Make the next `count` status writes fail with a conflict
    pub fn inject_status_conflicts(&self, count: u32) {
        self.lock().pending_conflicts = count;
    }

    /// Number of accepted status writes
    pub fn status_writes(&self) -> u32 {
        self.lock().status_writes
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.lock().secrets.get(&(namespace.to_string(), name.to_string())).cloned()
    }

    pub fn insert_secret(&self, namespace: &str, mut secret: Secret) {
        secret.metadata.namespace = Some(namespace.to_string());
        self.lock().secrets.insert((namespace.to_string(), secret.name_any()), secret);
    }

    /// Validate the write against the stored copy and bump its version
    fn check_version(state: &mut State, config: &ClusterConfig) -> Result<(Key, String), ControllerError> {
        let key = key_of(config);
        let stored = state
            .configs
            .get(&key)
            .ok_or_else(|| api_error(404, "NotFound", format!("clusterconfigs \"{}\" not found", key.1)))?;
        if config.resource_version().is_some() && config.resource_version() != stored.resource_version() {
            return Err(api_error(
                409,
                "Conflict",
                format!("the object \"{}\" has been modified; please apply your changes to the latest version", key.1),
            ));
        }
        state.next_version += 1;
        Ok((key, state.next_version.to_string()))
    }
}

#[async_trait::async_trait]
impl ClusterConfigStore for InMemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<ClusterConfig, ControllerError> {
        self.stored(namespace, name)
            .ok_or_else(|| api_error(404, "NotFound", format!("clusterconfigs \"{}\" not found", name)))
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ClusterConfig>, ControllerError> {
        Ok(self
            .lock()
            .configs
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|n| n == ns))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn update(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError> {
        let mut state = self.lock();
        let (key, version) = Self::check_version(&mut state, config)?;
        let stored = state.configs.get_mut(&key).ok_or_else(|| api_error(404, "NotFound", key.1.clone()))?;
        stored.spec = config.spec.clone();
        stored.metadata.labels = config.metadata.labels.clone();
        stored.metadata.annotations = config.metadata.annotations.clone();
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn update_status(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError> {
        let mut state = self.lock();
        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            state.next_version += 1;
            let version = state.next_version.to_string();
            if let Some(stored) = state.configs.get_mut(&key_of(config)) {
                stored.metadata.resource_version = Some(version);
            }
            return Err(api_error(409, "Conflict", "injected conflict".to_string()));
        }
        let (key, version) = Self::check_version(&mut state, config)?;
        state.status_writes += 1;
        let stored = state.configs.get_mut(&key).ok_or_else(|| api_error(404, "NotFound", key.1.clone()))?;
        stored.status = config.status.clone();
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn add_finalizer(&self, config: &ClusterConfig, finalizer: &str) -> Result<ClusterConfig, ControllerError> {
        let mut state = self.lock();
        state.next_version += 1;
        let version = state.next_version.to_string();
        let key = key_of(config);
        let stored = state
            .configs
            .get_mut(&key)
            .ok_or_else(|| api_error(404, "NotFound", key.1.clone()))?;
        let finalizers = stored.metadata.finalizers.get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == finalizer) {
            finalizers.push(finalizer.to_string());
        }
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn remove_finalizer(&self, config: &ClusterConfig, finalizer: &str) -> Result<(), ControllerError> {
        let mut state = self.lock();
        let key = key_of(config);
        let Some(stored) = state.configs.get_mut(&key) else {
            return Ok(());
        };
        if let Some(finalizers) = stored.metadata.finalizers.as_mut() {
            finalizers.retain(|f| f != finalizer);
        }
        let released = stored.metadata.finalizers.as_ref().is_none_or(|f| f.is_empty());
        if released && stored.metadata.deletion_timestamp.is_some() {
            state.configs.remove(&key);
        }
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ControllerError> {
        Ok(self.secret(namespace, name))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, ControllerError> {
        let key = (namespace.to_string(), secret.name_any());
        let mut state = self.lock();
        if state.secrets.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", format!("secrets \"{}\" already exists", key.1)));
        }
        let mut created = secret.clone();
        created.metadata.namespace = Some(namespace.to_string());
        state.secrets.insert(key, created.clone());
        Ok(created)
    }
}
