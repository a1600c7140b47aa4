//! Cloud client resolution and caching.
//!
//! Each ClusterConfig names a credential secret. The secret is read on every
//! reconciliation and a fresh client built from it, so rotated keys take
//! effect immediately. When the secret cannot be read (deleted by the user,
//! keys removed) the last client built for that reference keeps serving, so
//! a record can still be torn down after its credentials disappear.

use crate::error::ControllerError;
use crate::store::ClusterConfigStore;
use cce_client::{ClientAuth, CloudClient, CloudClientTrait, CloudError, Credentials};
use crds::ClusterConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

pub const ACCESS_KEY: &str = "accessKey";
pub const SECRET_KEY: &str = "secretKey";
pub const PROJECT_ID_KEY: &str = "projectID";

/// Builds a cloud client from resolved credentials
pub trait DriverFactory: Send + Sync {
    fn build(&self, auth: ClientAuth) -> Result<Arc<dyn CloudClientTrait>, CloudError>;
}

/// Builds signed HTTP clients against the public regional endpoints
#[derive(Debug, Default)]
pub struct HttpDriverFactory;

impl DriverFactory for HttpDriverFactory {
    fn build(&self, auth: ClientAuth) -> Result<Arc<dyn CloudClientTrait>, CloudError> {
        Ok(Arc::new(CloudClient::new(auth)?))
    }
}

/// Parse a `namespace:name` secret reference
///
/// A reference without a colon has an empty namespace.
pub fn parse_credential_ref(reference: &str) -> (&str, &str) {
    match reference.split_once(':') {
        Some((namespace, name)) => (namespace, name),
        None => ("", reference),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DriverKey {
    namespace: String,
    name: String,
    region: String,
}

/// Per-credential client cache owned by the reconciler
pub struct DriverCache {
    factory: Arc<dyn DriverFactory>,
    drivers: Mutex<HashMap<DriverKey, Arc<dyn CloudClientTrait>>>,
}

impl std::fmt::Debug for DriverCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.drivers.lock().map(|d| d.len()).unwrap_or_default();
        f.debug_struct("DriverCache").field("cached", &cached).finish_non_exhaustive()
    }
}

impl DriverCache {
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            factory,
            drivers: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the client for a record
    ///
    /// Rebuilds the cached client when the credential secret can be read.
    /// Falls back to the cached client when it cannot, and fails only when
    /// nothing is cached.
    pub async fn driver_for(
        &self,
        store: &dyn ClusterConfigStore,
        config: &ClusterConfig,
    ) -> Result<Arc<dyn CloudClientTrait>, ControllerError> {
        let spec = &config.spec;
        let (namespace, name) = parse_credential_ref(&spec.credential_secret);
        let namespace = if namespace.is_empty() {
            config.namespace().unwrap_or_default()
        } else {
            namespace.to_string()
        };
        let key = DriverKey {
            namespace,
            name: name.to_string(),
            region: spec.region_id.clone(),
        };

        match self.build_driver(store, config, &key).await {
            Ok(driver) => {
                debug!(
                    "Built cloud client for ClusterConfig {}/{} from secret {}/{}",
                    config.namespace().unwrap_or_default(),
                    config.name_any(),
                    key.namespace,
                    key.name
                );
                self.drivers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, Arc::clone(&driver));
                Ok(driver)
            }
            Err(e) => {
                let cached = self
                    .drivers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&key)
                    .cloned();
                match cached {
                    Some(driver) => {
                        warn!(
                            "Credential lookup for ClusterConfig {}/{} failed: [{}], using cached client",
                            config.namespace().unwrap_or_default(),
                            config.name_any(),
                            e
                        );
                        Ok(driver)
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn build_driver(
        &self,
        store: &dyn ClusterConfigStore,
        config: &ClusterConfig,
        key: &DriverKey,
    ) -> Result<Arc<dyn CloudClientTrait>, ControllerError> {
        if config.spec.region_id.is_empty() {
            return Err(ControllerError::Credential("regionID not provided".to_string()));
        }
        if config.spec.credential_secret.is_empty() {
            return Err(ControllerError::Credential("credential secret not provided".to_string()));
        }

        let secret = store
            .get_secret(&key.namespace, &key.name)
            .await
            .map_err(|e| ControllerError::Credential(format!("error getting secret {}/{}: {}", key.namespace, key.name, e)))?
            .ok_or_else(|| {
                ControllerError::Credential(format!("error getting secret {}/{}: not found", key.namespace, key.name))
            })?;

        let credentials = credentials_from_secret(&secret)?;
        let auth = ClientAuth::new(key.region.clone(), credentials)?;
        Ok(self.factory.build(auth)?)
    }
}

/// Read access key, secret key and project id from a credential secret
pub fn credentials_from_secret(secret: &Secret) -> Result<Credentials, ControllerError> {
    let field = |key: &str| -> Option<String> {
        secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .map(|value| String::from_utf8_lossy(&value.0).into_owned())
            .or_else(|| secret.string_data.as_ref().and_then(|data| data.get(key).cloned()))
    };

    match (field(ACCESS_KEY), field(SECRET_KEY), field(PROJECT_ID_KEY)) {
        (Some(access_key), Some(secret_key), Some(project_id)) => Ok(Credentials {
            access_key,
            secret_key,
            project_id,
        }),
        _ => Err(ControllerError::Credential(format!(
            "invalid cloud credential in secret {}: {}, {} and {} are required",
            secret.name_any(),
            ACCESS_KEY,
            SECRET_KEY,
            PROJECT_ID_KEY
        ))),
    }
}
