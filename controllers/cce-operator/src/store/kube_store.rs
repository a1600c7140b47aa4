//! ClusterConfigStore over the Kubernetes API

use super::ClusterConfigStore;
use crate::error::ControllerError;
use crds::ClusterConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{Value, json};

/// Record store backed by the API server
///
/// Status writes are merge patches that carry the record's resource version,
/// so the API server rejects them with a conflict when the record changed
/// since it was read.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn configs(&self, namespace: &str) -> Api<ClusterConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn namespace_of(config: &ClusterConfig) -> Result<String, ControllerError> {
    config
        .namespace()
        .ok_or_else(|| ControllerError::InvalidConfig(format!("ClusterConfig {} has no namespace", config.name_any())))
}

/// Map a 409 from the API server to a conflict
fn classify(err: kube::Error, name: &str) -> ControllerError {
    match err {
        kube::Error::Api(ref response) if response.code == 409 => {
            ControllerError::Conflict(format!("ClusterConfig {}: {}", name, response.message))
        }
        other => ControllerError::Kube(other),
    }
}

/// Status fields that serialize as absent when empty, by parent object
///
/// A merge patch leaves absent keys untouched, so these are sent as `null`
/// to remove a previously recorded value.
const CLEARABLE_STATUS_FIELDS: &[(&str, &str)] = &[("hostNetwork", "securityGroup")];

/// Merge-patch body for the record's status
fn status_patch(config: &ClusterConfig) -> Result<Value, ControllerError> {
    let mut status = serde_json::to_value(&config.status)?;
    for (parent, field) in CLEARABLE_STATUS_FIELDS {
        if let Some(object) = status.get_mut(*parent).and_then(Value::as_object_mut) {
            object.entry(*field).or_insert(Value::Null);
        }
    }
    Ok(status)
}

#[async_trait::async_trait]
impl ClusterConfigStore for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<ClusterConfig, ControllerError> {
        Ok(self.configs(namespace).get(name).await?)
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ClusterConfig>, ControllerError> {
        let api: Api<ClusterConfig> = match namespace {
            Some(ns) => self.configs(ns),
            None => Api::all(self.client.clone()),
        };
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn update(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError> {
        let name = config.name_any();
        self.configs(&namespace_of(config)?)
            .replace(&name, &PostParams::default(), config)
            .await
            .map_err(|e| classify(e, &name))
    }

    async fn update_status(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError> {
        let name = config.name_any();
        let patch = json!({
            "metadata": { "resourceVersion": config.resource_version() },
            "status": status_patch(config)?,
        });
        self.configs(&namespace_of(config)?)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &name))
    }

    async fn add_finalizer(&self, config: &ClusterConfig, finalizer: &str) -> Result<ClusterConfig, ControllerError> {
        let name = config.name_any();
        let mut finalizers = config.finalizers().to_vec();
        if finalizers.iter().any(|f| f == finalizer) {
            return Ok(config.clone());
        }
        finalizers.push(finalizer.to_string());

        let patch = json!({ "metadata": { "finalizers": finalizers } });
        self.configs(&namespace_of(config)?)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &name))
    }

    async fn remove_finalizer(&self, config: &ClusterConfig, finalizer: &str) -> Result<(), ControllerError> {
        let name = config.name_any();
        let finalizers: Vec<String> = config
            .finalizers()
            .iter()
            .filter(|f| f.as_str() != finalizer)
            .cloned()
            .collect();

        let patch = json!({ "metadata": { "finalizers": finalizers } });
        match self
            .configs(&namespace_of(config)?)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            // Already gone once the last finalizer is released
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
            Err(e) => Err(classify(e, &name)),
        }
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ControllerError> {
        Ok(self.secrets(namespace).get_opt(name).await?)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, ControllerError> {
        Ok(self.secrets(namespace).create(&PostParams::default(), secret).await?)
    }
}
