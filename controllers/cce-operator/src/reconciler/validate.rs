//! ClusterConfig validation
//!
//! Static checks run before any provider call. The checks that need the
//! provider (cluster name collisions, imported cluster lookup) run once a
//! client is available. No validation step mutates cloud resources.

use super::Reconciler;
use crate::error::ControllerError;
use cce_client::CloudClientTrait;
use crds::ClusterConfig;
use kube::ResourceExt;
use std::collections::HashSet;

fn empty_field(field: &str, config: &ClusterConfig) -> ControllerError {
    ControllerError::Validation(format!(
        "field [{}] cannot be empty for non-import cluster [{}]",
        field,
        config.name_any()
    ))
}

fn require(value: &str, field: &str, config: &ClusterConfig) -> Result<(), ControllerError> {
    if value.is_empty() {
        return Err(empty_field(field, config));
    }
    Ok(())
}

fn require_node_pools(config: &ClusterConfig) -> Result<(), ControllerError> {
    if !config.spec.imported && config.spec.node_pools.is_empty() {
        return Err(empty_field("nodePools", config));
    }
    Ok(())
}

/// Static create-time checks
pub fn validate_create_fields(config: &ClusterConfig) -> Result<(), ControllerError> {
    let spec = &config.spec;
    require_node_pools(config)?;
    require(&spec.credential_secret, "credentialSecret", config)?;
    require(&spec.region_id, "regionID", config)?;
    require(&spec.name, "name", config)?;

    if spec.imported {
        return require(&spec.cluster_id, "clusterID", config);
    }

    // Cluster may already exist; its shape fields no longer matter
    if spec.cluster_id.is_empty() && config.observed().cluster_id.is_empty() {
        validate_cluster_shape(config)?;
    }

    validate_node_pools(config)
}

/// Fields only needed to issue the create-cluster request
fn validate_cluster_shape(config: &ClusterConfig) -> Result<(), ControllerError> {
    let spec = &config.spec;
    require(&spec.cluster_type, "type", config)?;
    require(&spec.flavor, "flavor", config)?;
    require(&spec.version, "version", config)?;
    require(&spec.kubernetes_svc_ip_range, "kubernetesSvcIPRange", config)?;

    let external_ip = &spec.extend_param.cluster_external_ip;
    if (!external_ip.is_empty() || spec.public_ip.create_eip) && !spec.public_access {
        return Err(ControllerError::Validation(
            "'publicAccess' can not be 'false' when 'clusterExternalIP' provided or 'publicIP.createEIP' is true"
                .to_string(),
        ));
    }
    if spec.public_access {
        if external_ip.is_empty() && !spec.public_ip.create_eip {
            return Err(ControllerError::Validation(
                "should provide 'clusterExternalIP' or setup 'publicIP' if 'publicAccess' is true".to_string(),
            ));
        }
        if spec.public_ip.create_eip && spec.public_ip.eip.bandwidth.size == 0 {
            return Err(ControllerError::Validation(
                "'publicIP.eip.bandwidth.size' should be configured when 'createEIP' is true".to_string(),
            ));
        }
    }
    if spec.nat_gateway.enabled
        && spec.nat_gateway.existing_eip_id.is_empty()
        && spec.nat_gateway.snat_rule_eip.bandwidth.size == 0
    {
        return Err(ControllerError::Validation(
            "'natGateway.publicIP' should be configured when NAT enabled and 'existingEIPID' not provided"
                .to_string(),
        ));
    }
    Ok(())
}

/// Node pool checks shared by create and update
///
/// Names must be unique and every template fully specified.
pub fn validate_node_pools(config: &ClusterConfig) -> Result<(), ControllerError> {
    let mut names = HashSet::new();
    for pool in &config.spec.node_pools {
        require(&pool.name, "nodePool.name", config)?;
        if !names.insert(pool.name.as_str()) {
            return Err(ControllerError::Validation(format!(
                "nodePool.name should be unique, duplicated detected: \"{}\"",
                pool.name
            )));
        }

        let template = &pool.node_template;
        require(&template.flavor, "nodePool.nodeTemplate.flavor", config)?;
        require(&template.available_zone, "nodePool.nodeTemplate.availableZone", config)?;
        require(&template.ssh_key, "nodePool.nodeTemplate.sshKey", config)?;
        if template.root_volume.size == 0 || template.root_volume.volume_type.is_empty() {
            return Err(empty_field("nodePool.nodeTemplate.rootVolume", config));
        }
        if template.data_volumes.is_empty()
            || template
                .data_volumes
                .iter()
                .any(|v| v.size == 0 || v.volume_type.is_empty())
        {
            return Err(empty_field("nodePool.nodeTemplate.dataVolumes", config));
        }
        require(&template.operating_system, "nodePool.nodeTemplate.operatingSystem", config)?;
    }
    Ok(())
}

/// `v1.25` -> `1.25.0`; a full `v1.25.3` only loses its prefix
fn semver_core(version: &str) -> String {
    let version = version.trim_start_matches('v');
    if version.split('.').count() == 2 {
        format!("{}.0", version)
    } else {
        version.to_string()
    }
}

/// Update-time checks
pub fn validate_update(config: &ClusterConfig) -> Result<(), ControllerError> {
    let spec = &config.spec;
    require_node_pools(config)?;
    if !spec.version.is_empty() {
        if let Err(e) = semver::Version::parse(&semver_core(&spec.version)) {
            return Err(ControllerError::Validation(format!(
                "improper version format for cluster [{}]: {}, {}",
                spec.name, spec.version, e
            )));
        }
    }
    require(&spec.name, "name", config)?;
    require(&spec.region_id, "regionID", config)?;
    require(&spec.credential_secret, "credentialSecret", config)?;

    if spec.imported {
        return require(&spec.cluster_id, "clusterID", config);
    }
    validate_node_pools(config)
}

impl Reconciler {
    /// Reject a record whose display name is already used by another record in its namespace
    pub(crate) async fn check_duplicate_record_name(&self, config: &ClusterConfig) -> Result<(), ControllerError> {
        let namespace = config.namespace().unwrap_or_default();
        let records = self.store.list(Some(&namespace)).await.map_err(|e| {
            ControllerError::Validation(format!("cannot list clusterconfigs for display name check: {}", e))
        })?;
        let name = config.name_any();
        if records
            .iter()
            .any(|other| other.spec.name == config.spec.name && other.name_any() != name)
        {
            return Err(ControllerError::Validation(format!(
                "cannot create cluster [{}] because a clusterconfig exists with the same name",
                config.spec.name
            )));
        }
        Ok(())
    }

    /// Create-time checks that need the provider
    pub(crate) async fn validate_against_provider(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<(), ControllerError> {
        let spec = &config.spec;
        if spec.imported {
            return match driver.show_cluster(&spec.cluster_id).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_not_found() => {
                    let message = e.provider().map(|p| p.error_message.clone()).unwrap_or_default();
                    Err(ControllerError::Validation(format!(
                        "failed to find cluster [{}]: {}",
                        spec.cluster_id, message
                    )))
                }
                Err(e) => Err(e.into()),
            };
        }

        if !spec.cluster_id.is_empty() || !config.observed().cluster_id.is_empty() {
            return Ok(());
        }
        let clusters = driver.list_clusters().await?;
        if let Some(existing) = clusters
            .iter()
            .filter_map(|c| c.metadata.as_ref())
            .find(|m| m.name == spec.name)
        {
            return Err(ControllerError::Validation(format!(
                "cannot create cluster [{}] because a cluster in CCE exists with the same name",
                existing.name
            )));
        }
        Ok(())
    }
}
