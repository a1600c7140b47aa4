//! Network prerequisites for a new cluster
//!
//! Each step checks its own marker in the status before acting and persists
//! its result before the next step runs, so a pass interrupted anywhere
//! resumes without creating anything twice. Ids recorded in the `created*`
//! status fields are the resources teardown will delete later.

use super::requests::{
    DEFAULT_CONTAINER_NETWORK_CIDR, DEFAULT_CONTAINER_NETWORK_MODE, nat_gateway_request, public_ip_request,
    snat_rule_request, subnet_request, vpc_request,
};
use super::{Reconciler, record_key};
use crate::error::ControllerError;
use cce_client::CloudClientTrait;
use crds::{ClusterConfig, HostNetwork};
use tracing::{debug, info};

impl Reconciler {
    /// Resolve every network prerequisite, returning the record as stored
    pub(crate) async fn provision_network(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<ClusterConfig, ControllerError> {
        let config = self.resolve_container_network(config).await?;
        let config = self.resolve_cluster_public_ip(driver, &config).await?;
        let config = self.resolve_host_network(driver, &config).await?;
        self.resolve_nat_gateway(driver, &config).await
    }

    async fn resolve_container_network(&self, config: &ClusterConfig) -> Result<ClusterConfig, ControllerError> {
        let status = config.observed();
        if !status.container_network.mode.is_empty() && !status.container_network.cidr.is_empty() {
            return Ok(config.clone());
        }

        let spec = &config.spec.container_network;
        let mode = if spec.mode.is_empty() {
            DEFAULT_CONTAINER_NETWORK_MODE.to_string()
        } else {
            spec.mode.clone()
        };
        let cidr = if spec.cidr.is_empty() {
            DEFAULT_CONTAINER_NETWORK_CIDR.to_string()
        } else {
            spec.cidr.clone()
        };
        debug!(
            "ClusterConfig {} container network: mode {} cidr {}",
            record_key(config),
            mode,
            cidr
        );
        self.update_status(config, |status| {
            status.container_network.mode = mode.clone();
            status.container_network.cidr = cidr.clone();
        })
        .await
    }

    async fn resolve_cluster_public_ip(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<ClusterConfig, ControllerError> {
        let spec = &config.spec;
        if !spec.public_access || !config.observed().cluster_external_ip.is_empty() {
            return Ok(config.clone());
        }

        if spec.public_ip.create_eip {
            let eip = driver.create_public_ip(&public_ip_request(&spec.public_ip.eip)).await?;
            self.metrics.record_provider_call("create_public_ip");
            if eip.id.is_empty() || eip.public_ip_address.is_empty() {
                return Err(ControllerError::InvalidResponse(
                    "create public IP returned invalid value".to_string(),
                ));
            }
            info!(
                "Created cluster EIP {} ({}) for ClusterConfig {}",
                eip.public_ip_address,
                eip.id,
                record_key(config)
            );
            return self
                .update_status(config, |status| {
                    status.cluster_external_ip = eip.public_ip_address.clone();
                    status.cluster_external_ip_id = eip.id.clone();
                    status.created_cluster_eip_id = eip.id.clone();
                })
                .await;
        }

        let external_ip = spec.extend_param.cluster_external_ip.clone();
        if external_ip.is_empty() {
            return Ok(config.clone());
        }
        debug!(
            "ClusterConfig {} uses existing external IP {}",
            record_key(config),
            external_ip
        );
        self.update_status(config, |status| status.cluster_external_ip = external_ip.clone())
            .await
    }

    async fn resolve_host_network(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<ClusterConfig, ControllerError> {
        let status = config.observed();
        if !status.host_network.vpc_id.is_empty() && !status.host_network.subnet_id.is_empty() {
            debug!("ClusterConfig {} host network already resolved", record_key(config));
            return Ok(config.clone());
        }

        let requested = config.spec.host_network.clone();
        match (requested.vpc_id.is_empty(), requested.subnet_id.is_empty()) {
            (true, _) => {
                // Resume with the VPC recorded by an interrupted pass
                let mut config = config.clone();
                let mut vpc_id = config.observed().created_vpc_id.clone();
                if vpc_id.is_empty() {
                    let vpc = driver.create_vpc(&vpc_request()).await?;
                    self.metrics.record_provider_call("create_vpc");
                    if vpc.id.is_empty() {
                        return Err(ControllerError::InvalidResponse("create VPC returned invalid value".to_string()));
                    }
                    info!("Created VPC {} for ClusterConfig {}", vpc.id, record_key(&config));
                    vpc_id = vpc.id;
                    config = self
                        .update_status(&config, |status| status.created_vpc_id = vpc_id.clone())
                        .await?;
                }

                let subnet_id = self.create_subnet(driver, &config, &vpc_id).await?;
                let security_group = requested.security_group.clone();
                self.update_status(&config, |status| {
                    status.host_network = HostNetwork {
                        vpc_id: vpc_id.clone(),
                        subnet_id: subnet_id.clone(),
                        security_group: security_group.clone(),
                    };
                    status.created_subnet_id = subnet_id.clone();
                })
                .await
            }
            (false, true) => {
                driver.show_vpc(&requested.vpc_id).await?;
                let subnet_id = self.create_subnet(driver, config, &requested.vpc_id).await?;
                self.update_status(config, |status| {
                    status.host_network = HostNetwork {
                        subnet_id: subnet_id.clone(),
                        ..requested.clone()
                    };
                    status.created_subnet_id = subnet_id.clone();
                })
                .await
            }
            (false, false) => {
                driver.show_vpc(&requested.vpc_id).await?;
                driver.show_subnet(&requested.subnet_id).await?;
                debug!(
                    "ClusterConfig {} uses existing VPC {} and subnet {}",
                    record_key(config),
                    requested.vpc_id,
                    requested.subnet_id
                );
                self.update_status(config, |status| status.host_network = requested.clone())
                    .await
            }
        }
    }

    /// Create a subnet in `vpc_id` using the region's DNS servers
    async fn create_subnet(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
        vpc_id: &str,
    ) -> Result<String, ControllerError> {
        let dns = region_dns(driver).await?;
        let subnet = driver.create_subnet(&subnet_request(vpc_id, &dns)).await?;
        self.metrics.record_provider_call("create_subnet");
        if subnet.id.is_empty() {
            return Err(ControllerError::InvalidResponse(
                "create subnet returned invalid value".to_string(),
            ));
        }
        info!(
            "Created subnet {} in VPC {} for ClusterConfig {}",
            subnet.id,
            vpc_id,
            record_key(config)
        );
        Ok(subnet.id)
    }

    async fn resolve_nat_gateway(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<ClusterConfig, ControllerError> {
        let nat = &config.spec.nat_gateway;
        let status = config.observed();
        if !nat.enabled || (!status.created_nat_gateway_id.is_empty() && !status.created_snat_rule_id.is_empty()) {
            return Ok(config.clone());
        }

        // The subnet must settle before a gateway can attach to it
        tokio::time::sleep(self.settings.settle_delay).await;

        let mut config = config.clone();
        let vpc_id = config.observed().host_network.vpc_id.clone();
        let subnet_id = config.observed().host_network.subnet_id.clone();

        let mut nat_gateway_id = config.observed().created_nat_gateway_id.clone();
        if nat_gateway_id.is_empty() {
            let gateway = driver.create_nat_gateway(&nat_gateway_request(&vpc_id, &subnet_id)).await?;
            self.metrics.record_provider_call("create_nat_gateway");
            if gateway.id.is_empty() {
                return Err(ControllerError::InvalidResponse(
                    "create NAT gateway returned invalid value".to_string(),
                ));
            }
            info!("Created NAT gateway {} for ClusterConfig {}", gateway.id, record_key(&config));
            nat_gateway_id = gateway.id;
            config = self
                .update_status(&config, |status| status.created_nat_gateway_id = nat_gateway_id.clone())
                .await?;
        }

        let eip_id = if !nat.existing_eip_id.is_empty() {
            nat.existing_eip_id.clone()
        } else if !config.observed().created_snat_rule_eip_id.is_empty() {
            config.observed().created_snat_rule_eip_id.clone()
        } else {
            let eip = driver.create_public_ip(&public_ip_request(&nat.snat_rule_eip)).await?;
            self.metrics.record_provider_call("create_public_ip");
            if eip.id.is_empty() {
                return Err(ControllerError::InvalidResponse(
                    "create public IP returned invalid value".to_string(),
                ));
            }
            info!("Created SNAT rule EIP {} for ClusterConfig {}", eip.id, record_key(&config));
            config = self
                .update_status(&config, |status| status.created_snat_rule_eip_id = eip.id.clone())
                .await?;
            eip.id
        };

        let rule = driver
            .create_snat_rule(&snat_rule_request(&nat_gateway_id, &subnet_id, &eip_id))
            .await?;
        self.metrics.record_provider_call("create_snat_rule");
        if rule.id.is_empty() {
            return Err(ControllerError::InvalidResponse(
                "create SNAT rule returned invalid value".to_string(),
            ));
        }
        info!(
            "Created SNAT rule {} on NAT gateway {} for ClusterConfig {}",
            rule.id,
            nat_gateway_id,
            record_key(&config)
        );
        self.update_status(&config, |status| status.created_snat_rule_id = rule.id.clone())
            .await
    }
}

/// Primary and secondary DNS server of the driver's region
///
/// The secondary is empty when the region only publishes one address.
async fn region_dns(driver: &dyn CloudClientTrait) -> Result<[String; 2], ControllerError> {
    let nameservers = driver.list_nameservers(driver.region()).await?;
    let mut addresses = nameservers
        .iter()
        .flat_map(|ns| ns.ns_records.iter())
        .filter_map(|record| record.address.clone());
    let primary = addresses.next().ok_or_else(|| {
        ControllerError::InvalidResponse(format!("no DNS servers found in region {}", driver.region()))
    })?;
    Ok([primary, addresses.next().unwrap_or_default()])
}
