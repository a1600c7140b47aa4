//! Ordered deletion of a cluster and the network it was given
//!
//! Each pass performs at most one deletion step and asks to be run again;
//! a resource the provider no longer knows about is forgotten by clearing
//! its id from the status. Only ids this operator recorded as created are
//! ever deleted.
//!
//! Order: nodes drained and node pools removed, then the cluster, then NAT
//! (SNAT rules before the gateway), the cluster EIP, the SNAT EIP, the
//! subnet, endpoint services in the VPC, and finally the VPC.

use super::{Outcome, Reconciler, record_key};
use crate::error::ControllerError;
use cce_client::{CloudClientTrait, CloudError, NodePoolState};
use crds::ClusterConfig;
use tracing::{debug, info};

/// `true` if the resource exists, `false` on a provider 404
fn exists<T>(result: Result<T, CloudError>) -> Result<bool, ControllerError> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// A delete that finds nothing to delete has succeeded
fn deleted(result: Result<(), CloudError>) -> Result<(), ControllerError> {
    match result {
        Err(e) if !e.is_not_found() => Err(e.into()),
        _ => Ok(()),
    }
}

impl Reconciler {
    /// Run the next teardown step
    ///
    /// Returns `Done` once the cluster and every created network resource
    /// are gone.
    pub(crate) async fn teardown(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<Outcome, ControllerError> {
        let mut config = config.clone();

        let cluster_id = cluster_id(&config);
        if !cluster_id.is_empty() {
            if let Some(outcome) = self.drain_cluster(driver, &config, &cluster_id).await? {
                return Ok(outcome);
            }
            if !config.observed().node_pools.is_empty() {
                config = self.update_status(&config, |status| status.node_pools.clear()).await?;
            }

            match driver.show_cluster(&cluster_id).await {
                Ok(cluster) => {
                    if cluster.state().is_some_and(|s| s.is_transitioning()) {
                        info!(
                            "Cluster {} of ClusterConfig {} is {:?}, waiting before delete",
                            cluster_id,
                            record_key(&config),
                            cluster.state()
                        );
                    } else {
                        deleted(driver.delete_cluster(&cluster_id).await)?;
                        self.metrics.record_teardown_step("cluster");
                        info!("Deleting cluster {} of ClusterConfig {}", cluster_id, record_key(&config));
                    }
                    return Ok(Outcome::Requeue(self.settings.cluster_delete_requeue));
                }
                Err(e) if e.is_not_found() => {
                    info!("Cluster {} of ClusterConfig {} is gone", cluster_id, record_key(&config));
                    config = self
                        .update_status(&config, |status| {
                            status.cluster_id.clear();
                            status.cluster_external_ip.clear();
                            status.cluster_external_ip_id.clear();
                        })
                        .await?;
                    if !config.spec.cluster_id.is_empty() {
                        config = self.update_spec(&config, |spec| spec.cluster_id.clear()).await?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.teardown_network(driver, &config).await
    }

    /// Wait for nodes to settle, then delete the cluster's node pools
    ///
    /// Returns `None` when nothing is left to drain.
    async fn drain_cluster(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
        cluster_id: &str,
    ) -> Result<Option<Outcome>, ControllerError> {
        let requeue = Some(Outcome::Requeue(self.settings.drain_requeue));

        let nodes = match driver.list_nodes(cluster_id).await {
            Ok(nodes) => nodes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if let Some(node) = nodes.iter().find(|n| n.state().is_some_and(|s| s.is_transitioning())) {
            info!(
                "Waiting for node {} of ClusterConfig {}, status {:?}",
                node.metadata.as_ref().and_then(|m| m.name.as_deref()).unwrap_or_default(),
                record_key(config),
                node.state()
            );
            return Ok(requeue);
        }

        let pools = match driver.list_node_pools(cluster_id).await {
            Ok(pools) => pools,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if pools.is_empty() {
            return Ok(None);
        }
        for pool in &pools {
            let Some(pool_id) = pool.metadata.as_ref().and_then(|m| m.uid.as_deref()) else {
                continue;
            };
            if pool.state() == Some(&NodePoolState::Deleting) {
                debug!("Node pool {} is already being deleted", pool_id);
                continue;
            }
            deleted(driver.delete_node_pool(cluster_id, pool_id).await)?;
            self.metrics.record_teardown_step("node_pool");
            info!("Deleting node pool {} of ClusterConfig {}", pool_id, record_key(config));
        }
        Ok(requeue)
    }

    async fn teardown_network(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
    ) -> Result<Outcome, ControllerError> {
        let requeue = Outcome::Requeue(self.settings.network_delete_requeue);
        let mut config = config.clone();
        let status = config.observed().clone();

        let nat_id = status.created_nat_gateway_id;
        if !nat_id.is_empty() {
            let rules = match driver.list_snat_rules(&nat_id).await {
                Ok(rules) => rules,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            if !rules.is_empty() {
                for rule in &rules {
                    deleted(driver.delete_snat_rule(&nat_id, &rule.id).await)?;
                    self.metrics.record_teardown_step("snat_rule");
                    info!("Deleting SNAT rule {} of ClusterConfig {}", rule.id, record_key(&config));
                }
                return Ok(requeue);
            }
            if exists(driver.show_nat_gateway(&nat_id).await)? {
                deleted(driver.delete_nat_gateway(&nat_id).await)?;
                self.metrics.record_teardown_step("nat_gateway");
                info!("Deleting NAT gateway {} of ClusterConfig {}", nat_id, record_key(&config));
                return Ok(requeue);
            }
            config = self
                .update_status(&config, |status| {
                    status.created_nat_gateway_id.clear();
                    status.created_snat_rule_id.clear();
                })
                .await?;
        }

        let eip_id = status.created_cluster_eip_id;
        if !eip_id.is_empty() {
            if exists(driver.show_public_ip(&eip_id).await)? {
                deleted(driver.delete_public_ip(&eip_id).await)?;
                self.metrics.record_teardown_step("cluster_eip");
                info!("Deleting cluster EIP {} of ClusterConfig {}", eip_id, record_key(&config));
                return Ok(requeue);
            }
            config = self
                .update_status(&config, |status| {
                    status.created_cluster_eip_id.clear();
                    status.cluster_external_ip_id.clear();
                })
                .await?;
        }

        let snat_eip_id = status.created_snat_rule_eip_id;
        if !snat_eip_id.is_empty() {
            if exists(driver.show_public_ip(&snat_eip_id).await)? {
                deleted(driver.delete_public_ip(&snat_eip_id).await)?;
                self.metrics.record_teardown_step("snat_eip");
                info!("Deleting SNAT rule EIP {} of ClusterConfig {}", snat_eip_id, record_key(&config));
                return Ok(requeue);
            }
            config = self
                .update_status(&config, |status| status.created_snat_rule_eip_id.clear())
                .await?;
        }

        let vpc_id = status.created_vpc_id;
        let subnet_id = status.created_subnet_id;
        if !subnet_id.is_empty() {
            if exists(driver.show_subnet(&subnet_id).await)? {
                let subnet_vpc = if vpc_id.is_empty() {
                    &status.host_network.vpc_id
                } else {
                    &vpc_id
                };
                deleted(driver.delete_subnet(subnet_vpc, &subnet_id).await)?;
                self.metrics.record_teardown_step("subnet");
                info!("Deleting subnet {} of ClusterConfig {}", subnet_id, record_key(&config));
                return Ok(requeue);
            }
            config = self
                .update_status(&config, |status| status.created_subnet_id.clear())
                .await?;
        }

        if !vpc_id.is_empty() {
            let services: Vec<_> = driver
                .list_endpoint_services()
                .await?
                .into_iter()
                .filter(|s| s.vpc_id == vpc_id)
                .collect();
            if !services.is_empty() {
                for service in &services {
                    deleted(driver.delete_endpoint_service(&service.id).await)?;
                    self.metrics.record_teardown_step("endpoint_service");
                    info!(
                        "Deleting endpoint service {} ({}) of ClusterConfig {}",
                        service.service_name,
                        service.id,
                        record_key(&config)
                    );
                }
                return Ok(requeue);
            }

            if exists(driver.show_vpc(&vpc_id).await)? {
                deleted(driver.delete_vpc(&vpc_id).await)?;
                self.metrics.record_teardown_step("vpc");
                info!("Deleting VPC {} of ClusterConfig {}", vpc_id, record_key(&config));
                return Ok(requeue);
            }
            self.update_status(&config, |status| status.created_vpc_id.clear())
                .await?;
        }

        Ok(Outcome::Done)
    }
}

/// Cluster to delete: the recorded id, or the one named in the spec
fn cluster_id(config: &ClusterConfig) -> String {
    let recorded = &config.observed().cluster_id;
    if recorded.is_empty() {
        config.spec.cluster_id.clone()
    } else {
        recorded.clone()
    }
}
