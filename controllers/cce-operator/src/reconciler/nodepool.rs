//! Node pool convergence
//!
//! Planning is pure: desired pools are matched to observed pools first by
//! id, then by identity (see [`compare_node_pool`]). Executing the plan is
//! the only part that talks to the provider.

use super::requests::{create_node_pool_request, node_pool_update};
use super::upstream::{compare_node_pool, scaling_differs};
use super::{Reconciler, record_key};
use crate::error::ControllerError;
use cce_client::CloudClientTrait;
use crds::{ClusterConfig, NodePool};
use std::collections::HashSet;
use tracing::{debug, info};

/// Provider changes needed to move the observed pools to the desired ones
///
/// Indices refer to the desired pool list, ids to observed pools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePoolPlan {
    /// Desired pools with no observed counterpart
    pub create: Vec<usize>,
    /// Id-matched pools whose node count or autoscaling differ
    pub update: Vec<(usize, String)>,
    /// Desired pools without an id that match an existing pool's identity
    pub adopt: Vec<(usize, String)>,
    /// Observed pools no desired pool claimed
    pub delete: Vec<String>,
}

impl NodePoolPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.adopt.is_empty() && self.delete.is_empty()
    }
}

/// Match desired pools against observed ones
pub fn plan_node_pools(desired: &[NodePool], observed: &[NodePool]) -> NodePoolPlan {
    let mut plan = NodePoolPlan::default();
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut unmatched = Vec::new();

    for (i, pool) in desired.iter().enumerate() {
        if pool.id.is_empty() {
            unmatched.push(i);
            continue;
        }
        match observed.iter().position(|o| o.id == pool.id) {
            Some(j) => {
                claimed.insert(j);
                if scaling_differs(pool, &observed[j]) {
                    plan.update.push((i, pool.id.clone()));
                }
            }
            None => plan.create.push(i),
        }
    }

    for i in unmatched {
        let candidate = observed
            .iter()
            .enumerate()
            .find(|(j, o)| !claimed.contains(j) && !o.id.is_empty() && compare_node_pool(&desired[i], o));
        match candidate {
            Some((j, o)) => {
                claimed.insert(j);
                plan.adopt.push((i, o.id.clone()));
            }
            None => plan.create.push(i),
        }
    }

    plan.create.sort_unstable();
    plan.delete = observed
        .iter()
        .enumerate()
        .filter(|(j, o)| !claimed.contains(j) && !o.id.is_empty())
        .map(|(_, o)| o.id.clone())
        .collect();
    plan
}

impl Reconciler {
    /// Apply the node pool plan for `config`
    ///
    /// `deleting` holds ids of pools the provider is already removing; they
    /// are not deleted again but still count as a pending change. Returns the
    /// stored record and whether anything changed.
    pub(crate) async fn converge_node_pools(
        &self,
        driver: &dyn CloudClientTrait,
        config: &ClusterConfig,
        observed: &[NodePool],
        deleting: &HashSet<String>,
    ) -> Result<(ClusterConfig, bool), ControllerError> {
        let plan = plan_node_pools(&config.spec.node_pools, observed);
        if plan.is_empty() {
            return Ok((config.clone(), false));
        }
        debug!("Node pool plan for ClusterConfig {}: {:?}", record_key(config), plan);

        let cluster_id = config.observed().cluster_id.clone();
        let mut config = config.clone();

        for (i, pool_id) in &plan.update {
            let pool = &config.spec.node_pools[*i];
            driver
                .update_node_pool(&cluster_id, pool_id, &node_pool_update(pool))
                .await?;
            self.metrics.record_provider_call("update_node_pool");
            info!(
                "Updated node pool {} ({}) of ClusterConfig {}: {} nodes",
                pool.name,
                pool_id,
                record_key(&config),
                pool.initial_node_count
            );
        }

        if !plan.adopt.is_empty() {
            let adopted: Vec<(String, String)> = plan
                .adopt
                .iter()
                .map(|(i, id)| (config.spec.node_pools[*i].name.clone(), id.clone()))
                .collect();
            for (name, id) in &adopted {
                info!("Adopting node pool {} as {} for ClusterConfig {}", id, name, record_key(&config));
            }
            config = self
                .update_spec(&config, |spec| {
                    for (name, id) in &adopted {
                        if let Some(pool) = spec.node_pools.iter_mut().find(|p| &p.name == name) {
                            pool.id = id.clone();
                        }
                    }
                })
                .await?;
        }

        for i in &plan.create {
            let pool = config.spec.node_pools[*i].clone();
            let created = driver
                .create_node_pool(&cluster_id, &create_node_pool_request(&pool))
                .await?;
            self.metrics.record_provider_call("create_node_pool");
            let pool_id = created
                .metadata
                .and_then(|m| m.uid)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ControllerError::InvalidResponse("create node pool returned invalid value".to_string()))?;
            info!(
                "Created node pool {} ({}) for ClusterConfig {}",
                pool.name,
                pool_id,
                record_key(&config)
            );
            config = self
                .update_spec(&config, |spec| {
                    if let Some(p) = spec.node_pools.iter_mut().find(|p| p.name == pool.name) {
                        p.id = pool_id.clone();
                    }
                })
                .await?;
        }

        for pool_id in &plan.delete {
            if deleting.contains(pool_id) {
                debug!("Node pool {} is already being deleted", pool_id);
                continue;
            }
            match driver.delete_node_pool(&cluster_id, pool_id).await {
                Ok(()) => {
                    self.metrics.record_provider_call("delete_node_pool");
                    info!("Deleting node pool {} of ClusterConfig {}", pool_id, record_key(&config));
                }
                Err(e) if e.is_not_found() => {
                    debug!("Node pool {} already gone", pool_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok((config, true))
    }
}
