//! Upstream state builder
//!
//! Rebuilds the provider's view of a cluster and its node pools into the
//! same shape as [`ClusterConfigSpec`], so desired and observed state can be
//! compared field by field.

use crate::error::ControllerError;
use cce_client as cloud;
use crds::{
    Authentication, Autoscaling, ClusterConfigSpec, ContainerNetwork, EniNetwork, HostNetwork, NodePool,
    NodeTemplate, Volume,
};
use std::collections::HashMap;

/// Observed cluster rebuilt as a spec
///
/// Fails when the provider returned a cluster without metadata or spec.
pub fn build_upstream_cluster_state(
    cluster: &cloud::Cluster,
    node_pools: &[cloud::NodePool],
) -> Result<ClusterConfigSpec, ControllerError> {
    let (Some(metadata), Some(spec)) = (&cluster.metadata, &cluster.spec) else {
        return Err(ControllerError::InvalidResponse(
            "failed to get cluster from CCE API: metadata or spec is missing".to_string(),
        ));
    };

    let mut upstream = ClusterConfigSpec {
        name: metadata.name.clone(),
        labels: metadata.labels.clone(),
        category: spec.category.clone().unwrap_or_default(),
        cluster_type: spec.cluster_type.clone().unwrap_or_default(),
        flavor: spec.flavor.clone(),
        version: spec.version.clone().unwrap_or_default(),
        description: spec.description.clone().unwrap_or_default(),
        ipv6_enable: spec.ipv6enable.unwrap_or_default(),
        billing_mode: spec.billing_mode.unwrap_or_default(),
        kubernetes_svc_ip_range: spec.kubernetes_svc_ip_range.clone().unwrap_or_default(),
        kube_proxy_mode: spec.kube_proxy_mode.clone().unwrap_or_default(),
        tags: spec
            .cluster_tags
            .iter()
            .map(|tag| (tag.key.clone(), tag.value.clone()))
            .collect(),
        ..ClusterConfigSpec::default()
    };

    if let Some(host) = &spec.host_network {
        upstream.host_network = HostNetwork {
            vpc_id: host.vpc.clone(),
            subnet_id: host.subnet.clone(),
            security_group: host.security_group.clone().unwrap_or_default(),
        };
    }
    if let Some(container) = &spec.container_network {
        upstream.container_network = ContainerNetwork {
            mode: container.mode.clone(),
            cidr: container.cidr.clone().unwrap_or_default(),
        };
    }
    if let Some(eni) = &spec.eni_network {
        upstream.eni_network = EniNetwork {
            subnets: eni.subnets.iter().map(|s| s.subnet_id.clone()).collect(),
        };
    }
    if let Some(auth) = &spec.authentication {
        let mut authentication = Authentication {
            mode: auth.mode.clone().unwrap_or_default(),
            ..Authentication::default()
        };
        if let Some(ca) = auth.authenticating_proxy.as_ref().and_then(|p| p.ca.clone()) {
            authentication.authenticating_proxy.ca = ca;
        }
        upstream.authentication = authentication;
    }
    if let Some(extend) = &spec.extend_param {
        upstream.extend_param.cluster_az = extend.cluster_az.clone().unwrap_or_default();
        upstream.extend_param.cluster_external_ip = extend.cluster_external_ip.clone().unwrap_or_default();
    }

    upstream.node_pools = build_upstream_node_pools(node_pools);
    Ok(upstream)
}

fn volume(volume: &cloud::Volume) -> Volume {
    Volume::new(volume.size, volume.volumetype.clone())
}

/// Observed node pools rebuilt as spec node pools
///
/// Pools the provider returned without metadata or spec are skipped.
pub fn build_upstream_node_pools(pools: &[cloud::NodePool]) -> Vec<NodePool> {
    pools
        .iter()
        .filter_map(|pool| {
            let metadata = pool.metadata.as_ref()?;
            let spec = pool.spec.as_ref()?;
            let node = &spec.node_template;

            let mut template = NodeTemplate {
                flavor: node.flavor.clone(),
                available_zone: node.az.clone(),
                operating_system: node.os.clone().unwrap_or_default(),
                ssh_key: node
                    .login
                    .as_ref()
                    .and_then(|l| l.ssh_key.clone())
                    .unwrap_or_default(),
                root_volume: node.root_volume.as_ref().map(volume).unwrap_or_default(),
                data_volumes: node.data_volumes.iter().map(volume).collect(),
                count: node.count.unwrap_or_default(),
                billing_mode: node.billing_mode.unwrap_or_default(),
                runtime: node.runtime.as_ref().map(|r| r.name.clone()).unwrap_or_default(),
                ..NodeTemplate::default()
            };
            if let Some(public_ip) = &node.public_ip {
                template.public_ip.ids = public_ip.ids.clone().unwrap_or_default();
                template.public_ip.count = public_ip.count.unwrap_or_default();
                if let Some(eip) = &public_ip.eip {
                    template.public_ip.eip.ip_type = eip.iptype.clone();
                    if let Some(bandwidth) = &eip.bandwidth {
                        template.public_ip.eip.bandwidth.charge_mode = bandwidth.chargemode.clone().unwrap_or_default();
                        template.public_ip.eip.bandwidth.size = bandwidth.size.unwrap_or_default();
                        template.public_ip.eip.bandwidth.share_type = bandwidth.sharetype.clone().unwrap_or_default();
                    }
                }
            }
            if let Some(extend) = &node.extend_param {
                template.extend_param.period_type = extend.period_type.clone().unwrap_or_default();
                template.extend_param.period_num = extend.period_num.unwrap_or_default();
                template.extend_param.is_auto_renew = extend.is_auto_renew.clone().unwrap_or_default();
            }

            let autoscaling = spec
                .autoscaling
                .as_ref()
                .map(|a| Autoscaling {
                    enable: a.enable.unwrap_or_default(),
                    min_node_count: a.min_node_count.unwrap_or_default(),
                    max_node_count: a.max_node_count.unwrap_or_default(),
                    scale_down_cooldown_time: a.scale_down_cooldown_time.unwrap_or_default(),
                    priority: a.priority.unwrap_or_default(),
                })
                .unwrap_or_default();

            Some(NodePool {
                name: metadata.name.clone(),
                pool_type: spec.pool_type.clone().unwrap_or_default(),
                id: metadata.uid.clone().unwrap_or_default(),
                node_template: template,
                initial_node_count: spec.initial_node_count.unwrap_or_default(),
                autoscaling,
                pod_security_groups: spec.pod_security_groups.iter().map(|s| s.id.clone()).collect(),
                custom_security_groups: spec.custom_security_groups.clone(),
            })
        })
        .collect()
}

/// Whether two node pools have the same identity
///
/// Compares flavor, zone, SSH key, billing mode, OS, root volume and the
/// data volumes as a multiset. Name and id are ignored.
pub fn compare_node_pool(a: &NodePool, b: &NodePool) -> bool {
    let (a, b) = (&a.node_template, &b.node_template);
    a.flavor == b.flavor
        && a.available_zone == b.available_zone
        && a.ssh_key == b.ssh_key
        && a.billing_mode == b.billing_mode
        && a.operating_system == b.operating_system
        && a.root_volume == b.root_volume
        && same_volumes(&a.data_volumes, &b.data_volumes)
}

/// Order-independent volume comparison with multiplicity
fn same_volumes(a: &[Volume], b: &[Volume]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&Volume, i64> = HashMap::new();
    for v in a {
        *counts.entry(v).or_default() += 1;
    }
    for v in b {
        match counts.get_mut(v) {
            Some(n) if *n > 0 => *n -= 1,
            _ => return false,
        }
    }
    true
}

/// Whether an id-matched pool needs a scaling update
pub fn scaling_differs(desired: &NodePool, observed: &NodePool) -> bool {
    desired.initial_node_count != observed.initial_node_count || desired.autoscaling != observed.autoscaling
}
