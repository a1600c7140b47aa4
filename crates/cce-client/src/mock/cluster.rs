//! Container engine operations for MockCloudClient
//!
//! Handles clusters, node pools, nodes, upgrade tasks and certificates

use super::{MockCloudClient, lock, not_found};
use crate::error::CloudError;
use crate::models::*;

pub async fn list_clusters(client: &MockCloudClient) -> Result<Vec<Cluster>, CloudError> {
    client.record("list_clusters", "")?;
    Ok(lock(&client.clusters).values().cloned().collect())
}

pub async fn show_cluster(client: &MockCloudClient, cluster_id: &str) -> Result<Cluster, CloudError> {
    client.record("show_cluster", cluster_id)?;
    lock(&client.clusters)
        .get(cluster_id)
        .cloned()
        .ok_or_else(|| not_found("cluster", cluster_id))
}

pub async fn create_cluster(client: &MockCloudClient, request: &Cluster) -> Result<Cluster, CloudError> {
    let name = request.metadata.as_ref().map(|m| m.name.clone()).unwrap_or_default();
    client.record("create_cluster", &name)?;

    let id = client.next_id("cluster");
    let mut cluster = request.clone();
    cluster.kind = "Cluster".to_string();
    cluster.api_version = "v3".to_string();
    cluster.metadata.get_or_insert_with(ClusterMetadata::default).uid = Some(id.clone());
    cluster.status = Some(ClusterStatus {
        phase: Some(ClusterState::Creating),
        ..ClusterStatus::default()
    });

    lock(&client.clusters).insert(id, cluster.clone());
    Ok(cluster)
}

pub async fn update_cluster(
    client: &MockCloudClient,
    cluster_id: &str,
    request: &UpdateClusterRequest,
) -> Result<Cluster, CloudError> {
    client.record("update_cluster", cluster_id)?;
    let mut clusters = lock(&client.clusters);
    let cluster = clusters
        .get_mut(cluster_id)
        .ok_or_else(|| not_found("cluster", cluster_id))?;

    cluster.metadata.get_or_insert_with(ClusterMetadata::default).alias = Some(request.metadata.alias.clone());
    let spec = cluster.spec.get_or_insert_with(ClusterSpec::default);
    spec.description = Some(request.spec.description.clone());
    if let Some(host) = &request.spec.host_network {
        spec.host_network
            .get_or_insert_with(HostNetwork::default)
            .security_group = Some(host.security_group.clone());
    }
    Ok(cluster.clone())
}

pub async fn delete_cluster(client: &MockCloudClient, cluster_id: &str) -> Result<(), CloudError> {
    client.record("delete_cluster", cluster_id)?;
    lock(&client.clusters)
        .remove(cluster_id)
        .ok_or_else(|| not_found("cluster", cluster_id))?;
    lock(&client.node_pools).remove(cluster_id);
    lock(&client.nodes).remove(cluster_id);
    Ok(())
}

pub async fn upgrade_cluster(
    client: &MockCloudClient,
    cluster_id: &str,
    request: &UpgradeClusterRequest,
) -> Result<UpgradeTask, CloudError> {
    client.record("upgrade_cluster", cluster_id)?;
    let mut clusters = lock(&client.clusters);
    let cluster = clusters
        .get_mut(cluster_id)
        .ok_or_else(|| not_found("cluster", cluster_id))?;
    cluster.spec.get_or_insert_with(ClusterSpec::default).version =
        Some(request.spec.cluster_upgrade_action.target_version.clone());

    let task_id = client.next_id("task");
    let task = UpgradeTask {
        metadata: Some(UpgradeTaskMetadata { uid: Some(task_id.clone()) }),
        status: Some(UpgradeTaskStatus { phase: Some(UpgradeTaskState::Running) }),
    };
    lock(&client.upgrade_tasks).insert(task_id, task.clone());
    Ok(task)
}

pub async fn show_upgrade_task(
    client: &MockCloudClient,
    cluster_id: &str,
    task_id: &str,
) -> Result<UpgradeTask, CloudError> {
    client.record("show_upgrade_task", &format!("{}/{}", cluster_id, task_id))?;
    lock(&client.upgrade_tasks)
        .get(task_id)
        .cloned()
        .ok_or_else(|| not_found("upgrade task", task_id))
}

pub async fn create_cluster_cert(
    client: &MockCloudClient,
    cluster_id: &str,
    _duration_days: i32,
) -> Result<ClusterCert, CloudError> {
    client.record("create_cluster_cert", cluster_id)?;
    if !lock(&client.clusters).contains_key(cluster_id) {
        return Err(not_found("cluster", cluster_id));
    }
    let cert = lock(&client.certs).get(cluster_id).cloned();
    Ok(cert.unwrap_or_else(|| ClusterCert {
        clusters: vec![NamedCluster {
            name: Some("internalCluster".to_string()),
            cluster: Some(ClusterCertEndpoint {
                server: Some("https://192.168.0.10:5443".to_string()),
                // "mock-ca"
                certificate_authority_data: Some("bW9jay1jYQ==".to_string()),
            }),
        }],
    }))
}

pub async fn list_node_pools(client: &MockCloudClient, cluster_id: &str) -> Result<Vec<NodePool>, CloudError> {
    client.record("list_node_pools", cluster_id)?;
    Ok(lock(&client.node_pools).get(cluster_id).cloned().unwrap_or_default())
}

pub async fn create_node_pool(
    client: &MockCloudClient,
    cluster_id: &str,
    pool: &NodePool,
) -> Result<NodePool, CloudError> {
    let name = pool.metadata.as_ref().map(|m| m.name.clone()).unwrap_or_default();
    client.record("create_node_pool", &name)?;
    if !lock(&client.clusters).contains_key(cluster_id) {
        return Err(not_found("cluster", cluster_id));
    }

    let mut created = pool.clone();
    created.metadata.get_or_insert_with(NodePoolMetadata::default).uid = Some(client.next_id("np"));
    created.status = Some(NodePoolStatus {
        current_node: Some(0),
        phase: Some(NodePoolState::Synchronizing),
    });
    lock(&client.node_pools)
        .entry(cluster_id.to_string())
        .or_default()
        .push(created.clone());
    Ok(created)
}

pub async fn update_node_pool(
    client: &MockCloudClient,
    cluster_id: &str,
    pool_id: &str,
    update: &NodePoolUpdate,
) -> Result<NodePool, CloudError> {
    client.record("update_node_pool", pool_id)?;
    let mut pools = lock(&client.node_pools);
    let pool = pools
        .get_mut(cluster_id)
        .and_then(|pools| {
            pools
                .iter_mut()
                .find(|p| p.metadata.as_ref().and_then(|m| m.uid.as_deref()) == Some(pool_id))
        })
        .ok_or_else(|| not_found("node pool", pool_id))?;

    let spec = pool.spec.get_or_insert_with(NodePoolSpec::default);
    spec.initial_node_count = Some(update.spec.initial_node_count);
    spec.autoscaling = Some(update.spec.autoscaling.clone());
    Ok(pool.clone())
}

pub async fn delete_node_pool(client: &MockCloudClient, cluster_id: &str, pool_id: &str) -> Result<(), CloudError> {
    client.record("delete_node_pool", pool_id)?;
    let mut pools = lock(&client.node_pools);
    let pools = pools
        .get_mut(cluster_id)
        .ok_or_else(|| not_found("node pool", pool_id))?;
    let before = pools.len();
    pools.retain(|p| p.metadata.as_ref().and_then(|m| m.uid.as_deref()) != Some(pool_id));
    if pools.len() == before {
        return Err(not_found("node pool", pool_id));
    }
    Ok(())
}

pub async fn list_nodes(client: &MockCloudClient, cluster_id: &str) -> Result<Vec<Node>, CloudError> {
    client.record("list_nodes", cluster_id)?;
    Ok(lock(&client.nodes).get(cluster_id).cloned().unwrap_or_default())
}
