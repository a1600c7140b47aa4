//! Mock CloudClient for unit testing
//!
//! In-memory implementation of [`CloudClientTrait`] used by the operator's
//! reconciler tests. Every call is recorded as `operation:argument`, and
//! failures can be injected per operation.
//!
//! The mock is organized into domain-specific modules:
//! - `cluster.rs` - container engine operations (clusters, node pools, nodes, upgrades)
//! - `network.rs` - VPC, subnet, EIP, NAT, DNS and VPC endpoint operations

mod cluster;
mod network;

use crate::cloud_trait::CloudClientTrait;
use crate::error::{CloudError, ProviderError};
use crate::models::*;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock CloudClient for testing
///
/// Resources live in shared maps so clones observe the same state, which
/// lets a test keep a handle while the operator owns another.
#[derive(Debug, Clone)]
pub struct MockCloudClient {
    pub(crate) region: String,
    pub(crate) clusters: Arc<Mutex<BTreeMap<String, Cluster>>>,
    pub(crate) node_pools: Arc<Mutex<BTreeMap<String, Vec<NodePool>>>>,
    pub(crate) nodes: Arc<Mutex<BTreeMap<String, Vec<Node>>>>,
    pub(crate) upgrade_tasks: Arc<Mutex<BTreeMap<String, UpgradeTask>>>,
    pub(crate) certs: Arc<Mutex<BTreeMap<String, ClusterCert>>>,
    pub(crate) vpcs: Arc<Mutex<BTreeMap<String, Vpc>>>,
    pub(crate) subnets: Arc<Mutex<BTreeMap<String, Subnet>>>,
    pub(crate) public_ips: Arc<Mutex<BTreeMap<String, PublicIp>>>,
    pub(crate) nat_gateways: Arc<Mutex<BTreeMap<String, NatGateway>>>,
    pub(crate) snat_rules: Arc<Mutex<BTreeMap<String, SnatRule>>>,
    pub(crate) nameservers: Arc<Mutex<Vec<Nameserver>>>,
    /// (primary, secondary) DNS each subnet was created with
    pub(crate) subnet_dns: Arc<Mutex<BTreeMap<String, (String, String)>>>,
    pub(crate) endpoint_services: Arc<Mutex<BTreeMap<String, EndpointService>>>,
    // Injected failures, keyed by operation name
    failures: Arc<Mutex<HashMap<String, VecDeque<ProviderError>>>>,
    persistent_failures: Arc<Mutex<HashMap<String, ProviderError>>>,
    calls: Arc<Mutex<Vec<String>>>,
    next_id: Arc<Mutex<u64>>,
}

/// Lock a mock map, recovering the data if a panicking test poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockCloudClient {
    /// Create a new mock client for `region`
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            clusters: Arc::default(),
            node_pools: Arc::default(),
            nodes: Arc::default(),
            upgrade_tasks: Arc::default(),
            certs: Arc::default(),
            vpcs: Arc::default(),
            subnets: Arc::default(),
            public_ips: Arc::default(),
            nat_gateways: Arc::default(),
            snat_rules: Arc::default(),
            nameservers: Arc::new(Mutex::new(vec![default_nameserver()])),
            subnet_dns: Arc::default(),
            endpoint_services: Arc::default(),
            failures: Arc::default(),
            persistent_failures: Arc::default(),
            calls: Arc::default(),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Fail the next call to `operation` with `error`
    ///
    /// Multiple injections for the same operation are consumed in order.
    pub fn fail_next(&self, operation: &str, error: ProviderError) {
        lock(&self.failures)
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Fail every call to `operation` until [`Self::clear_failures`]
    pub fn fail_always(&self, operation: &str, error: ProviderError) {
        lock(&self.persistent_failures).insert(operation.to_string(), error);
    }

    /// Drop all injected failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
        lock(&self.persistent_failures).clear();
    }

    /// Every call made so far, as `operation:argument`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of calls made to `operation`
    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    /// Forget recorded calls (state and injected failures are kept)
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Add a cluster to the mock store (for test setup)
    pub fn add_cluster(&self, cluster: Cluster) {
        let id = cluster
            .metadata
            .as_ref()
            .and_then(|m| m.uid.clone())
            .unwrap_or_default();
        lock(&self.clusters).insert(id, cluster);
    }

    /// Get a stored cluster (for assertions)
    pub fn cluster(&self, cluster_id: &str) -> Option<Cluster> {
        lock(&self.clusters).get(cluster_id).cloned()
    }

    /// Set the reported state of a stored cluster
    pub fn set_cluster_state(&self, cluster_id: &str, state: ClusterState) {
        if let Some(cluster) = lock(&self.clusters).get_mut(cluster_id) {
            cluster.status.get_or_insert_with(ClusterStatus::default).phase = Some(state);
        }
    }

    /// Replace the node pools of a cluster (for test setup)
    pub fn set_node_pools(&self, cluster_id: &str, pools: Vec<NodePool>) {
        lock(&self.node_pools).insert(cluster_id.to_string(), pools);
    }

    /// Node pools currently stored for a cluster
    pub fn node_pools(&self, cluster_id: &str) -> Vec<NodePool> {
        lock(&self.node_pools).get(cluster_id).cloned().unwrap_or_default()
    }

    /// Set the reported state of a stored node pool
    pub fn set_node_pool_state(&self, cluster_id: &str, pool_id: &str, state: NodePoolState) {
        if let Some(pools) = lock(&self.node_pools).get_mut(cluster_id) {
            for pool in pools.iter_mut() {
                if pool.metadata.as_ref().and_then(|m| m.uid.as_deref()) == Some(pool_id) {
                    pool.status.get_or_insert_with(NodePoolStatus::default).phase = Some(state);
                }
            }
        }
    }

    /// Replace the nodes of a cluster (for test setup)
    pub fn set_nodes(&self, cluster_id: &str, nodes: Vec<Node>) {
        lock(&self.nodes).insert(cluster_id.to_string(), nodes);
    }

    /// Add an upgrade task (for test setup)
    pub fn add_upgrade_task(&self, task_id: &str, task: UpgradeTask) {
        lock(&self.upgrade_tasks).insert(task_id.to_string(), task);
    }

    /// Add a VPC endpoint service (for test setup)
    pub fn add_endpoint_service(&self, service: EndpointService) {
        lock(&self.endpoint_services).insert(service.id.clone(), service);
    }

    /// Replace the region's nameservers (for test setup)
    pub fn set_nameservers(&self, nameservers: Vec<Nameserver>) {
        *lock(&self.nameservers) = nameservers;
    }

    /// DNS servers a subnet was created with
    pub fn subnet_dns(&self, subnet_id: &str) -> Option<(String, String)> {
        lock(&self.subnet_dns).get(subnet_id).cloned()
    }

    /// Add a SNAT rule (for test setup)
    pub fn add_snat_rule(&self, rule: SnatRule) {
        lock(&self.snat_rules).insert(rule.id.clone(), rule);
    }

    /// Whether a network resource with this id still exists
    pub fn network_resource_exists(&self, id: &str) -> bool {
        lock(&self.vpcs).contains_key(id)
            || lock(&self.subnets).contains_key(id)
            || lock(&self.public_ips).contains_key(id)
            || lock(&self.nat_gateways).contains_key(id)
            || lock(&self.snat_rules).contains_key(id)
            || lock(&self.endpoint_services).contains_key(id)
    }

    /// Generate next ID with a resource prefix
    pub(crate) fn next_id(&self, prefix: &str) -> String {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        format!("{}-{}", prefix, current)
    }

    /// Record a call and return any failure injected for it
    pub(crate) fn record(&self, operation: &str, argument: &str) -> Result<(), CloudError> {
        lock(&self.calls).push(format!("{}:{}", operation, argument));

        if let Some(error) = lock(&self.failures)
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(CloudError::Provider(error));
        }
        if let Some(error) = lock(&self.persistent_failures).get(operation) {
            return Err(CloudError::Provider(error.clone()));
        }
        Ok(())
    }
}

fn default_nameserver() -> Nameserver {
    Nameserver {
        server_type: "private".to_string(),
        region: String::new(),
        ns_records: vec![
            NsRecord {
                hostname: None,
                address: Some("100.125.1.250".to_string()),
                priority: 1,
            },
            NsRecord {
                hostname: None,
                address: Some("100.125.129.250".to_string()),
                priority: 2,
            },
        ],
    }
}

pub(crate) fn not_found(kind: &str, id: &str) -> CloudError {
    CloudError::Provider(ProviderError::not_found(format!("{} {} not found", kind, id)))
}

#[async_trait::async_trait]
impl CloudClientTrait for MockCloudClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, CloudError> {
        cluster::list_clusters(self).await
    }

    async fn show_cluster(&self, cluster_id: &str) -> Result<Cluster, CloudError> {
        cluster::show_cluster(self, cluster_id).await
    }

    async fn create_cluster(&self, request: &Cluster) -> Result<Cluster, CloudError> {
        cluster::create_cluster(self, request).await
    }

    async fn update_cluster(&self, cluster_id: &str, request: &UpdateClusterRequest) -> Result<Cluster, CloudError> {
        cluster::update_cluster(self, cluster_id, request).await
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), CloudError> {
        cluster::delete_cluster(self, cluster_id).await
    }

    async fn upgrade_cluster(&self, cluster_id: &str, request: &UpgradeClusterRequest) -> Result<UpgradeTask, CloudError> {
        cluster::upgrade_cluster(self, cluster_id, request).await
    }

    async fn show_upgrade_task(&self, cluster_id: &str, task_id: &str) -> Result<UpgradeTask, CloudError> {
        cluster::show_upgrade_task(self, cluster_id, task_id).await
    }

    async fn create_cluster_cert(&self, cluster_id: &str, duration_days: i32) -> Result<ClusterCert, CloudError> {
        cluster::create_cluster_cert(self, cluster_id, duration_days).await
    }

    async fn list_node_pools(&self, cluster_id: &str) -> Result<Vec<NodePool>, CloudError> {
        cluster::list_node_pools(self, cluster_id).await
    }

    async fn create_node_pool(&self, cluster_id: &str, pool: &NodePool) -> Result<NodePool, CloudError> {
        cluster::create_node_pool(self, cluster_id, pool).await
    }

    async fn update_node_pool(&self, cluster_id: &str, pool_id: &str, update: &NodePoolUpdate) -> Result<NodePool, CloudError> {
        cluster::update_node_pool(self, cluster_id, pool_id, update).await
    }

    async fn delete_node_pool(&self, cluster_id: &str, pool_id: &str) -> Result<(), CloudError> {
        cluster::delete_node_pool(self, cluster_id, pool_id).await
    }

    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<Node>, CloudError> {
        cluster::list_nodes(self, cluster_id).await
    }

    async fn create_vpc(&self, request: &CreateVpcRequest) -> Result<Vpc, CloudError> {
        network::create_vpc(self, request).await
    }

    async fn show_vpc(&self, vpc_id: &str) -> Result<Vpc, CloudError> {
        network::show_vpc(self, vpc_id).await
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), CloudError> {
        network::delete_vpc(self, vpc_id).await
    }

    async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<Subnet, CloudError> {
        network::create_subnet(self, request).await
    }

    async fn show_subnet(&self, subnet_id: &str) -> Result<Subnet, CloudError> {
        network::show_subnet(self, subnet_id).await
    }

    async fn delete_subnet(&self, vpc_id: &str, subnet_id: &str) -> Result<(), CloudError> {
        network::delete_subnet(self, vpc_id, subnet_id).await
    }

    async fn create_public_ip(&self, request: &CreatePublicIpRequest) -> Result<PublicIp, CloudError> {
        network::create_public_ip(self, request).await
    }

    async fn show_public_ip(&self, public_ip_id: &str) -> Result<PublicIp, CloudError> {
        network::show_public_ip(self, public_ip_id).await
    }

    async fn delete_public_ip(&self, public_ip_id: &str) -> Result<(), CloudError> {
        network::delete_public_ip(self, public_ip_id).await
    }

    async fn create_nat_gateway(&self, request: &CreateNatGatewayRequest) -> Result<NatGateway, CloudError> {
        network::create_nat_gateway(self, request).await
    }

    async fn show_nat_gateway(&self, nat_gateway_id: &str) -> Result<NatGateway, CloudError> {
        network::show_nat_gateway(self, nat_gateway_id).await
    }

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), CloudError> {
        network::delete_nat_gateway(self, nat_gateway_id).await
    }

    async fn create_snat_rule(&self, request: &CreateSnatRuleRequest) -> Result<SnatRule, CloudError> {
        network::create_snat_rule(self, request).await
    }

    async fn list_snat_rules(&self, nat_gateway_id: &str) -> Result<Vec<SnatRule>, CloudError> {
        network::list_snat_rules(self, nat_gateway_id).await
    }

    async fn delete_snat_rule(&self, nat_gateway_id: &str, rule_id: &str) -> Result<(), CloudError> {
        network::delete_snat_rule(self, nat_gateway_id, rule_id).await
    }

    async fn list_nameservers(&self, region: &str) -> Result<Vec<Nameserver>, CloudError> {
        network::list_nameservers(self, region).await
    }

    async fn list_endpoint_services(&self) -> Result<Vec<EndpointService>, CloudError> {
        network::list_endpoint_services(self).await
    }

    async fn delete_endpoint_service(&self, service_id: &str) -> Result<(), CloudError> {
        network::delete_endpoint_service(self, service_id).await
    }
}
