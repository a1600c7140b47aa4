//! CloudClient trait for mocking
//!
//! This trait abstracts the cloud API so the operator's reconcilers can be
//! exercised against an in-memory mock. The concrete [`crate::CloudClient`]
//! implements it over signed HTTP.

use crate::error::CloudError;
use crate::models::*;

/// Trait for cloud provider API operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait CloudClientTrait: Send + Sync {
    /// Region the client is bound to
    fn region(&self) -> &str;

    // Container engine: clusters
    async fn list_clusters(&self) -> Result<Vec<Cluster>, CloudError>;
    async fn show_cluster(&self, cluster_id: &str) -> Result<Cluster, CloudError>;
    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster, CloudError>;
    async fn update_cluster(&self, cluster_id: &str, request: &UpdateClusterRequest) -> Result<Cluster, CloudError>;
    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), CloudError>;
    async fn upgrade_cluster(&self, cluster_id: &str, request: &UpgradeClusterRequest) -> Result<UpgradeTask, CloudError>;
    async fn show_upgrade_task(&self, cluster_id: &str, task_id: &str) -> Result<UpgradeTask, CloudError>;
    async fn create_cluster_cert(&self, cluster_id: &str, duration_days: i32) -> Result<ClusterCert, CloudError>;

    // Container engine: node pools and nodes
    async fn list_node_pools(&self, cluster_id: &str) -> Result<Vec<NodePool>, CloudError>;
    async fn create_node_pool(&self, cluster_id: &str, pool: &NodePool) -> Result<NodePool, CloudError>;
    async fn update_node_pool(&self, cluster_id: &str, pool_id: &str, update: &NodePoolUpdate) -> Result<NodePool, CloudError>;
    async fn delete_node_pool(&self, cluster_id: &str, pool_id: &str) -> Result<(), CloudError>;
    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<Node>, CloudError>;

    // VPC and subnets
    async fn create_vpc(&self, request: &CreateVpcRequest) -> Result<Vpc, CloudError>;
    async fn show_vpc(&self, vpc_id: &str) -> Result<Vpc, CloudError>;
    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), CloudError>;
    async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<Subnet, CloudError>;
    async fn show_subnet(&self, subnet_id: &str) -> Result<Subnet, CloudError>;
    async fn delete_subnet(&self, vpc_id: &str, subnet_id: &str) -> Result<(), CloudError>;

    // Elastic IPs
    async fn create_public_ip(&self, request: &CreatePublicIpRequest) -> Result<PublicIp, CloudError>;
    async fn show_public_ip(&self, public_ip_id: &str) -> Result<PublicIp, CloudError>;
    async fn delete_public_ip(&self, public_ip_id: &str) -> Result<(), CloudError>;

    // NAT gateways and SNAT rules
    async fn create_nat_gateway(&self, request: &CreateNatGatewayRequest) -> Result<NatGateway, CloudError>;
    async fn show_nat_gateway(&self, nat_gateway_id: &str) -> Result<NatGateway, CloudError>;
    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), CloudError>;
    async fn create_snat_rule(&self, request: &CreateSnatRuleRequest) -> Result<SnatRule, CloudError>;
    async fn list_snat_rules(&self, nat_gateway_id: &str) -> Result<Vec<SnatRule>, CloudError>;
    async fn delete_snat_rule(&self, nat_gateway_id: &str, rule_id: &str) -> Result<(), CloudError>;

    // DNS
    async fn list_nameservers(&self, region: &str) -> Result<Vec<Nameserver>, CloudError>;

    // VPC endpoint services
    async fn list_endpoint_services(&self) -> Result<Vec<EndpointService>, CloudError>;
    async fn delete_endpoint_service(&self, service_id: &str) -> Result<(), CloudError>;
}
