//! Cloud provider API models
//!
//! Request and response shapes for the container engine (clusters, node
//! pools, nodes, upgrade tasks, certificates) and the networking services
//! the operator provisions (VPC, subnet, EIP, NAT, DNS, VPC endpoint).
//!
//! Fields the provider may omit are `Option`s so callers can tell "absent"
//! from "empty" and report malformed responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Clusters
// ============================================================================

/// Managed cluster as returned by the container engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ClusterMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ClusterSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterStatus>,
}

impl Cluster {
    /// Reported lifecycle state, `None` when the provider sent no status
    pub fn state(&self) -> Option<&ClusterState> {
        self.status.as_ref().and_then(|s| s.phase.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<String>,

    #[serde(default)]
    pub flavor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6enable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_network: Option<HostNetwork>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_network: Option<ContainerNetwork>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eni_network: Option<EniNetwork>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<i32>,

    #[serde(default, rename = "kubernetesSvcIpRange", skip_serializing_if = "Option::is_none")]
    pub kubernetes_svc_ip_range: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_tags: Vec<ResourceTag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_param: Option<ClusterExtendParam>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostNetwork {
    #[serde(default)]
    pub vpc: String,

    #[serde(default)]
    pub subnet: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerNetwork {
    #[serde(default)]
    pub mode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EniNetwork {
    #[serde(default)]
    pub subnets: Vec<EniSubnet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EniSubnet {
    #[serde(default, rename = "subnetID")]
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticating_proxy: Option<AuthenticatingProxy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatingProxy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterExtendParam {
    #[serde(default, rename = "clusterAZ", skip_serializing_if = "Option::is_none")]
    pub cluster_az: Option<String>,

    #[serde(default, rename = "clusterExternalIP", skip_serializing_if = "Option::is_none")]
    pub cluster_external_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_num: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_renew: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_pay: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ClusterState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<ClusterEndpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// `Internal` or `External`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub endpoint_type: Option<String>,
}

/// Cluster lifecycle state reported by the container engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterState {
    Available,
    Unavailable,
    ScalingUp,
    ScalingDown,
    Creating,
    Deleting,
    Upgrading,
    Resizing,
    RollingBack,
    RollbackFailed,
    Empty,
    #[serde(other)]
    Unknown,
}

impl ClusterState {
    /// The cluster is mid-transition and will not accept another mutation
    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            Self::Deleting
                | Self::Creating
                | Self::Upgrading
                | Self::Resizing
                | Self::ScalingDown
                | Self::ScalingUp
                | Self::RollingBack
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterList {
    #[serde(default)]
    pub items: Vec<Cluster>,
}

/// Cluster metadata update (alias, description, security group)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterRequest {
    pub metadata: UpdateClusterMetadata,
    pub spec: UpdateClusterSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterMetadata {
    pub alias: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterSpec {
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_network: Option<UpdateClusterHostNetwork>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterHostNetwork {
    pub security_group: String,
}

// ============================================================================
// Upgrades and certificates
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeClusterRequest {
    pub metadata: UpgradeRequestMetadata,
    pub spec: UpgradeSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequestMetadata {
    pub api_version: String,
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSpec {
    pub cluster_upgrade_action: ClusterUpgradeAction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpgradeAction {
    pub strategy: UpgradeStrategy,
    pub target_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeStrategy {
    #[serde(rename = "type")]
    pub strategy_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_place_rolling_update: Option<InPlaceRollingUpdate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InPlaceRollingUpdate {
    pub user_defined_step: i32,
}

/// Upgrade task, returned both when starting and when polling an upgrade
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UpgradeTaskMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UpgradeTaskStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeTaskMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeTaskStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<UpgradeTaskState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeTaskState {
    Init,
    Queuing,
    Running,
    Pause,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Kubeconfig-shaped certificate bundle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterCert {
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedCluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterCertEndpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterCertEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, rename = "certificate-authority-data", skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
}

// ============================================================================
// Node pools and nodes
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodePoolMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<NodePoolSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodePoolStatus>,
}

impl NodePool {
    /// Reported pool state, `None` when the provider sent no status
    pub fn state(&self) -> Option<&NodePoolState> {
        self.status.as_ref().and_then(|s| s.phase.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<String>,

    #[serde(default)]
    pub node_template: NodeSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_node_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<NodePoolAutoscaling>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_security_groups: Vec<SecurityId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_security_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecurityId {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolAutoscaling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_node_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_node_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_down_cooldown_time: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Template every node of a pool is created from
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    #[serde(default)]
    pub flavor: String,

    #[serde(default)]
    pub az: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<Login>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<Volume>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_volumes: Vec<Volume>,

    #[serde(default, rename = "publicIP", skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<NodePublicIp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_param: Option<NodeExtendParam>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    #[serde(default)]
    pub size: i32,

    #[serde(default)]
    pub volumetype: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodePublicIp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip: Option<NodeEip>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeEip {
    #[serde(default)]
    pub iptype: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<NodeBandwidth>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeBandwidth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chargemode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharetype: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Runtime {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeExtendParam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_num: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_renew: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<NodePoolState>,
}

/// Node pool state; the provider reports a healthy pool as an empty string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodePoolState {
    #[serde(rename = "")]
    Normal,
    Synchronizing,
    Synchronized,
    SoldOut,
    Deleting,
    Error,
    #[serde(other)]
    Unknown,
}

impl NodePoolState {
    /// The pool is applying a change and will not accept another one
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Synchronizing | Self::Synchronized | Self::SoldOut)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolList {
    #[serde(default)]
    pub items: Vec<NodePool>,
}

/// Scaling update for an existing pool
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolUpdate {
    pub metadata: NodePoolMetadata,
    pub spec: NodePoolSpecUpdate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpecUpdate {
    pub node_template: serde_json::Map<String, serde_json::Value>,
    pub initial_node_count: i32,
    pub autoscaling: NodePoolAutoscaling,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
}

impl Node {
    /// Reported node state
    pub fn state(&self) -> Option<&NodeState> {
        self.status.as_ref().and_then(|s| s.phase.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<NodeState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Build,
    Installing,
    Installed,
    ShutDown,
    Upgrading,
    Active,
    Abnormal,
    Deleting,
    Error,
    #[serde(other)]
    Unknown,
}

impl NodeState {
    /// Node is still being built, changed or removed
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Installing | Self::Upgrading | Self::Build | Self::Deleting)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeList {
    #[serde(default)]
    pub items: Vec<Node>,
}

// ============================================================================
// Networking
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vpc {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub cidr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateVpcRequest {
    pub name: String,
    pub cidr: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Subnet {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub cidr: String,

    #[serde(default)]
    pub gateway_ip: String,

    #[serde(default)]
    pub vpc_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateSubnetRequest {
    pub name: String,
    pub cidr: String,
    pub gateway_ip: String,
    pub vpc_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub primary_dns: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secondary_dns: String,

    pub description: String,
}

/// Elastic public IP
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublicIp {
    pub id: String,

    #[serde(default)]
    pub public_ip_address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreatePublicIpRequest {
    pub publicip: PublicIpOption,
    pub bandwidth: BandwidthOption,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublicIpOption {
    #[serde(rename = "type")]
    pub ip_type: String,

    pub alias: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BandwidthOption {
    pub name: String,
    pub size: i32,

    /// `PER` or `WHOLE`
    pub share_type: String,

    /// `bandwidth` or `traffic`
    pub charge_mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NatGateway {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub router_id: String,

    #[serde(default)]
    pub internal_network_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateNatGatewayRequest {
    pub name: String,

    /// VPC the gateway serves
    pub router_id: String,

    /// Subnet the gateway is attached to
    pub internal_network_id: String,

    /// Gateway size (`1` = small)
    pub spec: String,

    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnatRule {
    pub id: String,

    #[serde(default)]
    pub nat_gateway_id: String,

    #[serde(default)]
    pub floating_ip_id: String,

    #[serde(default)]
    pub network_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateSnatRuleRequest {
    pub nat_gateway_id: String,
    pub network_id: String,

    /// `0` = VPC subnet
    pub source_type: i32,

    pub floating_ip_id: String,
    pub description: String,
}

/// Region DNS server set
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Nameserver {
    #[serde(default, rename = "type")]
    pub server_type: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub ns_records: Vec<NsRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub priority: i32,
}

/// VPC endpoint service, which pins its VPC until deleted
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EndpointService {
    pub id: String,

    #[serde(default)]
    pub vpc_id: String,

    #[serde(default)]
    pub service_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
