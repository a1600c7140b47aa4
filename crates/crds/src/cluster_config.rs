//! ClusterConfig Custom Resource Definition
//!
//! Declares the desired state of a managed Kubernetes cluster on the cloud
//! container engine, and records everything the operator observed or created
//! on the way there.
//!
//! Empty strings mean "not set" throughout. Status fields named `created*`
//! hold identifiers of resources this operator created and therefore owns:
//! teardown deletes exactly those, and nothing supplied by the user.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// ClusterConfigSpec defines the desired state of a managed cluster
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "cce.dcops.microscaler.io",
    version = "v1alpha1",
    kind = "ClusterConfig",
    namespaced,
    status = "ClusterConfigStatus",
    shortname = "ccecc",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"ClusterID","type":"string","jsonPath":".status.clusterID"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfigSpec {
    /// Credential secret reference in `namespace:name` form
    #[serde(default)]
    pub credential_secret: String,

    /// Cluster category (`CCE` or `Turbo`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,

    /// Region the cluster lives in
    #[serde(default, rename = "regionID")]
    pub region_id: String,

    /// Existing cluster identifier (imported clusters only)
    #[serde(default, rename = "clusterID", skip_serializing_if = "String::is_empty")]
    pub cluster_id: String,

    /// The cluster was created outside this operator
    #[serde(default)]
    pub imported: bool,

    /// Display name of the cluster on the provider
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Cluster type (`VirtualMachine` or `ARM64`)
    #[serde(default, rename = "type")]
    pub cluster_type: String,

    /// Control plane flavor
    #[serde(default)]
    pub flavor: String,

    /// Kubernetes version, e.g. `v1.25`
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub ipv6_enable: bool,

    /// Host network; leave VPC and subnet empty to have them created
    #[serde(default)]
    pub host_network: HostNetwork,

    #[serde(default)]
    pub container_network: ContainerNetwork,

    #[serde(default)]
    pub eni_network: EniNetwork,

    #[serde(default)]
    pub authentication: Authentication,

    /// Billing mode (0 = pay per use)
    #[serde(default)]
    pub billing_mode: i32,

    /// Service CIDR of the cluster
    #[serde(default, rename = "kubernetesSvcIPRange")]
    pub kubernetes_svc_ip_range: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// kube-proxy mode (`iptables` or `ipvs`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kube_proxy_mode: String,

    /// Expose the API server on a public address
    #[serde(default)]
    pub public_access: bool,

    /// Public IP to create for the API server
    #[serde(default, rename = "publicIP")]
    pub public_ip: ClusterPublicIp,

    #[serde(default)]
    pub extend_param: ClusterExtendParam,

    #[serde(default)]
    pub nat_gateway: NatGatewaySpec,

    #[serde(default)]
    pub node_pools: Vec<NodePool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostNetwork {
    #[serde(default, rename = "vpcID")]
    pub vpc_id: String,

    #[serde(default, rename = "subnetID")]
    pub subnet_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_group: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerNetwork {
    /// `overlay_l2`, `vpc-router` or `eni`
    #[serde(default)]
    pub mode: String,

    #[serde(default, rename = "cidr")]
    pub cidr: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EniNetwork {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    /// `rbac` or `authenticating_proxy`
    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub authenticating_proxy: AuthenticatingProxy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatingProxy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPublicIp {
    /// Create a new EIP for the API server
    #[serde(default, rename = "createEIP")]
    pub create_eip: bool,

    #[serde(default)]
    pub eip: Eip,
}

/// Elastic IP request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Eip {
    /// IP type, e.g. `5_bgp`
    #[serde(default)]
    pub ip_type: String,

    #[serde(default)]
    pub bandwidth: Bandwidth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bandwidth {
    /// `bandwidth` or `traffic`
    #[serde(default)]
    pub charge_mode: String,

    /// Size in Mbit/s
    #[serde(default)]
    pub size: i32,

    /// `PER` or `WHOLE`
    #[serde(default)]
    pub share_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterExtendParam {
    #[serde(default, rename = "clusterAZ", skip_serializing_if = "String::is_empty")]
    pub cluster_az: String,

    /// Existing public address for the API server
    #[serde(default, rename = "clusterExternalIP", skip_serializing_if = "String::is_empty")]
    pub cluster_external_ip: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub period_type: String,

    #[serde(default)]
    pub period_num: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub is_auto_renew: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub is_auto_pay: String,
}

/// NAT gateway request for outbound node traffic
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewaySpec {
    #[serde(default)]
    pub enabled: bool,

    /// Bind the SNAT rule to this EIP instead of creating one
    #[serde(default, rename = "existingEIPID", skip_serializing_if = "String::is_empty")]
    pub existing_eip_id: String,

    /// EIP to create for the SNAT rule
    #[serde(default, rename = "sNatRuleEIP")]
    pub snat_rule_eip: Eip,
}

/// A named group of identically configured worker nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    #[serde(default)]
    pub name: String,

    /// `vm`, `ElasticBMS` or `pm`
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub pool_type: String,

    /// Provider-assigned identifier, recorded once the pool exists
    #[serde(default, rename = "nodePoolID", skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub node_template: NodeTemplate,

    #[serde(default)]
    pub initial_node_count: i32,

    #[serde(default)]
    pub autoscaling: Autoscaling,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_security_groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_security_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    #[serde(default)]
    pub flavor: String,

    #[serde(default)]
    pub available_zone: String,

    #[serde(default)]
    pub operating_system: String,

    #[serde(default, rename = "sshKey")]
    pub ssh_key: String,

    #[serde(default)]
    pub root_volume: Volume,

    #[serde(default)]
    pub data_volumes: Vec<Volume>,

    #[serde(default, rename = "publicIP")]
    pub public_ip: NodePublicIp,

    #[serde(default)]
    pub count: i32,

    #[serde(default)]
    pub billing_mode: i32,

    /// Container runtime (`docker` or `containerd`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub runtime: String,

    #[serde(default)]
    pub extend_param: NodeExtendParam,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Size in GiB
    #[serde(default)]
    pub size: i32,

    /// Disk type, e.g. `SSD` or `SAS`
    #[serde(default, rename = "type")]
    pub volume_type: String,
}

impl Volume {
    /// Create a volume of the given size and type
    pub fn new(size: i32, volume_type: impl Into<String>) -> Self {
        Self {
            size,
            volume_type: volume_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodePublicIp {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,

    #[serde(default)]
    pub count: i32,

    #[serde(default)]
    pub eip: Eip,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeExtendParam {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub period_type: String,

    #[serde(default)]
    pub period_num: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub is_auto_renew: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Autoscaling {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub min_node_count: i32,

    #[serde(default)]
    pub max_node_count: i32,

    /// Cooldown after a scale-down, in minutes
    #[serde(default)]
    pub scale_down_cooldown_time: i32,

    #[serde(default)]
    pub priority: i32,
}

/// ClusterConfigStatus defines the observed state of a managed cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfigStatus {
    #[serde(default)]
    pub phase: ClusterPhase,

    /// Last reconciliation failure, empty when healthy
    #[serde(default)]
    pub failure_message: String,

    #[serde(default, rename = "clusterID")]
    pub cluster_id: String,

    #[serde(default)]
    pub host_network: HostNetwork,

    #[serde(default)]
    pub container_network: ContainerNetwork,

    #[serde(default)]
    pub node_pools: Vec<NodePool>,

    #[serde(default)]
    pub available_zone: String,

    #[serde(default, rename = "clusterExternalIP")]
    pub cluster_external_ip: String,

    #[serde(default, rename = "clusterExternalIPID")]
    pub cluster_external_ip_id: String,

    #[serde(default, rename = "createdNatGatewayID")]
    pub created_nat_gateway_id: String,

    #[serde(default, rename = "createdSNATRuleID")]
    pub created_snat_rule_id: String,

    #[serde(default, rename = "createdClusterEIPID")]
    pub created_cluster_eip_id: String,

    #[serde(default, rename = "createdSNatRuleEIPID")]
    pub created_snat_rule_eip_id: String,

    #[serde(default, rename = "createdVpcID")]
    pub created_vpc_id: String,

    #[serde(default, rename = "createdSubnetID")]
    pub created_subnet_id: String,

    #[serde(default, rename = "upgradeClusterTaskID")]
    pub upgrade_cluster_task_id: String,

    #[serde(default)]
    pub endpoints: Vec<ClusterEndpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEndpoint {
    #[serde(default)]
    pub url: String,

    /// `Internal` or `External`
    #[serde(default, rename = "type")]
    pub endpoint_type: String,
}

/// Lifecycle phase of a ClusterConfig
///
/// Serialized as the lowercase phase name; the not-yet-created phase is the
/// empty string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
pub enum ClusterPhase {
    /// Nothing has been provisioned yet
    #[default]
    #[serde(rename = "")]
    NotCreated,

    /// Adopting an existing cluster
    #[serde(rename = "importing")]
    Importing,

    /// Cluster creation requested, waiting for the provider
    #[serde(rename = "creating")]
    Creating,

    /// Converged
    #[serde(rename = "active")]
    Active,

    /// Converging, or failing to converge
    #[serde(rename = "updating")]
    Updating,
}

impl ClusterPhase {
    /// Wire representation of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotCreated => "",
            Self::Importing => "importing",
            Self::Creating => "creating",
            Self::Active => "active",
            Self::Updating => "updating",
        }
    }
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static EMPTY_STATUS: LazyLock<ClusterConfigStatus> = LazyLock::new(ClusterConfigStatus::default);

impl ClusterConfig {
    /// Observed state, or an empty status when none has been written yet
    pub fn observed(&self) -> &ClusterConfigStatus {
        self.status.as_ref().unwrap_or(&EMPTY_STATUS)
    }

    /// Mutable status, created empty on first access
    pub fn status_mut(&mut self) -> &mut ClusterConfigStatus {
        self.status.get_or_insert_with(ClusterConfigStatus::default)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ClusterPhase {
        self.observed().phase
    }
}
