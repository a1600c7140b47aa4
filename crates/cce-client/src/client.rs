//! Cloud API client
//!
//! Implements [`CloudClientTrait`] over the providers' REST APIs:
//! container engine v3 (`/api/v3/projects/{project}/clusters/...`), VPC and
//! EIP v1, NAT v2, DNS v2 and VPC endpoint v1.

use crate::auth::ClientAuth;
use crate::cloud_trait::CloudClientTrait;
use crate::common::{DEFAULT_DOMAIN, HttpClient, service_endpoint};
use crate::error::CloudError;
use crate::models::*;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URLs of every service the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub cce: String,
    pub vpc: String,
    pub eip: String,
    pub nat: String,
    pub dns: String,
    pub vpcep: String,
}

impl Endpoints {
    /// Public regional endpoints
    pub fn for_region(region: &str, domain: &str) -> Self {
        Self {
            cce: service_endpoint("cce", region, domain),
            vpc: service_endpoint("vpc", region, domain),
            eip: service_endpoint("vpc", region, domain),
            nat: service_endpoint("nat", region, domain),
            dns: service_endpoint("dns", region, domain),
            vpcep: service_endpoint("vpcep", region, domain),
        }
    }

    /// Route every service to one base URL (gateways, test servers)
    pub fn single(base_url: &str) -> Self {
        Self {
            cce: base_url.to_string(),
            vpc: base_url.to_string(),
            eip: base_url.to_string(),
            nat: base_url.to_string(),
            dns: base_url.to_string(),
            vpcep: base_url.to_string(),
        }
    }
}

/// Cloud API client bound to one region and one account
#[derive(Debug, Clone)]
pub struct CloudClient {
    region: String,
    project_id: String,
    cce: HttpClient,
    vpc: HttpClient,
    eip: HttpClient,
    nat: HttpClient,
    dns: HttpClient,
    vpcep: HttpClient,
}

#[derive(Deserialize)]
struct VpcEnvelope {
    vpc: Vpc,
}

#[derive(Deserialize)]
struct SubnetEnvelope {
    subnet: Subnet,
}

#[derive(Deserialize)]
struct PublicIpEnvelope {
    publicip: PublicIp,
}

#[derive(Deserialize)]
struct NatGatewayEnvelope {
    nat_gateway: NatGateway,
}

#[derive(Deserialize)]
struct SnatRuleEnvelope {
    snat_rule: SnatRule,
}

#[derive(Deserialize)]
struct SnatRuleList {
    #[serde(default)]
    snat_rules: Vec<SnatRule>,
}

#[derive(Deserialize)]
struct NameserverList {
    #[serde(default)]
    nameservers: Vec<Nameserver>,
}

#[derive(Deserialize)]
struct EndpointServiceList {
    #[serde(default)]
    endpoint_services: Vec<EndpointService>,
}

impl CloudClient {
    /// Create a client for the public endpoints of `auth.region`
    pub fn new(auth: ClientAuth) -> Result<Self, CloudError> {
        let endpoints = Endpoints::for_region(&auth.region, DEFAULT_DOMAIN);
        Self::with_endpoints(auth, endpoints)
    }

    /// Create a client with explicit service endpoints
    pub fn with_endpoints(auth: ClientAuth, endpoints: Endpoints) -> Result<Self, CloudError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let region = auth.region.clone();
        let project_id = auth.project_id().to_string();
        let auth = Arc::new(auth);
        let service = |base: String| HttpClient::new(client.clone(), base, Arc::clone(&auth));

        Ok(Self {
            region,
            project_id,
            cce: service(endpoints.cce),
            vpc: service(endpoints.vpc),
            eip: service(endpoints.eip),
            nat: service(endpoints.nat),
            dns: service(endpoints.dns),
            vpcep: service(endpoints.vpcep),
        })
    }

    fn clusters_path(&self) -> String {
        format!("/api/v3/projects/{}/clusters", self.project_id)
    }

    fn cluster_path(&self, cluster_id: &str) -> String {
        format!("{}/{}", self.clusters_path(), urlencoding::encode(cluster_id))
    }
}

/// Longest certificate the container engine will issue, in days
const MAX_CERT_DAYS: i32 = 365 * 30;

/// Validate a certificate lifetime; `0` and `-1` both request the maximum
fn cert_duration(days: i32) -> Result<i32, CloudError> {
    match days {
        0 => Ok(-1),
        d if d > MAX_CERT_DAYS || d < -1 => Err(CloudError::InvalidRequest(format!(
            "invalid certificate duration {d}: must be between 1 and {MAX_CERT_DAYS} days, or -1"
        ))),
        d => Ok(d),
    }
}

#[async_trait::async_trait]
impl CloudClientTrait for CloudClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, CloudError> {
        let list: ClusterList = self.cce.get(&self.clusters_path()).await?;
        Ok(list.items)
    }

    async fn show_cluster(&self, cluster_id: &str) -> Result<Cluster, CloudError> {
        self.cce.get(&self.cluster_path(cluster_id)).await
    }

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster, CloudError> {
        let name = cluster.metadata.as_ref().map(|m| m.name.as_str()).unwrap_or_default();
        debug!("Creating cluster {}", name);
        let body = serde_json::to_value(cluster)?;
        self.cce.post(&self.clusters_path(), &body).await
    }

    async fn update_cluster(&self, cluster_id: &str, request: &UpdateClusterRequest) -> Result<Cluster, CloudError> {
        let body = serde_json::to_value(request)?;
        self.cce.put(&self.cluster_path(cluster_id), &body).await
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), CloudError> {
        let path = format!(
            "{}?delete_efs=true&delete_eni=true&delete_evs=true&delete_net=true&delete_obs=true&delete_sfs=true",
            self.cluster_path(cluster_id)
        );
        self.cce.delete(&path).await
    }

    async fn upgrade_cluster(&self, cluster_id: &str, request: &UpgradeClusterRequest) -> Result<UpgradeTask, CloudError> {
        let body = serde_json::to_value(request)?;
        let path = format!("{}/operation/upgrade", self.cluster_path(cluster_id));
        self.cce.post(&path, &body).await
    }

    async fn show_upgrade_task(&self, cluster_id: &str, task_id: &str) -> Result<UpgradeTask, CloudError> {
        let path = format!(
            "{}/operation/upgrade/tasks/{}",
            self.cluster_path(cluster_id),
            urlencoding::encode(task_id)
        );
        self.cce.get(&path).await
    }

    async fn create_cluster_cert(&self, cluster_id: &str, duration_days: i32) -> Result<ClusterCert, CloudError> {
        let duration = cert_duration(duration_days)?;
        let path = format!("{}/clustercert", self.cluster_path(cluster_id));
        self.cce.post(&path, &json!({ "duration": duration })).await
    }

    async fn list_node_pools(&self, cluster_id: &str) -> Result<Vec<NodePool>, CloudError> {
        let path = format!("{}/nodepools", self.cluster_path(cluster_id));
        let list: NodePoolList = self.cce.get(&path).await?;
        Ok(list.items)
    }

    async fn create_node_pool(&self, cluster_id: &str, pool: &NodePool) -> Result<NodePool, CloudError> {
        let path = format!("{}/nodepools", self.cluster_path(cluster_id));
        let body = serde_json::to_value(pool)?;
        self.cce.post(&path, &body).await
    }

    async fn update_node_pool(&self, cluster_id: &str, pool_id: &str, update: &NodePoolUpdate) -> Result<NodePool, CloudError> {
        let path = format!("{}/nodepools/{}", self.cluster_path(cluster_id), urlencoding::encode(pool_id));
        let body = serde_json::to_value(update)?;
        self.cce.put(&path, &body).await
    }

    async fn delete_node_pool(&self, cluster_id: &str, pool_id: &str) -> Result<(), CloudError> {
        let path = format!("{}/nodepools/{}", self.cluster_path(cluster_id), urlencoding::encode(pool_id));
        self.cce.delete(&path).await
    }

    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<Node>, CloudError> {
        let path = format!("{}/nodes", self.cluster_path(cluster_id));
        let list: NodeList = self.cce.get(&path).await?;
        Ok(list.items)
    }

    async fn create_vpc(&self, request: &CreateVpcRequest) -> Result<Vpc, CloudError> {
        let path = format!("/v1/{}/vpcs", self.project_id);
        let envelope: VpcEnvelope = self.vpc.post(&path, &json!({ "vpc": request })).await?;
        Ok(envelope.vpc)
    }

    async fn show_vpc(&self, vpc_id: &str) -> Result<Vpc, CloudError> {
        let path = format!("/v1/{}/vpcs/{}", self.project_id, urlencoding::encode(vpc_id));
        let envelope: VpcEnvelope = self.vpc.get(&path).await?;
        Ok(envelope.vpc)
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), CloudError> {
        let path = format!("/v1/{}/vpcs/{}", self.project_id, urlencoding::encode(vpc_id));
        self.vpc.delete(&path).await
    }

    async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<Subnet, CloudError> {
        let path = format!("/v1/{}/subnets", self.project_id);
        let envelope: SubnetEnvelope = self.vpc.post(&path, &json!({ "subnet": request })).await?;
        Ok(envelope.subnet)
    }

    async fn show_subnet(&self, subnet_id: &str) -> Result<Subnet, CloudError> {
        let path = format!("/v1/{}/subnets/{}", self.project_id, urlencoding::encode(subnet_id));
        let envelope: SubnetEnvelope = self.vpc.get(&path).await?;
        Ok(envelope.subnet)
    }

    async fn delete_subnet(&self, vpc_id: &str, subnet_id: &str) -> Result<(), CloudError> {
        let path = format!(
            "/v1/{}/vpcs/{}/subnets/{}",
            self.project_id,
            urlencoding::encode(vpc_id),
            urlencoding::encode(subnet_id)
        );
        self.vpc.delete(&path).await
    }

    async fn create_public_ip(&self, request: &CreatePublicIpRequest) -> Result<PublicIp, CloudError> {
        let path = format!("/v1/{}/publicips", self.project_id);
        let body = serde_json::to_value(request)?;
        let envelope: PublicIpEnvelope = self.eip.post(&path, &body).await?;
        Ok(envelope.publicip)
    }

    async fn show_public_ip(&self, public_ip_id: &str) -> Result<PublicIp, CloudError> {
        let path = format!("/v1/{}/publicips/{}", self.project_id, urlencoding::encode(public_ip_id));
        let envelope: PublicIpEnvelope = self.eip.get(&path).await?;
        Ok(envelope.publicip)
    }

    async fn delete_public_ip(&self, public_ip_id: &str) -> Result<(), CloudError> {
        let path = format!("/v1/{}/publicips/{}", self.project_id, urlencoding::encode(public_ip_id));
        self.eip.delete(&path).await
    }

    async fn create_nat_gateway(&self, request: &CreateNatGatewayRequest) -> Result<NatGateway, CloudError> {
        let path = format!("/v2/{}/nat_gateways", self.project_id);
        let envelope: NatGatewayEnvelope = self.nat.post(&path, &json!({ "nat_gateway": request })).await?;
        Ok(envelope.nat_gateway)
    }

    async fn show_nat_gateway(&self, nat_gateway_id: &str) -> Result<NatGateway, CloudError> {
        let path = format!("/v2/{}/nat_gateways/{}", self.project_id, urlencoding::encode(nat_gateway_id));
        let envelope: NatGatewayEnvelope = self.nat.get(&path).await?;
        Ok(envelope.nat_gateway)
    }

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), CloudError> {
        let path = format!("/v2/{}/nat_gateways/{}", self.project_id, urlencoding::encode(nat_gateway_id));
        self.nat.delete(&path).await
    }

    async fn create_snat_rule(&self, request: &CreateSnatRuleRequest) -> Result<SnatRule, CloudError> {
        let path = format!("/v2/{}/snat_rules", self.project_id);
        let envelope: SnatRuleEnvelope = self.nat.post(&path, &json!({ "snat_rule": request })).await?;
        Ok(envelope.snat_rule)
    }

    async fn list_snat_rules(&self, nat_gateway_id: &str) -> Result<Vec<SnatRule>, CloudError> {
        let path = format!(
            "/v2/{}/snat_rules?nat_gateway_id={}",
            self.project_id,
            urlencoding::encode(nat_gateway_id)
        );
        let list: SnatRuleList = self.nat.get(&path).await?;
        Ok(list.snat_rules)
    }

    async fn delete_snat_rule(&self, nat_gateway_id: &str, rule_id: &str) -> Result<(), CloudError> {
        let path = format!(
            "/v2/{}/nat_gateways/{}/snat_rules/{}",
            self.project_id,
            urlencoding::encode(nat_gateway_id),
            urlencoding::encode(rule_id)
        );
        self.nat.delete(&path).await
    }

    async fn list_nameservers(&self, region: &str) -> Result<Vec<Nameserver>, CloudError> {
        let path = format!("/v2/nameservers?server_region={}", urlencoding::encode(region));
        let list: NameserverList = self.dns.get(&path).await?;
        Ok(list.nameservers)
    }

    async fn list_endpoint_services(&self) -> Result<Vec<EndpointService>, CloudError> {
        let path = format!("/v1/{}/vpc-endpoint-services", self.project_id);
        let list: EndpointServiceList = self.vpcep.get(&path).await?;
        Ok(list.endpoint_services)
    }

    async fn delete_endpoint_service(&self, service_id: &str) -> Result<(), CloudError> {
        let path = format!(
            "/v1/{}/vpc-endpoint-services/{}",
            self.project_id,
            urlencoding::encode(service_id)
        );
        self.vpcep.delete(&path).await
    }
}
