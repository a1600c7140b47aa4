//! Networking operations for MockCloudClient
//!
//! Handles VPCs, subnets, elastic IPs, NAT gateways, SNAT rules, DNS
//! nameservers and VPC endpoint services

use super::{MockCloudClient, lock, not_found};
use crate::error::CloudError;
use crate::models::*;

pub async fn create_vpc(client: &MockCloudClient, request: &CreateVpcRequest) -> Result<Vpc, CloudError> {
    client.record("create_vpc", &request.name)?;
    let vpc = Vpc {
        id: client.next_id("vpc"),
        name: request.name.clone(),
        cidr: request.cidr.clone(),
        status: Some("OK".to_string()),
    };
    lock(&client.vpcs).insert(vpc.id.clone(), vpc.clone());
    Ok(vpc)
}

pub async fn show_vpc(client: &MockCloudClient, vpc_id: &str) -> Result<Vpc, CloudError> {
    client.record("show_vpc", vpc_id)?;
    lock(&client.vpcs).get(vpc_id).cloned().ok_or_else(|| not_found("vpc", vpc_id))
}

pub async fn delete_vpc(client: &MockCloudClient, vpc_id: &str) -> Result<(), CloudError> {
    client.record("delete_vpc", vpc_id)?;
    lock(&client.vpcs).remove(vpc_id).map(|_| ()).ok_or_else(|| not_found("vpc", vpc_id))
}

pub async fn create_subnet(client: &MockCloudClient, request: &CreateSubnetRequest) -> Result<Subnet, CloudError> {
    client.record("create_subnet", &request.name)?;
    if !lock(&client.vpcs).contains_key(&request.vpc_id) {
        return Err(not_found("vpc", &request.vpc_id));
    }
    let subnet = Subnet {
        id: client.next_id("subnet"),
        name: request.name.clone(),
        cidr: request.cidr.clone(),
        gateway_ip: request.gateway_ip.clone(),
        vpc_id: request.vpc_id.clone(),
        status: Some("ACTIVE".to_string()),
    };
    lock(&client.subnet_dns).insert(
        subnet.id.clone(),
        (request.primary_dns.clone(), request.secondary_dns.clone()),
    );
    lock(&client.subnets).insert(subnet.id.clone(), subnet.clone());
    Ok(subnet)
}

pub async fn show_subnet(client: &MockCloudClient, subnet_id: &str) -> Result<Subnet, CloudError> {
    client.record("show_subnet", subnet_id)?;
    lock(&client.subnets)
        .get(subnet_id)
        .cloned()
        .ok_or_else(|| not_found("subnet", subnet_id))
}

pub async fn delete_subnet(client: &MockCloudClient, _vpc_id: &str, subnet_id: &str) -> Result<(), CloudError> {
    client.record("delete_subnet", subnet_id)?;
    lock(&client.subnets)
        .remove(subnet_id)
        .map(|_| ())
        .ok_or_else(|| not_found("subnet", subnet_id))
}

pub async fn create_public_ip(client: &MockCloudClient, request: &CreatePublicIpRequest) -> Result<PublicIp, CloudError> {
    client.record("create_public_ip", &request.publicip.alias)?;
    let n = lock(&client.public_ips).len() + 10;
    let ip = PublicIp {
        id: client.next_id("eip"),
        public_ip_address: format!("203.0.113.{}", n),
        alias: Some(request.publicip.alias.clone()),
        status: Some("DOWN".to_string()),
    };
    lock(&client.public_ips).insert(ip.id.clone(), ip.clone());
    Ok(ip)
}

pub async fn show_public_ip(client: &MockCloudClient, public_ip_id: &str) -> Result<PublicIp, CloudError> {
    client.record("show_public_ip", public_ip_id)?;
    lock(&client.public_ips)
        .get(public_ip_id)
        .cloned()
        .ok_or_else(|| not_found("public ip", public_ip_id))
}

pub async fn delete_public_ip(client: &MockCloudClient, public_ip_id: &str) -> Result<(), CloudError> {
    client.record("delete_public_ip", public_ip_id)?;
    lock(&client.public_ips)
        .remove(public_ip_id)
        .map(|_| ())
        .ok_or_else(|| not_found("public ip", public_ip_id))
}

pub async fn create_nat_gateway(client: &MockCloudClient, request: &CreateNatGatewayRequest) -> Result<NatGateway, CloudError> {
    client.record("create_nat_gateway", &request.name)?;
    let gateway = NatGateway {
        id: client.next_id("nat"),
        name: request.name.clone(),
        router_id: request.router_id.clone(),
        internal_network_id: request.internal_network_id.clone(),
        status: Some("ACTIVE".to_string()),
    };
    lock(&client.nat_gateways).insert(gateway.id.clone(), gateway.clone());
    Ok(gateway)
}

pub async fn show_nat_gateway(client: &MockCloudClient, nat_gateway_id: &str) -> Result<NatGateway, CloudError> {
    client.record("show_nat_gateway", nat_gateway_id)?;
    lock(&client.nat_gateways)
        .get(nat_gateway_id)
        .cloned()
        .ok_or_else(|| not_found("nat gateway", nat_gateway_id))
}

pub async fn delete_nat_gateway(client: &MockCloudClient, nat_gateway_id: &str) -> Result<(), CloudError> {
    client.record("delete_nat_gateway", nat_gateway_id)?;
    lock(&client.nat_gateways)
        .remove(nat_gateway_id)
        .map(|_| ())
        .ok_or_else(|| not_found("nat gateway", nat_gateway_id))
}

pub async fn create_snat_rule(client: &MockCloudClient, request: &CreateSnatRuleRequest) -> Result<SnatRule, CloudError> {
    client.record("create_snat_rule", &request.nat_gateway_id)?;
    let rule = SnatRule {
        id: client.next_id("snat"),
        nat_gateway_id: request.nat_gateway_id.clone(),
        floating_ip_id: request.floating_ip_id.clone(),
        network_id: request.network_id.clone(),
        status: Some("ACTIVE".to_string()),
    };
    lock(&client.snat_rules).insert(rule.id.clone(), rule.clone());
    Ok(rule)
}

pub async fn list_snat_rules(client: &MockCloudClient, nat_gateway_id: &str) -> Result<Vec<SnatRule>, CloudError> {
    client.record("list_snat_rules", nat_gateway_id)?;
    Ok(lock(&client.snat_rules)
        .values()
        .filter(|r| r.nat_gateway_id == nat_gateway_id)
        .cloned()
        .collect())
}

pub async fn delete_snat_rule(client: &MockCloudClient, _nat_gateway_id: &str, rule_id: &str) -> Result<(), CloudError> {
    client.record("delete_snat_rule", rule_id)?;
    lock(&client.snat_rules)
        .remove(rule_id)
        .map(|_| ())
        .ok_or_else(|| not_found("snat rule", rule_id))
}

pub async fn list_nameservers(client: &MockCloudClient, region: &str) -> Result<Vec<Nameserver>, CloudError> {
    client.record("list_nameservers", region)?;
    Ok(lock(&client.nameservers).clone())
}

pub async fn list_endpoint_services(client: &MockCloudClient) -> Result<Vec<EndpointService>, CloudError> {
    client.record("list_endpoint_services", "")?;
    Ok(lock(&client.endpoint_services).values().cloned().collect())
}

pub async fn delete_endpoint_service(client: &MockCloudClient, service_id: &str) -> Result<(), CloudError> {
    client.record("delete_endpoint_service", service_id)?;
    lock(&client.endpoint_services)
        .remove(service_id)
        .map(|_| ())
        .ok_or_else(|| not_found("endpoint service", service_id))
}
