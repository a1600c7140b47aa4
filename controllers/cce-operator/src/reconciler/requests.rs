//! Provider request shaping
//!
//! Turns a ClusterConfig into the request bodies the cloud API expects,
//! filling in the defaults the provider needs when the spec leaves a field
//! empty. Everything here is pure; the handlers decide when to send.

use cce_client as cloud;
use crds::{ClusterConfig, Eip, NodePool};
use rand::Rng;

pub const DEFAULT_CONTAINER_NETWORK_MODE: &str = "eni";
pub const DEFAULT_CONTAINER_NETWORK_CIDR: &str = "10.101.0.0/16";
pub const DEFAULT_VPC_CIDR: &str = "10.224.0.0/16";
pub const DEFAULT_SUBNET_CIDR: &str = "10.224.0.0/16";
pub const DEFAULT_SUBNET_GATEWAY: &str = "10.224.0.1";

/// Description attached to every resource the operator creates
pub const MANAGED_DESCRIPTION: &str = "Managed by DCops, do not edit!";

const RESOURCE_NAME_PREFIX: &str = "dcops-managed";
const NAME_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const UPGRADE_STRATEGY: &str = "inPlaceRollingUpdate";
const UPGRADE_STEP: i32 = 20;
const NAT_GATEWAY_SPEC: &str = "1";
const SNAT_SOURCE_TYPE: i32 = 0;

/// Name for a created resource: `dcops-managed-<kind>-<5 random chars>`
pub fn resource_name(kind: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..5)
        .map(|_| NAME_CHARSET[rng.gen_range(0..NAME_CHARSET.len())] as char)
        .collect();
    format!("{RESOURCE_NAME_PREFIX}-{kind}-{suffix}")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn container_network_mode(mode: &str) -> &str {
    match mode {
        "overlay_l2" | "vpc-router" | "eni" => mode,
        _ => DEFAULT_CONTAINER_NETWORK_MODE,
    }
}

/// Create-cluster body
///
/// Network fields come from the status, where the provisioner recorded the
/// resolved VPC, subnet, container network and external IP.
pub fn create_cluster_request(config: &ClusterConfig) -> cloud::Cluster {
    let spec = &config.spec;
    let status = config.observed();

    let category = match spec.category.as_str() {
        "Turbo" => "Turbo",
        _ => "CCE",
    };
    let cluster_type = match spec.cluster_type.as_str() {
        "ARM64" => "ARM64",
        _ => "VirtualMachine",
    };
    let kube_proxy_mode = match spec.kube_proxy_mode.as_str() {
        "ipvs" => "ipvs",
        _ => "iptables",
    };

    let authenticating_proxy = (spec.authentication.mode == "authenticating_proxy").then(|| {
        let proxy = &spec.authentication.authenticating_proxy;
        cloud::AuthenticatingProxy {
            ca: non_empty(&proxy.ca),
            cert: non_empty(&proxy.cert),
            private_key: non_empty(&proxy.private_key),
        }
    });

    let mut extend_param = cloud::ClusterExtendParam {
        cluster_az: non_empty(&spec.extend_param.cluster_az),
        cluster_external_ip: non_empty(&status.cluster_external_ip),
        ..cloud::ClusterExtendParam::default()
    };
    if spec.billing_mode != 0 {
        extend_param.period_type = non_empty(&spec.extend_param.period_type);
        extend_param.period_num = Some(spec.extend_param.period_num);
        extend_param.is_auto_renew = non_empty(&spec.extend_param.is_auto_renew);
        extend_param.is_auto_pay = non_empty(&spec.extend_param.is_auto_pay);
    }

    let eni_network = (!spec.eni_network.subnets.is_empty()).then(|| cloud::EniNetwork {
        subnets: spec
            .eni_network
            .subnets
            .iter()
            .map(|subnet_id| cloud::EniSubnet {
                subnet_id: subnet_id.clone(),
            })
            .collect(),
    });

    cloud::Cluster {
        kind: "cluster".to_string(),
        api_version: "v3".to_string(),
        metadata: Some(cloud::ClusterMetadata {
            name: spec.name.clone(),
            uid: None,
            alias: None,
            labels: spec.labels.clone(),
        }),
        spec: Some(cloud::ClusterSpec {
            category: Some(category.to_string()),
            cluster_type: Some(cluster_type.to_string()),
            flavor: spec.flavor.clone(),
            version: non_empty(&spec.version),
            description: Some(spec.description.clone()),
            ipv6enable: Some(spec.ipv6_enable),
            host_network: Some(cloud::HostNetwork {
                vpc: status.host_network.vpc_id.clone(),
                subnet: status.host_network.subnet_id.clone(),
                security_group: non_empty(&spec.host_network.security_group),
            }),
            container_network: Some(cloud::ContainerNetwork {
                mode: container_network_mode(&status.container_network.mode).to_string(),
                cidr: non_empty(&status.container_network.cidr),
            }),
            eni_network,
            authentication: Some(cloud::Authentication {
                mode: non_empty(&spec.authentication.mode),
                authenticating_proxy,
            }),
            billing_mode: Some(spec.billing_mode),
            kubernetes_svc_ip_range: non_empty(&spec.kubernetes_svc_ip_range),
            cluster_tags: spec
                .tags
                .iter()
                .map(|(key, value)| cloud::ResourceTag {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            kube_proxy_mode: Some(kube_proxy_mode.to_string()),
            az: None,
            extend_param: Some(extend_param),
        }),
        status: None,
    }
}

/// Update-cluster body carrying the mutable metadata
pub fn update_cluster_request(config: &ClusterConfig) -> cloud::UpdateClusterRequest {
    cloud::UpdateClusterRequest {
        metadata: cloud::UpdateClusterMetadata {
            alias: config.spec.name.clone(),
        },
        spec: cloud::UpdateClusterSpec {
            description: config.spec.description.clone(),
            host_network: Some(cloud::UpdateClusterHostNetwork {
                security_group: config.spec.host_network.security_group.clone(),
            }),
        },
    }
}

pub fn upgrade_cluster_request(target_version: &str) -> cloud::UpgradeClusterRequest {
    cloud::UpgradeClusterRequest {
        metadata: cloud::UpgradeRequestMetadata {
            api_version: "v3".to_string(),
            kind: "UpgradeTask".to_string(),
        },
        spec: cloud::UpgradeSpec {
            cluster_upgrade_action: cloud::ClusterUpgradeAction {
                strategy: cloud::UpgradeStrategy {
                    strategy_type: UPGRADE_STRATEGY.to_string(),
                    in_place_rolling_update: Some(cloud::InPlaceRollingUpdate {
                        user_defined_step: UPGRADE_STEP,
                    }),
                },
                target_version: target_version.to_string(),
            },
        },
    }
}

fn volume(volume: &crds::Volume) -> cloud::Volume {
    cloud::Volume {
        size: volume.size,
        volumetype: volume.volume_type.clone(),
    }
}

fn autoscaling(pool: &NodePool) -> cloud::NodePoolAutoscaling {
    let autoscaling = &pool.autoscaling;
    cloud::NodePoolAutoscaling {
        enable: Some(autoscaling.enable),
        min_node_count: Some(autoscaling.min_node_count),
        max_node_count: Some(autoscaling.max_node_count),
        scale_down_cooldown_time: Some(autoscaling.scale_down_cooldown_time),
        priority: Some(autoscaling.priority),
    }
}

/// Create-node-pool body
pub fn create_node_pool_request(pool: &NodePool) -> cloud::NodePool {
    let template = &pool.node_template;

    let pool_type = match pool.pool_type.as_str() {
        "pm" => "pm",
        "ElasticBMS" => "ElasticBMS",
        _ => "vm",
    };
    let runtime = match template.runtime.as_str() {
        "containerd" => "containerd",
        _ => "docker",
    };

    let public_ip = &template.public_ip;
    let eip = (public_ip.count > 0).then(|| {
        let bandwidth = &public_ip.eip.bandwidth;
        cloud::NodeEip {
            iptype: public_ip.eip.ip_type.clone(),
            bandwidth: Some(cloud::NodeBandwidth {
                chargemode: (bandwidth.charge_mode == "traffic").then(|| "traffic".to_string()),
                size: Some(bandwidth.size),
                sharetype: non_empty(&bandwidth.share_type),
            }),
        }
    });

    cloud::NodePool {
        kind: "NodePool".to_string(),
        api_version: "v3".to_string(),
        metadata: Some(cloud::NodePoolMetadata {
            name: pool.name.clone(),
            uid: None,
        }),
        spec: Some(cloud::NodePoolSpec {
            pool_type: Some(pool_type.to_string()),
            node_template: cloud::NodeSpec {
                flavor: template.flavor.clone(),
                az: template.available_zone.clone(),
                os: non_empty(&template.operating_system),
                login: Some(cloud::Login {
                    ssh_key: non_empty(&template.ssh_key),
                }),
                root_volume: Some(volume(&template.root_volume)),
                data_volumes: template.data_volumes.iter().map(volume).collect(),
                public_ip: Some(cloud::NodePublicIp {
                    ids: (!public_ip.ids.is_empty()).then(|| public_ip.ids.clone()),
                    count: (public_ip.count > 0).then_some(public_ip.count),
                    eip,
                }),
                count: Some(1),
                billing_mode: Some(template.billing_mode),
                runtime: Some(cloud::Runtime {
                    name: runtime.to_string(),
                }),
                extend_param: Some(cloud::NodeExtendParam {
                    period_type: non_empty(&template.extend_param.period_type),
                    period_num: Some(template.extend_param.period_num),
                    is_auto_renew: non_empty(&template.extend_param.is_auto_renew),
                }),
            },
            initial_node_count: Some(pool.initial_node_count),
            autoscaling: Some(autoscaling(pool)),
            pod_security_groups: pool
                .pod_security_groups
                .iter()
                .map(|id| cloud::SecurityId { id: id.clone() })
                .collect(),
            custom_security_groups: pool.custom_security_groups.clone(),
        }),
        status: None,
    }
}

/// Update-node-pool body carrying the scaling settings
pub fn node_pool_update(pool: &NodePool) -> cloud::NodePoolUpdate {
    cloud::NodePoolUpdate {
        metadata: cloud::NodePoolMetadata {
            name: pool.name.clone(),
            uid: None,
        },
        spec: cloud::NodePoolSpecUpdate {
            node_template: serde_json::Map::new(),
            initial_node_count: pool.initial_node_count,
            autoscaling: autoscaling(pool),
        },
    }
}

/// Elastic IP body; share type `PER` unless `WHOLE`, charge mode `bandwidth` unless `traffic`
pub fn public_ip_request(eip: &Eip) -> cloud::CreatePublicIpRequest {
    let share_type = match eip.bandwidth.share_type.as_str() {
        "WHOLE" => "WHOLE",
        _ => "PER",
    };
    let charge_mode = match eip.bandwidth.charge_mode.as_str() {
        "traffic" => "traffic",
        _ => "bandwidth",
    };
    cloud::CreatePublicIpRequest {
        publicip: cloud::PublicIpOption {
            ip_type: eip.ip_type.clone(),
            alias: resource_name("eip"),
        },
        bandwidth: cloud::BandwidthOption {
            name: resource_name("bandwidth"),
            size: eip.bandwidth.size,
            share_type: share_type.to_string(),
            charge_mode: charge_mode.to_string(),
        },
    }
}

pub fn vpc_request() -> cloud::CreateVpcRequest {
    cloud::CreateVpcRequest {
        name: resource_name("vpc"),
        cidr: DEFAULT_VPC_CIDR.to_string(),
        description: MANAGED_DESCRIPTION.to_string(),
    }
}

pub fn subnet_request(vpc_id: &str, dns: &[String; 2]) -> cloud::CreateSubnetRequest {
    cloud::CreateSubnetRequest {
        name: resource_name("subnet"),
        cidr: DEFAULT_SUBNET_CIDR.to_string(),
        gateway_ip: DEFAULT_SUBNET_GATEWAY.to_string(),
        vpc_id: vpc_id.to_string(),
        primary_dns: dns[0].clone(),
        secondary_dns: dns[1].clone(),
        description: MANAGED_DESCRIPTION.to_string(),
    }
}

pub fn nat_gateway_request(vpc_id: &str, subnet_id: &str) -> cloud::CreateNatGatewayRequest {
    cloud::CreateNatGatewayRequest {
        name: resource_name("nat"),
        router_id: vpc_id.to_string(),
        internal_network_id: subnet_id.to_string(),
        spec: NAT_GATEWAY_SPEC.to_string(),
        description: MANAGED_DESCRIPTION.to_string(),
    }
}

pub fn snat_rule_request(nat_gateway_id: &str, subnet_id: &str, eip_id: &str) -> cloud::CreateSnatRuleRequest {
    cloud::CreateSnatRuleRequest {
        nat_gateway_id: nat_gateway_id.to_string(),
        network_id: subnet_id.to_string(),
        source_type: SNAT_SOURCE_TYPE,
        floating_ip_id: eip_id.to_string(),
        description: MANAGED_DESCRIPTION.to_string(),
    }
}
