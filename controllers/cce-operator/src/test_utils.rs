//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and a harness that
//! wires a [`Reconciler`] to an in-memory store and a shared mock cloud.

use crate::driver::{ACCESS_KEY, DriverCache, DriverFactory, PROJECT_ID_KEY, SECRET_KEY};
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::{Outcome, Reconciler};
use crate::settings::Settings;
use crate::store::memory::InMemoryStore;
use cce_client as cloud;
use cce_client::{ClientAuth, CloudClientTrait, CloudError, MockCloudClient};
use crds::*;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use prometheus::Registry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_NAMESPACE: &str = "default";
pub const TEST_REGION: &str = "ap-southeast-1";
pub const CREDENTIAL_SECRET: &str = "cce-credentials";

/// Driver factory handing out clones of one shared mock
#[derive(Debug, Clone)]
pub struct MockDriverFactory {
    pub client: MockCloudClient,
}

impl DriverFactory for MockDriverFactory {
    fn build(&self, auth: ClientAuth) -> Result<Arc<dyn CloudClientTrait>, CloudError> {
        assert_eq!(auth.region, self.client.region());
        Ok(Arc::new(self.client.clone()))
    }
}

/// Helper to create a fully specified test node pool
pub fn create_test_node_pool(name: &str) -> NodePool {
    NodePool {
        name: name.to_string(),
        node_template: NodeTemplate {
            flavor: "c7.large.2".to_string(),
            available_zone: "ap-southeast-1a".to_string(),
            operating_system: "EulerOS 2.9".to_string(),
            ssh_key: "kp-test".to_string(),
            root_volume: Volume::new(50, "SSD"),
            data_volumes: vec![Volume::new(100, "SSD")],
            ..Default::default()
        },
        initial_node_count: 1,
        ..Default::default()
    }
}

/// Helper to create a valid non-imported ClusterConfig with one node pool
pub fn create_test_cluster_config(name: &str) -> ClusterConfig {
    ClusterConfig {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: ClusterConfigSpec {
            credential_secret: CREDENTIAL_SECRET.to_string(),
            region_id: TEST_REGION.to_string(),
            name: format!("{}-cluster", name),
            cluster_type: "VirtualMachine".to_string(),
            flavor: "cce.s1.small".to_string(),
            version: "v1.25".to_string(),
            kubernetes_svc_ip_range: "10.247.0.0/16".to_string(),
            node_pools: vec![create_test_node_pool("pool-a")],
            ..Default::default()
        },
        status: None,
    }
}

/// Helper to create an imported ClusterConfig referencing `cluster_id`
pub fn create_test_imported_config(name: &str, cluster_id: &str) -> ClusterConfig {
    let mut config = create_test_cluster_config(name);
    config.spec.imported = true;
    config.spec.cluster_id = cluster_id.to_string();
    config.spec.node_pools.clear();
    config
}

/// Helper to create the credential secret the test configs reference
pub fn create_test_credential_secret() -> Secret {
    let data = [(ACCESS_KEY, "AK"), (SECRET_KEY, "SK"), (PROJECT_ID_KEY, "project-1")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
        .collect::<BTreeMap<_, _>>();
    Secret {
        metadata: ObjectMeta {
            name: Some(CREDENTIAL_SECRET.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Provider-side cluster as the container engine reports it
pub fn create_test_cloud_cluster(id: &str, name: &str, state: cloud::ClusterState) -> cloud::Cluster {
    cloud::Cluster {
        kind: "Cluster".to_string(),
        api_version: "v3".to_string(),
        metadata: Some(cloud::ClusterMetadata {
            name: name.to_string(),
            uid: Some(id.to_string()),
            ..Default::default()
        }),
        spec: Some(cloud::ClusterSpec {
            flavor: "cce.s1.small".to_string(),
            version: Some("v1.25".to_string()),
            description: Some(String::new()),
            host_network: Some(cloud::HostNetwork {
                vpc: "vpc-existing".to_string(),
                subnet: "subnet-existing".to_string(),
                security_group: None,
            }),
            container_network: Some(cloud::ContainerNetwork {
                mode: "eni".to_string(),
                cidr: Some("10.101.0.0/16".to_string()),
            }),
            az: Some("ap-southeast-1a".to_string()),
            ..Default::default()
        }),
        status: Some(cloud::ClusterStatus {
            phase: Some(state),
            ..Default::default()
        }),
    }
}

/// Provider-side node pool built from a spec pool
pub fn create_test_cloud_node_pool(id: &str, pool: &NodePool, state: cloud::NodePoolState) -> cloud::NodePool {
    let mut created = crate::reconciler::requests::create_node_pool_request(pool);
    if let Some(metadata) = created.metadata.as_mut() {
        metadata.uid = Some(id.to_string());
    }
    created.status = Some(cloud::NodePoolStatus {
        current_node: Some(pool.initial_node_count),
        phase: Some(state),
    });
    created
}

/// Default requeue delays, with the in-process sleeps zeroed
pub fn test_settings() -> Settings {
    Settings {
        creation_poll: Duration::from_secs(30),
        busy_wait: Duration::from_secs(30),
        converge_requeue: Duration::from_secs(10),
        drain_requeue: Duration::from_secs(10),
        cluster_delete_requeue: Duration::from_secs(20),
        network_delete_requeue: Duration::from_secs(5),
        duplicate_failure_throttle: Duration::ZERO,
        settle_delay: Duration::ZERO,
        ..Settings::default()
    }
}

/// Reconciler wired to an in-memory store and a shared mock cloud
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub store: InMemoryStore,
    pub cloud: MockCloudClient,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        store.insert_secret(TEST_NAMESPACE, create_test_credential_secret());
        let cloud = MockCloudClient::new(TEST_REGION);
        let factory = MockDriverFactory { client: cloud.clone() };
        let metrics = Metrics::new(Registry::new()).expect("metrics registry");
        let reconciler = Reconciler::new(
            Arc::new(store.clone()),
            DriverCache::new(Arc::new(factory)),
            test_settings(),
            metrics,
        );
        Self { reconciler, store, cloud }
    }

    pub fn insert(&self, config: ClusterConfig) -> ClusterConfig {
        self.store.insert(config)
    }

    /// Stored copy of a record in the test namespace
    pub fn stored(&self, name: &str) -> ClusterConfig {
        self.store
            .stored(TEST_NAMESPACE, name)
            .unwrap_or_else(|| panic!("ClusterConfig {} not stored", name))
    }

    /// Reconcile the stored copy of a record, as the watcher would
    pub async fn reconcile(&self, name: &str) -> Result<Outcome, ControllerError> {
        let config = self.stored(name);
        self.reconciler.reconcile_cluster_config(&config).await
    }
}
