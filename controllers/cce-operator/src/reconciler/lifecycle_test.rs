//! Unit tests for the cluster lifecycle handlers

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::lifecycle::{endpoint_secret, select_cert_endpoint};
    use crate::reconciler::{Outcome, cluster_upgradeable};
    use crate::test_utils::*;
    use cce_client as cloud;
    use cce_client::{ClusterState, NodePoolState, UpgradeTask, UpgradeTaskMetadata, UpgradeTaskState, UpgradeTaskStatus};
    use crds::{ClusterConfig, ClusterPhase};
    use kube::ResourceExt;
    use std::time::Duration;

    /// Store an active record whose cluster and single pool already exist upstream
    fn active_cluster(h: &TestHarness, name: &str) -> ClusterConfig {
        let mut config = create_test_cluster_config(name);
        config.spec.node_pools[0].id = "np-1".to_string();
        let status = config.status_mut();
        status.phase = ClusterPhase::Active;
        status.cluster_id = "cluster-1".to_string();

        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", &config.spec.name, ClusterState::Available));
        h.cloud.set_node_pools(
            "cluster-1",
            vec![create_test_cloud_node_pool("np-1", &config.spec.node_pools[0], NodePoolState::Normal)],
        );
        h.insert(config)
    }

    fn task(id: &str, state: UpgradeTaskState) -> UpgradeTask {
        UpgradeTask {
            metadata: Some(UpgradeTaskMetadata { uid: Some(id.to_string()) }),
            status: Some(UpgradeTaskStatus { phase: Some(state) }),
        }
    }

    #[test]
    fn test_cluster_upgradeable() {
        assert!(!cluster_upgradeable("v1.23", "v1.23").expect("equal"));
        assert!(cluster_upgradeable("v1.23", "v1.25").expect("newer"));
        assert!(!cluster_upgradeable("v1.23.1", "v1.23.2").expect("patch only"));
        assert!(cluster_upgradeable("v1.23.5-r0", "v1.25").expect("suffix"));

        let err = cluster_upgradeable("v1.25", "v1.23").expect_err("downgrade");
        assert!(err.to_string().contains("unsupported to downgrade"), "got: {}", err);
        assert!(matches!(err, ControllerError::Validation(_)));

        assert!(cluster_upgradeable("v1", "v1.25").is_err());
        assert!(cluster_upgradeable("v1.x", "v1.25").is_err());
    }

    #[test]
    fn test_cert_endpoint_selection() {
        let context = |name: &str, server: &str| cloud::NamedCluster {
            name: Some(name.to_string()),
            cluster: Some(cloud::ClusterCertEndpoint {
                server: Some(server.to_string()),
                certificate_authority_data: Some("Y2E=".to_string()),
            }),
        };
        let cert = cloud::ClusterCert {
            clusters: vec![
                context("internalCluster", "https://10.0.0.1:5443"),
                context("externalClusterTLSVerify", "https://203.0.113.9:5443"),
                context("internalCluster", "https://10.0.0.2:5443"),
            ],
        };

        let public = select_cert_endpoint(&cert, true).and_then(|c| c.server.as_deref());
        assert_eq!(public, Some("https://203.0.113.9:5443"));
        let private = select_cert_endpoint(&cert, false).and_then(|c| c.server.as_deref());
        assert_eq!(private, Some("https://10.0.0.2:5443"));

        let external_only = cloud::ClusterCert {
            clusters: vec![context("externalClusterTLSVerify", "https://203.0.113.9:5443")],
        };
        assert!(select_cert_endpoint(&external_only, false).is_none());
    }

    #[test]
    fn test_endpoint_secret_is_owned_by_record() {
        let mut config = create_test_cluster_config("alpha");
        config.metadata.uid = Some("uid-alpha".to_string());
        let secret = endpoint_secret(&config, "https://10.0.0.1:5443".to_string(), "Y2E=".to_string());

        assert_eq!(secret.name_any(), "alpha");
        assert_eq!(secret.namespace().as_deref(), Some(TEST_NAMESPACE));
        let owner = &secret.owner_references()[0];
        assert_eq!(owner.kind, "ClusterConfig");
        assert_eq!(owner.api_version, "cce.dcops.microscaler.io/v1alpha1");
        assert_eq!(owner.uid, "uid-alpha");
        let data = secret.data.expect("data");
        assert_eq!(data["endpoint"].0, b"https://10.0.0.1:5443".to_vec());
        assert_eq!(data["ca"].0, b"Y2E=".to_vec());
    }

    #[tokio::test]
    async fn test_create_records_cluster_id() {
        let h = TestHarness::new();
        let config = h.insert(create_test_cluster_config("alpha"));

        let outcome = h.reconciler.create(&config).await.expect("create");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(30)));

        let stored = h.stored("alpha");
        assert_eq!(stored.phase(), ClusterPhase::Creating);
        let cluster_id = &stored.observed().cluster_id;
        assert!(h.cloud.cluster(cluster_id).is_some());
        assert_eq!(h.cloud.call_count("create_cluster"), 1);
        assert_eq!(h.reconciler.metrics().provider_calls("create_cluster"), 1);

        // The cluster was built on the provisioned network
        let created = h.cloud.cluster(cluster_id).and_then(|c| c.spec).expect("spec");
        let host = created.host_network.expect("host network");
        assert_eq!(host.vpc, stored.observed().host_network.vpc_id);
        assert_eq!(host.subnet, stored.observed().host_network.subnet_id);
    }

    #[tokio::test]
    async fn test_create_skips_existing_recorded_cluster() {
        let h = TestHarness::new();
        let mut config = create_test_cluster_config("alpha");
        config.status_mut().cluster_id = "cluster-1".to_string();
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", &config.spec.name, ClusterState::Creating));
        let config = h.insert(config);

        let outcome = h.reconciler.create(&config).await.expect("create");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(30)));
        assert_eq!(h.cloud.call_count("create_cluster"), 0);
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Creating);
        assert_eq!(h.stored("alpha").observed().cluster_id, "cluster-1");
    }

    #[tokio::test]
    async fn test_create_replaces_vanished_recorded_cluster() {
        let h = TestHarness::new();
        let mut config = create_test_cluster_config("alpha");
        config.status_mut().cluster_id = "cluster-gone".to_string();
        let config = h.insert(config);

        h.reconciler.create(&config).await.expect("create");
        assert_eq!(h.cloud.call_count("create_cluster"), 1);
        assert_ne!(h.stored("alpha").observed().cluster_id, "cluster-gone");
    }

    #[tokio::test]
    async fn test_create_imported_moves_to_importing() {
        let h = TestHarness::new();
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", "alpha-cluster", ClusterState::Available));
        let config = h.insert(create_test_imported_config("alpha", "cluster-1"));

        let outcome = h.reconciler.create(&config).await.expect("create");
        assert_eq!(outcome, Outcome::Requeue(Duration::ZERO));
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Importing);
        assert_eq!(h.cloud.call_count("create_cluster"), 0);
        assert_eq!(h.cloud.call_count("create_vpc"), 0);
    }

    #[tokio::test]
    async fn test_wait_for_creation_unavailable_is_fatal() {
        let h = TestHarness::new();
        let mut cluster = create_test_cloud_cluster("cluster-1", "alpha-cluster", ClusterState::Unavailable);
        if let Some(status) = cluster.status.as_mut() {
            status.reason = Some("insufficient ECS quota".to_string());
        }
        h.cloud.add_cluster(cluster);
        let mut config = create_test_cluster_config("alpha");
        config.status_mut().phase = ClusterPhase::Creating;
        config.status_mut().cluster_id = "cluster-1".to_string();
        let config = h.insert(config);

        let err = h
            .reconciler
            .wait_for_creation_complete(&config)
            .await
            .expect_err("unavailable");
        assert!(matches!(err, ControllerError::Operation(_)));
        assert!(err.to_string().contains("insufficient ECS quota"), "got: {}", err);
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Creating);
    }

    #[tokio::test]
    async fn test_wait_for_creation_keeps_polling() {
        let h = TestHarness::new();
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", "alpha-cluster", ClusterState::Creating));
        let mut config = create_test_cluster_config("alpha");
        config.status_mut().phase = ClusterPhase::Creating;
        config.status_mut().cluster_id = "cluster-1".to_string();
        let config = h.insert(config);

        let outcome = h.reconciler.wait_for_creation_complete(&config).await.expect("poll");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(30)));
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Creating);
        assert!(h.store.secret(TEST_NAMESPACE, "alpha").is_none());
    }

    #[tokio::test]
    async fn test_wait_for_creation_available_creates_secret() {
        let h = TestHarness::new();
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", "alpha-cluster", ClusterState::Available));
        let mut config = create_test_cluster_config("alpha");
        config.status_mut().phase = ClusterPhase::Creating;
        config.status_mut().cluster_id = "cluster-1".to_string();
        let config = h.insert(config);

        let outcome = h.reconciler.wait_for_creation_complete(&config).await.expect("poll");
        assert_eq!(outcome, Outcome::Requeue(Duration::ZERO));
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Updating);

        let secret = h.store.secret(TEST_NAMESPACE, "alpha").expect("endpoint secret");
        let data = secret.data.clone().expect("data");
        assert_eq!(data["endpoint"].0, b"https://192.168.0.10:5443".to_vec());
        assert_eq!(data["ca"].0, b"bW9jay1jYQ==".to_vec());
        assert_eq!(secret.owner_references()[0].uid, "uid-alpha");
    }

    #[tokio::test]
    async fn test_existing_secret_is_left_alone() {
        let h = TestHarness::new();
        let config = h.insert(create_test_cluster_config("alpha"));
        h.store.insert_secret(
            TEST_NAMESPACE,
            endpoint_secret(&config, "https://old:5443".to_string(), "b2xk".to_string()),
        );

        h.reconciler.create_ca_secret(&h.cloud, &config).await.expect("secret");
        assert_eq!(h.cloud.call_count("create_cluster_cert"), 0);
        let data = h.store.secret(TEST_NAMESPACE, "alpha").and_then(|s| s.data).expect("data");
        assert_eq!(data["endpoint"].0, b"https://old:5443".to_vec());
    }

    #[tokio::test]
    async fn test_import_copies_observed_state() {
        let h = TestHarness::new();
        let mut cluster = create_test_cloud_cluster("cluster-1", "alpha-cluster", ClusterState::Available);
        if let Some(status) = cluster.status.as_mut() {
            status.endpoints = vec![
                cloud::ClusterEndpoint {
                    url: Some("https://192.168.0.10:5443".to_string()),
                    endpoint_type: Some("Internal".to_string()),
                },
                cloud::ClusterEndpoint {
                    url: Some("https://203.0.113.9:5443".to_string()),
                    endpoint_type: Some("External".to_string()),
                },
            ];
        }
        h.cloud.add_cluster(cluster);
        let pool = create_test_node_pool("pool-a");
        h.cloud.set_node_pools(
            "cluster-1",
            vec![create_test_cloud_node_pool("np-1", &pool, NodePoolState::Normal)],
        );
        h.insert(create_test_imported_config("alpha", "cluster-1"));

        assert_eq!(h.reconcile("alpha").await.expect("validate"), Outcome::Requeue(Duration::ZERO));
        assert_eq!(h.reconcile("alpha").await.expect("import"), Outcome::Done);

        let stored = h.stored("alpha");
        let status = stored.observed();
        assert_eq!(stored.phase(), ClusterPhase::Active);
        assert_eq!(status.cluster_id, "cluster-1");
        assert_eq!(status.cluster_external_ip, "203.0.113.9");
        assert_eq!(status.host_network.vpc_id, "vpc-existing");
        assert_eq!(status.available_zone, "ap-southeast-1a");
        assert_eq!(status.endpoints.len(), 2);
        assert_eq!(status.node_pools.len(), 1);
        assert!(status.created_vpc_id.is_empty());
        assert!(h.store.secret(TEST_NAMESPACE, "alpha").is_some());

        // The next update pass adopts the observed pools into the spec
        assert_eq!(h.reconcile("alpha").await.expect("update"), Outcome::Done);
        let stored = h.stored("alpha");
        assert_eq!(stored.spec.node_pools.len(), 1);
        assert_eq!(stored.spec.node_pools[0].id, "np-1");
        assert_eq!(h.cloud.call_count("create_node_pool"), 0);
        assert_eq!(h.cloud.call_count("delete_node_pool"), 0);
    }

    #[tokio::test]
    async fn test_update_settles_when_converged() {
        let h = TestHarness::new();
        let config = active_cluster(&h, "alpha");

        let outcome = h.reconciler.check_and_update(&config).await.expect("update");
        assert_eq!(outcome, Outcome::Done);
        let stored = h.stored("alpha");
        assert_eq!(stored.phase(), ClusterPhase::Active);
        assert_eq!(stored.observed().node_pools.len(), 1);
        assert_eq!(stored.observed().available_zone, "ap-southeast-1a");
        assert_eq!(h.cloud.call_count("update_cluster"), 0);
        assert_eq!(h.cloud.call_count("upgrade_cluster"), 0);

        // The status mirror is not rewritten when nothing changed
        let writes = h.store.status_writes();
        h.reconciler.check_and_update(&stored).await.expect("update");
        assert_eq!(h.store.status_writes(), writes);
    }

    #[tokio::test]
    async fn test_update_waits_for_busy_cluster() {
        let h = TestHarness::new();
        let config = active_cluster(&h, "alpha");
        h.cloud.set_cluster_state("cluster-1", ClusterState::Upgrading);

        let outcome = h.reconciler.check_and_update(&config).await.expect("update");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(30)));
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Updating);
        assert_eq!(h.cloud.call_count("list_node_pools"), 0);
    }

    #[tokio::test]
    async fn test_update_waits_for_busy_node_pool() {
        let h = TestHarness::new();
        let config = active_cluster(&h, "alpha");
        h.cloud.set_node_pool_state("cluster-1", "np-1", NodePoolState::Synchronizing);

        let outcome = h.reconciler.check_and_update(&config).await.expect("update");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(30)));
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Updating);
        assert_eq!(h.cloud.call_count("update_node_pool"), 0);
    }

    #[tokio::test]
    async fn test_update_invalid_spec_forces_updating() {
        let h = TestHarness::new();
        let mut config = active_cluster(&h, "alpha");
        config.spec.version = "latest".to_string();
        let config = h.insert(config);

        let err = h.reconciler.check_and_update(&config).await.expect_err("invalid");
        assert!(err.to_string().contains("improper version format"));
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Updating);
        assert_eq!(h.cloud.call_count("show_cluster"), 0);
    }

    #[tokio::test]
    async fn test_metadata_change_updates_cluster() {
        let h = TestHarness::new();
        let mut config = create_test_cluster_config("alpha");
        config.spec.description = "team cluster".to_string();
        config.spec.node_pools[0].id = "np-1".to_string();
        config.status_mut().phase = ClusterPhase::Active;
        config.status_mut().cluster_id = "cluster-1".to_string();
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", &config.spec.name, ClusterState::Available));
        h.cloud.set_node_pools(
            "cluster-1",
            vec![create_test_cloud_node_pool("np-1", &config.spec.node_pools[0], NodePoolState::Normal)],
        );
        let config = h.insert(config);

        let outcome = h.reconciler.check_and_update(&config).await.expect("update");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(10)));
        assert_eq!(h.cloud.call_count("update_cluster"), 1);
        assert_eq!(h.stored("alpha").phase(), ClusterPhase::Updating);

        let description = h.cloud.cluster("cluster-1").and_then(|c| c.spec).and_then(|s| s.description);
        assert_eq!(description.as_deref(), Some("team cluster"));

        // Converged on the next pass
        assert_eq!(h.reconciler.check_and_update(&h.stored("alpha")).await.expect("update"), Outcome::Done);
        assert_eq!(h.cloud.call_count("update_cluster"), 1);
    }

    #[tokio::test]
    async fn test_upgrade_flow() {
        let h = TestHarness::new();
        active_cluster(&h, "alpha");
        let mut config = h.stored("alpha");
        config.spec.version = "v1.27".to_string();
        let config = h.insert(config);

        let outcome = h.reconciler.check_and_update(&config).await.expect("upgrade");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(10)));
        let stored = h.stored("alpha");
        let task_id = stored.observed().upgrade_cluster_task_id.clone();
        assert!(task_id.starts_with("task-"));
        assert_eq!(stored.phase(), ClusterPhase::Updating);
        assert_eq!(h.cloud.call_count("upgrade_cluster"), 1);

        // Task still running
        let outcome = h.reconciler.check_and_update(&stored).await.expect("poll");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(30)));
        assert!(h.cloud.calls().contains(&format!("show_upgrade_task:cluster-1/{}", task_id)));

        h.cloud.add_upgrade_task(&task_id, task(&task_id, UpgradeTaskState::Success));
        let outcome = h.reconciler.check_and_update(&h.stored("alpha")).await.expect("done");
        assert_eq!(outcome, Outcome::Done);
        let stored = h.stored("alpha");
        assert!(stored.observed().upgrade_cluster_task_id.is_empty());
        assert_eq!(stored.phase(), ClusterPhase::Active);
        assert_eq!(h.cloud.call_count("upgrade_cluster"), 1);
    }

    #[tokio::test]
    async fn test_expired_upgrade_task_is_cleared() {
        let h = TestHarness::new();
        active_cluster(&h, "alpha");
        let mut config = h.stored("alpha");
        config.status_mut().upgrade_cluster_task_id = "task-expired".to_string();
        let config = h.insert(config);

        let outcome = h.reconciler.check_and_update(&config).await.expect("update");
        assert_eq!(outcome, Outcome::Done);
        assert!(h.stored("alpha").observed().upgrade_cluster_task_id.is_empty());
    }

    #[tokio::test]
    async fn test_failed_upgrade_task_surfaces_error() {
        let h = TestHarness::new();
        active_cluster(&h, "alpha");
        h.cloud.add_upgrade_task("task-9", task("task-9", UpgradeTaskState::Failed));
        let mut config = h.stored("alpha");
        config.status_mut().upgrade_cluster_task_id = "task-9".to_string();
        let config = h.insert(config);

        let err = h.reconciler.check_and_update(&config).await.expect_err("failed task");
        assert!(matches!(err, ControllerError::Operation(_)));
        assert!(err.to_string().contains("task-9"));
        assert!(h.stored("alpha").observed().upgrade_cluster_task_id.is_empty());
    }

    #[tokio::test]
    async fn test_downgrade_is_rejected() {
        let h = TestHarness::new();
        active_cluster(&h, "alpha");
        let mut config = h.stored("alpha");
        config.spec.version = "v1.23".to_string();
        let config = h.insert(config);

        let err = h.reconciler.check_and_update(&config).await.expect_err("downgrade");
        assert!(err.to_string().contains("unsupported to downgrade"));
        assert_eq!(h.cloud.call_count("upgrade_cluster"), 0);
    }
}
