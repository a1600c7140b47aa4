//! Unit tests for ordered teardown

#[cfg(test)]
mod tests {
    use crate::reconciler::Outcome;
    use crate::reconciler::requests::{subnet_request, vpc_request};
    use crate::test_utils::*;
    use cce_client::{
        CloudClientTrait, ClusterState, EndpointService, Node, NodeMetadata, NodePoolState, NodeState, NodeStatus,
        ProviderError,
    };
    use crds::ClusterConfig;
    use std::time::Duration;

    const MAX_PASSES: usize = 30;

    /// Run teardown passes against the stored record until it reports done
    async fn run_to_completion(h: &TestHarness, name: &str) -> usize {
        for pass in 1..=MAX_PASSES {
            let config = h.stored(name);
            match h.reconciler.teardown(&h.cloud, &config).await.expect("teardown pass") {
                Outcome::Done => return pass,
                Outcome::Requeue(_) => {}
            }
        }
        panic!("teardown did not finish in {} passes: {:?}", MAX_PASSES, h.cloud.calls());
    }

    fn delete_calls(h: &TestHarness) -> Vec<String> {
        h.cloud.calls().into_iter().filter(|c| c.starts_with("delete_")).collect()
    }

    fn node(name: &str, state: NodeState) -> Node {
        Node {
            metadata: Some(NodeMetadata {
                name: Some(name.to_string()),
                uid: Some(format!("{}-uid", name)),
            }),
            status: Some(NodeStatus { phase: Some(state) }),
        }
    }

    /// Record with a fully provisioned network and a running cluster-1
    async fn provisioned(h: &TestHarness) -> ClusterConfig {
        let mut config = create_test_cluster_config("alpha");
        config.spec.public_access = true;
        config.spec.public_ip.create_eip = true;
        config.spec.public_ip.eip.bandwidth.size = 5;
        config.spec.nat_gateway.enabled = true;
        config.spec.nat_gateway.snat_rule_eip.bandwidth.size = 10;
        let config = h.insert(config);
        let mut config = h
            .reconciler
            .provision_network(&h.cloud, &config)
            .await
            .expect("provision");

        config.status_mut().cluster_id = "cluster-1".to_string();
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", &config.spec.name, ClusterState::Available));
        h.cloud.set_node_pools(
            "cluster-1",
            vec![create_test_cloud_node_pool("np-a", &config.spec.node_pools[0], NodePoolState::Normal)],
        );
        h.cloud.reset_calls();
        h.insert(config)
    }

    #[tokio::test]
    async fn test_deletes_in_dependency_order() {
        let h = TestHarness::new();
        let config = provisioned(&h).await;
        let status = config.observed().clone();
        h.cloud.add_endpoint_service(EndpointService {
            id: "eps-1".to_string(),
            vpc_id: status.created_vpc_id.clone(),
            service_name: "cce-endpoint".to_string(),
            status: None,
        });
        h.cloud.add_endpoint_service(EndpointService {
            id: "eps-other".to_string(),
            vpc_id: "vpc-someone-else".to_string(),
            service_name: "unrelated".to_string(),
            status: None,
        });

        run_to_completion(&h, "alpha").await;

        assert_eq!(
            delete_calls(&h),
            vec![
                "delete_node_pool:np-a".to_string(),
                "delete_cluster:cluster-1".to_string(),
                format!("delete_snat_rule:{}", status.created_snat_rule_id),
                format!("delete_nat_gateway:{}", status.created_nat_gateway_id),
                format!("delete_public_ip:{}", status.created_cluster_eip_id),
                format!("delete_public_ip:{}", status.created_snat_rule_eip_id),
                format!("delete_subnet:{}", status.created_subnet_id),
                "delete_endpoint_service:eps-1".to_string(),
                format!("delete_vpc:{}", status.created_vpc_id),
            ]
        );

        let stored = h.stored("alpha");
        let after = stored.observed();
        assert!(after.cluster_id.is_empty());
        assert!(after.cluster_external_ip.is_empty());
        assert!(after.created_vpc_id.is_empty());
        assert!(after.created_subnet_id.is_empty());
        assert!(after.created_nat_gateway_id.is_empty());
        assert!(after.created_snat_rule_id.is_empty());
        assert!(after.created_cluster_eip_id.is_empty());
        assert!(after.created_snat_rule_eip_id.is_empty());
        assert!(after.node_pools.is_empty());
        assert!(h.cloud.network_resource_exists("eps-other"));
    }

    #[tokio::test]
    async fn test_each_pass_performs_one_step() {
        let h = TestHarness::new();
        provisioned(&h).await;

        let outcome = h
            .reconciler
            .teardown(&h.cloud, &h.stored("alpha"))
            .await
            .expect("drain");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(10)));
        assert_eq!(delete_calls(&h), vec!["delete_node_pool:np-a".to_string()]);

        let outcome = h
            .reconciler
            .teardown(&h.cloud, &h.stored("alpha"))
            .await
            .expect("cluster");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(20)));
        assert_eq!(h.cloud.call_count("delete_cluster"), 1);

        let outcome = h
            .reconciler
            .teardown(&h.cloud, &h.stored("alpha"))
            .await
            .expect("network");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(5)));
        assert_eq!(h.cloud.call_count("delete_snat_rule"), 1);
        assert_eq!(h.cloud.call_count("delete_nat_gateway"), 0);
    }

    #[tokio::test]
    async fn test_user_supplied_network_is_kept() {
        let h = TestHarness::new();
        let vpc = h.cloud.create_vpc(&vpc_request()).await.expect("vpc");
        let dns = ["100.125.1.250".to_string(), "100.125.129.250".to_string()];
        let subnet = h.cloud.create_subnet(&subnet_request(&vpc.id, &dns)).await.expect("subnet");

        let mut config = create_test_cluster_config("alpha");
        config.spec.host_network.vpc_id = vpc.id.clone();
        config.spec.host_network.subnet_id = subnet.id.clone();
        let config = h.insert(config);
        h.reconciler
            .provision_network(&h.cloud, &config)
            .await
            .expect("provision");
        h.cloud.reset_calls();

        let passes = run_to_completion(&h, "alpha").await;
        assert_eq!(passes, 1);
        assert!(delete_calls(&h).is_empty());
        assert!(h.cloud.network_resource_exists(&vpc.id));
        assert!(h.cloud.network_resource_exists(&subnet.id));
    }

    #[tokio::test]
    async fn test_created_subnet_in_user_vpc_is_removed() {
        let h = TestHarness::new();
        let vpc = h.cloud.create_vpc(&vpc_request()).await.expect("vpc");
        let mut config = create_test_cluster_config("alpha");
        config.spec.host_network.vpc_id = vpc.id.clone();
        let config = h.insert(config);
        let config = h
            .reconciler
            .provision_network(&h.cloud, &config)
            .await
            .expect("provision");
        let subnet_id = config.observed().created_subnet_id.clone();
        h.cloud.reset_calls();

        run_to_completion(&h, "alpha").await;
        assert_eq!(delete_calls(&h), vec![format!("delete_subnet:{}", subnet_id)]);
        assert!(h.cloud.network_resource_exists(&vpc.id));
    }

    #[tokio::test]
    async fn test_drain_waits_for_transitioning_nodes() {
        let h = TestHarness::new();
        provisioned(&h).await;
        h.cloud.set_nodes(
            "cluster-1",
            vec![node("node-1", NodeState::Active), node("node-2", NodeState::Installing)],
        );

        let outcome = h
            .reconciler
            .teardown(&h.cloud, &h.stored("alpha"))
            .await
            .expect("drain");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(10)));
        assert!(delete_calls(&h).is_empty());

        h.cloud
            .set_nodes("cluster-1", vec![node("node-1", NodeState::Active), node("node-2", NodeState::Active)]);
        h.reconciler
            .teardown(&h.cloud, &h.stored("alpha"))
            .await
            .expect("drain");
        assert_eq!(delete_calls(&h), vec!["delete_node_pool:np-a".to_string()]);
    }

    #[tokio::test]
    async fn test_drain_skips_pools_already_deleting() {
        let h = TestHarness::new();
        let config = provisioned(&h).await;
        let pool = &config.spec.node_pools[0];
        h.cloud.set_node_pools(
            "cluster-1",
            vec![
                create_test_cloud_node_pool("np-a", pool, NodePoolState::Deleting),
                create_test_cloud_node_pool("np-b", pool, NodePoolState::Normal),
            ],
        );

        let outcome = h.reconciler.teardown(&h.cloud, &config).await.expect("drain");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(10)));
        assert_eq!(delete_calls(&h), vec!["delete_node_pool:np-b".to_string()]);
    }

    #[tokio::test]
    async fn test_transitioning_cluster_is_not_deleted() {
        let h = TestHarness::new();
        let config = provisioned(&h).await;
        h.cloud.set_node_pools("cluster-1", Vec::new());
        h.cloud.set_cluster_state("cluster-1", ClusterState::Creating);

        let outcome = h.reconciler.teardown(&h.cloud, &config).await.expect("wait");
        assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(20)));
        assert_eq!(h.cloud.call_count("delete_cluster"), 0);
        assert_eq!(h.stored("alpha").observed().cluster_id, "cluster-1");
    }

    #[tokio::test]
    async fn test_spec_cluster_id_is_used_and_cleared() {
        let h = TestHarness::new();
        let mut config = create_test_cluster_config("alpha");
        config.spec.cluster_id = "cluster-7".to_string();
        h.insert(config);
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-7", "alpha-cluster", ClusterState::Available));

        run_to_completion(&h, "alpha").await;
        assert_eq!(delete_calls(&h), vec!["delete_cluster:cluster-7".to_string()]);
        assert!(h.stored("alpha").spec.cluster_id.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_stops_the_pass() {
        let h = TestHarness::new();
        let config = provisioned(&h).await;
        h.cloud.set_node_pools("cluster-1", Vec::new());
        h.cloud
            .fail_next("delete_cluster", ProviderError::new(500, "CCE.01500001", "backend unavailable"));

        let err = h.reconciler.teardown(&h.cloud, &config).await.expect_err("delete failure");
        assert!(err.failure_message().contains("backend unavailable"));
        assert!(h.cloud.cluster("cluster-1").is_some());
        assert_eq!(h.cloud.call_count("delete_snat_rule"), 0);
    }
}
