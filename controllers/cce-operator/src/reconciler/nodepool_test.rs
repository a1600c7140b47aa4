//! Unit tests for node pool planning and convergence

#[cfg(test)]
mod tests {
    use crate::reconciler::nodepool::{NodePoolPlan, plan_node_pools};
    use crate::reconciler::upstream::build_upstream_node_pools;
    use crate::test_utils::*;
    use cce_client::{ClusterState, NodePoolState};
    use crds::{ClusterConfig, NodePool};
    use std::collections::HashSet;

    fn with_id(mut pool: NodePool, id: &str) -> NodePool {
        pool.id = id.to_string();
        pool
    }

    fn other_flavor(name: &str) -> NodePool {
        let mut pool = create_test_node_pool(name);
        pool.node_template.flavor = "c7.xlarge.2".to_string();
        pool
    }

    #[test]
    fn test_plan_matched_by_id_is_empty() {
        let desired = vec![with_id(create_test_node_pool("pool-a"), "np-1")];
        let observed = vec![with_id(create_test_node_pool("pool-a"), "np-1")];
        let plan = plan_node_pools(&desired, &observed);
        assert!(plan.is_empty(), "plan: {:?}", plan);
    }

    #[test]
    fn test_plan_updates_scaling_changes() {
        let mut desired = with_id(create_test_node_pool("pool-a"), "np-1");
        desired.initial_node_count = 3;
        let observed = vec![with_id(create_test_node_pool("pool-a"), "np-1")];

        let plan = plan_node_pools(&[desired], &observed);
        assert_eq!(
            plan,
            NodePoolPlan {
                update: vec![(0, "np-1".to_string())],
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_plan_template_change_under_same_id_is_not_an_update() {
        // Template fields cannot be changed in place; only scaling is pushed
        let desired = with_id(other_flavor("pool-a"), "np-1");
        let observed = vec![with_id(create_test_node_pool("pool-a"), "np-1")];
        assert!(plan_node_pools(&[desired], &observed).is_empty());
    }

    #[test]
    fn test_plan_adopts_by_identity() {
        let desired = vec![create_test_node_pool("pool-a")];
        let observed = vec![with_id(create_test_node_pool("renamed-upstream"), "np-1")];

        let plan = plan_node_pools(&desired, &observed);
        assert_eq!(plan.adopt, vec![(0, "np-1".to_string())]);
        assert!(plan.create.is_empty());
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_plan_creates_and_deletes() {
        let desired = vec![
            with_id(create_test_node_pool("pool-a"), "np-1"),
            other_flavor("pool-b"),
            with_id(create_test_node_pool("pool-c"), "np-gone"),
        ];
        let observed = vec![
            with_id(create_test_node_pool("pool-a"), "np-1"),
            with_id(create_test_node_pool("pool-x"), "np-2"),
        ];

        let plan = plan_node_pools(&desired, &observed);
        // pool-c's identity matches np-2, but it already carries an id
        assert_eq!(plan.create, vec![1, 2]);
        assert_eq!(plan.delete, vec!["np-2".to_string()]);
        assert!(plan.adopt.is_empty());
        assert!(plan.update.is_empty());
    }

    #[test]
    fn test_plan_claims_each_observed_pool_once() {
        let desired = vec![create_test_node_pool("pool-a"), create_test_node_pool("pool-b")];
        let observed = vec![with_id(create_test_node_pool("pool-a"), "np-1")];

        let plan = plan_node_pools(&desired, &observed);
        assert_eq!(plan.adopt, vec![(0, "np-1".to_string())]);
        assert_eq!(plan.create, vec![1]);
    }

    #[test]
    fn test_plan_ignores_observed_pools_without_id() {
        let observed = vec![create_test_node_pool("pool-a")];
        let plan = plan_node_pools(&[], &observed);
        assert!(plan.delete.is_empty());
    }

    /// Record with the given spec pools against an available cluster-1
    fn setup(h: &TestHarness, pools: Vec<NodePool>) -> ClusterConfig {
        let mut config = create_test_cluster_config("alpha");
        config.spec.node_pools = pools;
        config.status_mut().cluster_id = "cluster-1".to_string();
        h.cloud
            .add_cluster(create_test_cloud_cluster("cluster-1", &config.spec.name, ClusterState::Available));
        h.insert(config)
    }

    fn observed(h: &TestHarness) -> Vec<NodePool> {
        build_upstream_node_pools(&h.cloud.node_pools("cluster-1"))
    }

    #[tokio::test]
    async fn test_converge_writes_ids_into_spec() {
        let h = TestHarness::new();
        let config = setup(&h, vec![create_test_node_pool("pool-a"), other_flavor("pool-b")]);
        h.cloud.set_node_pools(
            "cluster-1",
            vec![
                create_test_cloud_node_pool("np-existing", &create_test_node_pool("pool-a"), NodePoolState::Normal),
                create_test_cloud_node_pool("np-stale", &create_test_node_pool("stale"), NodePoolState::Normal),
            ],
        );

        let (config, changed) = h
            .reconciler
            .converge_node_pools(&h.cloud, &config, &observed(&h), &HashSet::new())
            .await
            .expect("converge");
        assert!(changed);

        // pool-a adopted np-existing by identity, so np-stale is the one left over
        assert_eq!(config.spec.node_pools[0].id, "np-existing");
        let created_id = config.spec.node_pools[1].id.clone();
        assert!(created_id.starts_with("np-"));
        assert_ne!(created_id, "np-existing");
        assert_eq!(h.stored("alpha").spec.node_pools, config.spec.node_pools);

        assert_eq!(h.cloud.call_count("create_node_pool"), 1);
        assert!(h.cloud.calls().contains(&"delete_node_pool:np-stale".to_string()));
        let remaining: Vec<String> = observed(&h).into_iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec!["np-existing".to_string(), created_id]);
        assert_eq!(h.reconciler.metrics().provider_calls("delete_node_pool"), 1);
    }

    #[tokio::test]
    async fn test_converge_pushes_scaling() {
        let h = TestHarness::new();
        let mut pool = with_id(create_test_node_pool("pool-a"), "np-1");
        pool.initial_node_count = 3;
        let config = setup(&h, vec![pool]);
        h.cloud.set_node_pools(
            "cluster-1",
            vec![create_test_cloud_node_pool("np-1", &create_test_node_pool("pool-a"), NodePoolState::Normal)],
        );

        let (_, changed) = h
            .reconciler
            .converge_node_pools(&h.cloud, &config, &observed(&h), &HashSet::new())
            .await
            .expect("converge");
        assert!(changed);
        assert_eq!(h.cloud.call_count("update_node_pool"), 1);
        assert_eq!(observed(&h)[0].initial_node_count, 3);
    }

    #[tokio::test]
    async fn test_converge_skips_pools_already_deleting() {
        let h = TestHarness::new();
        let config = setup(&h, vec![with_id(create_test_node_pool("pool-a"), "np-1")]);
        h.cloud.set_node_pools(
            "cluster-1",
            vec![
                create_test_cloud_node_pool("np-1", &create_test_node_pool("pool-a"), NodePoolState::Normal),
                create_test_cloud_node_pool("np-2", &other_flavor("pool-x"), NodePoolState::Deleting),
            ],
        );

        let deleting = HashSet::from(["np-2".to_string()]);
        let (_, changed) = h
            .reconciler
            .converge_node_pools(&h.cloud, &config, &observed(&h), &deleting)
            .await
            .expect("converge");
        assert!(changed, "a pool still being removed is a pending change");
        assert_eq!(h.cloud.call_count("delete_node_pool"), 0);
    }

    #[tokio::test]
    async fn test_converge_ignores_pool_already_gone() {
        let h = TestHarness::new();
        let config = setup(&h, vec![with_id(create_test_node_pool("pool-a"), "np-1")]);
        h.cloud.set_node_pools(
            "cluster-1",
            vec![create_test_cloud_node_pool("np-1", &create_test_node_pool("pool-a"), NodePoolState::Normal)],
        );
        // Observed list is stale: np-5 was removed out of band
        let mut stale = observed(&h);
        stale.push(with_id(other_flavor("pool-x"), "np-5"));

        let (_, changed) = h
            .reconciler
            .converge_node_pools(&h.cloud, &config, &stale, &HashSet::new())
            .await
            .expect("404 on delete is not an error");
        assert!(changed);
        assert_eq!(h.cloud.call_count("delete_node_pool"), 1);
    }

    #[tokio::test]
    async fn test_converge_noop_writes_nothing() {
        let h = TestHarness::new();
        let config = setup(&h, vec![with_id(create_test_node_pool("pool-a"), "np-1")]);
        h.cloud.set_node_pools(
            "cluster-1",
            vec![create_test_cloud_node_pool("np-1", &create_test_node_pool("pool-a"), NodePoolState::Normal)],
        );
        let version = config.metadata.resource_version.clone();

        let (config, changed) = h
            .reconciler
            .converge_node_pools(&h.cloud, &config, &observed(&h), &HashSet::new())
            .await
            .expect("converge");
        assert!(!changed);
        assert_eq!(config.metadata.resource_version, version);
        assert_eq!(h.cloud.calls().len(), 0);
    }
}
