//! Unit tests for the StatefulMigration lifecycle

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::store::StoreError;
    use crate::reconciler::namespace::NAMESPACE_POLICY_NAME;
    use crate::reconciler::{IntentPhase, REQUEUE_INTERVAL};
    use crate::test_utils::*;
    use crds::{CHECKPOINT_MIGRATION_LABEL, MIGRATION_BACKUP_FINALIZER, SHARED_NAMESPACE, StatefulMigration};
    use kube::core::ApiResource;
    use kube_runtime::controller::Action;

    /// StatefulSet `app` in `default` with the given pods
    fn seed_stateful_set(h: &TestHarness, pods: &[&str]) -> ApiResource {
        let (resource, sts) = create_test_stateful_set("app", "default", "app");
        h.store.add_workload(&resource, sts);
        for pod in pods {
            h.store.add_pod(create_test_pod(pod, "default", "app"));
        }
        resource
    }

    fn mig1() -> StatefulMigration {
        with_finalizer(create_test_migration("mig1", "default", "StatefulSet", "app", &["c1", "c2"]))
    }

    fn workload_label(h: &TestHarness, resource: &ApiResource) -> Option<String> {
        h.store
            .workload(resource, "default", "app")?
            .metadata
            .labels?
            .get(CHECKPOINT_MIGRATION_LABEL)
            .cloned()
    }

    #[test]
    fn test_phase_follows_finalizer_and_deletion() {
        let intent = create_test_migration("mig1", "default", "StatefulSet", "app", &["c1"]);
        assert_eq!(IntentPhase::of(&intent), IntentPhase::Unmanaged);
        let intent = with_finalizer(intent);
        assert_eq!(IntentPhase::of(&intent), IntentPhase::Active);
        assert_eq!(IntentPhase::of(&terminating(intent)), IntentPhase::Terminating);
    }

    #[tokio::test]
    async fn test_scenario_two_pods_two_clusters() {
        let h = TestHarness::connected();
        let resource = seed_stateful_set(&h, &["app-0", "app-1"]);

        let action = h.reconciler.reconcile_migration(&mig1()).await.unwrap();
        assert_eq!(action, Action::requeue(REQUEUE_INTERVAL));

        assert_eq!(workload_label(&h, &resource).as_deref(), Some("true"));
        assert_eq!(
            h.store.backup_names("default"),
            vec!["mig1-app-0-c1", "mig1-app-0-c2", "mig1-app-1-c1", "mig1-app-1-c2"]
        );
        assert_eq!(h.policies.policy_names("default").len(), 4);

        // Shared namespace and its policy
        let ns = h.store.namespace(SHARED_NAMESPACE).unwrap();
        assert_eq!(
            ns.metadata.labels.unwrap().get("created-by").map(String::as_str),
            Some("stateful-migration-operator")
        );
        let ns_policy = h.policies.policy(SHARED_NAMESPACE, NAMESPACE_POLICY_NAME).unwrap();
        assert_eq!(ns_policy.spec.cluster_names(), ["c1".to_string(), "c2".to_string()]);
        assert_eq!(
            ns_policy.metadata.labels.unwrap().get("resource-type").map(String::as_str),
            Some("namespace")
        );

        // Member cluster bootstrap
        for cluster in ["c1", "c2"] {
            assert!(h.members.has_namespace(cluster, "default"));
            assert!(h.members.has_crd(cluster));
        }
    }

    #[tokio::test]
    async fn test_second_pass_performs_no_writes() {
        let h = TestHarness::connected();
        seed_stateful_set(&h, &["app-0", "app-1"]);
        let intent = mig1();

        h.reconciler.reconcile_migration(&intent).await.unwrap();
        h.clear_writes();
        h.reconciler.reconcile_migration(&intent).await.unwrap();

        assert_eq!(h.all_writes(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_scale_down_deletes_exactly_the_removed_pod() {
        let h = TestHarness::connected();
        seed_stateful_set(&h, &["app-0", "app-1"]);
        let intent = mig1();
        h.reconciler.reconcile_migration(&intent).await.unwrap();

        h.store.remove_pod("default", "app-1");
        h.clear_writes();
        h.reconciler.reconcile_migration(&intent).await.unwrap();

        assert_eq!(h.store.backup_names("default"), vec!["mig1-app-0-c1", "mig1-app-0-c2"]);
        assert_eq!(
            h.policies.policy_names("default"),
            vec!["mig1-app-0-c1-policy", "mig1-app-0-c2-policy"]
        );
        assert_eq!(
            h.store.writes(),
            vec!["delete_backup default/mig1-app-1-c1", "delete_backup default/mig1-app-1-c2"]
        );
    }

    #[tokio::test]
    async fn test_unmanaged_intent_gets_finalizer_and_converges() {
        let h = TestHarness::connected();
        seed_stateful_set(&h, &["app-0"]);
        let mut intent = create_test_migration("mig1", "default", "StatefulSet", "app", &["c1"]);
        intent.metadata.finalizers = Some(vec!["example.com/other".to_string()]);

        h.reconciler.reconcile_migration(&intent).await.unwrap();

        assert_eq!(
            h.store.finalizers("default", "mig1").unwrap(),
            vec!["example.com/other".to_string(), MIGRATION_BACKUP_FINALIZER.to_string()]
        );
        assert_eq!(h.store.writes()[0], "set_finalizers default/mig1");
        assert_eq!(h.store.backup_names("default"), vec!["mig1-app-0-c1"]);
    }

    #[tokio::test]
    async fn test_stale_intent_cannot_overwrite_finalizers() {
        let h = TestHarness::connected();
        seed_stateful_set(&h, &["app-0"]);
        let mut cached = create_test_migration("mig1", "default", "StatefulSet", "app", &["c1"]);
        cached.metadata.resource_version = Some("100".to_string());

        // Another controller adds its finalizer after our cache was filled
        let mut current = cached.clone();
        current.metadata.resource_version = Some("101".to_string());
        current.metadata.finalizers = Some(vec!["example.com/other".to_string()]);
        h.store.add_migration(&current);

        let err = h.reconciler.reconcile_migration(&cached).await.unwrap_err();
        assert!(matches!(err, ControllerError::Store(StoreError::Conflict(_))));
        assert_eq!(
            h.store.finalizers("default", "mig1").unwrap(),
            vec!["example.com/other".to_string()]
        );
        assert!(h.store.backup_names("default").is_empty());

        // The requeued pass sees the fresh object and keeps both finalizers
        h.reconciler.reconcile_migration(&current).await.unwrap();
        assert_eq!(
            h.store.finalizers("default", "mig1").unwrap(),
            vec!["example.com/other".to_string(), MIGRATION_BACKUP_FINALIZER.to_string()]
        );
        assert_ne!(h.store.migration_version("default", "mig1").as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn test_stale_teardown_keeps_finalizer() {
        let h = TestHarness::connected();
        seed_stateful_set(&h, &["app-0"]);
        let mut intent = mig1();
        intent.metadata.resource_version = Some("5".to_string());
        h.reconciler.reconcile_migration(&intent).await.unwrap();

        let mut current = intent.clone();
        current.metadata.resource_version = Some("6".to_string());
        h.store.add_migration(&current);

        let err = h.reconciler.reconcile_migration(&terminating(intent)).await.unwrap_err();
        assert!(matches!(err, ControllerError::Store(StoreError::Conflict(_))));
        assert_eq!(
            h.store.finalizers("default", "mig1").unwrap(),
            vec![MIGRATION_BACKUP_FINALIZER.to_string()]
        );
    }

    #[tokio::test]
    async fn test_teardown_removes_label_backups_then_finalizer() {
        let h = TestHarness::connected();
        let resource = seed_stateful_set(&h, &["app-0", "app-1"]);
        let intent = mig1();
        h.reconciler.reconcile_migration(&intent).await.unwrap();
        h.clear_writes();

        let action = h.reconciler.reconcile_migration(&terminating(intent)).await.unwrap();
        assert_eq!(action, Action::await_change());

        assert_eq!(workload_label(&h, &resource), None);
        assert!(h.store.backup_names("default").is_empty());
        assert!(h.policies.policy_names("default").is_empty());
        assert_eq!(h.store.finalizers("default", "mig1").unwrap(), Vec::<String>::new());

        let writes = h.store.writes();
        assert_eq!(writes.first().map(String::as_str), Some("replace_workload StatefulSet default/app"));
        assert_eq!(writes.last().map(String::as_str), Some("set_finalizers default/mig1"));
        assert_eq!(writes.iter().filter(|w| w.starts_with("delete_backup")).count(), 4);
        assert_eq!(h.metrics.backups_deleted(), 4);
        // The shared namespace policy outlives the migration
        assert!(h.policies.policy(SHARED_NAMESPACE, NAMESPACE_POLICY_NAME).is_some());
    }

    #[tokio::test]
    async fn test_failed_teardown_keeps_finalizer() {
        let h = TestHarness::connected();
        h.members.add_pod("c1", create_test_pod("solo", "default", "solo"));
        let intent = with_finalizer(create_test_migration("mig1", "default", "Pod", "solo", &["c1", "c2"]));
        h.reconciler.reconcile_migration(&intent).await.unwrap();
        assert_eq!(h.store.backup_names("default").len(), 2);

        h.members.set_unreachable("c2");
        h.clear_writes();
        let err = h.reconciler.reconcile_migration(&terminating(intent)).await.unwrap_err();

        assert!(matches!(err, ControllerError::Karmada(_)));
        assert_eq!(h.store.backup_names("default").len(), 2);
        assert_eq!(h.store.finalizers("default", "mig1"), None);
    }

    #[tokio::test]
    async fn test_terminating_without_finalizer_does_nothing() {
        let h = TestHarness::connected();
        let intent = terminating(create_test_migration("mig1", "default", "StatefulSet", "app", &["c1"]));

        let action = h.reconciler.reconcile_migration(&intent).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(h.all_writes().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_kind_fails_the_same_way_every_time() {
        let h = TestHarness::connected();
        let intent = with_finalizer(create_test_migration("mig1", "default", "CronJob", "nightly", &["c1"]));

        let first = h.reconciler.reconcile_migration(&intent).await.unwrap_err();
        let second = h.reconciler.reconcile_migration(&intent).await.unwrap_err();

        assert!(matches!(first, ControllerError::UnsupportedKind(_)));
        assert_eq!(first.to_string(), second.to_string());
        assert!(h.store.backup_names("default").is_empty());
        assert!(h.all_writes().is_empty());
    }

    #[tokio::test]
    async fn test_pod_kind_labels_only_first_cluster() {
        let h = TestHarness::connected();
        h.members.add_pod("c1", create_test_pod("solo", "default", "solo"));
        h.members.add_pod("c2", create_test_pod("solo", "default", "solo"));
        let intent = with_finalizer(create_test_migration("mig1", "default", "Pod", "solo", &["c1", "c2"]));

        h.reconciler.reconcile_migration(&intent).await.unwrap();

        let labelled = |cluster: &str| {
            h.members
                .pod(cluster, "default", "solo")
                .and_then(|p| p.metadata.labels)
                .is_some_and(|l| l.contains_key(CHECKPOINT_MIGRATION_LABEL))
        };
        assert!(labelled("c1"));
        assert!(!labelled("c2"));
        assert_eq!(h.store.backup_names("default"), vec!["mig1-solo-c1", "mig1-solo-c2"]);
    }

    #[tokio::test]
    async fn test_degraded_mode_still_fans_out_locally() {
        let h = TestHarness::degraded();
        seed_stateful_set(&h, &["app-0"]);

        let action = h.reconciler.reconcile_migration(&mig1()).await.unwrap();

        assert_eq!(action, Action::requeue(REQUEUE_INTERVAL));
        assert_eq!(h.store.backup_names("default"), vec!["mig1-app-0-c1", "mig1-app-0-c2"]);
        assert!(h.store.namespace(SHARED_NAMESPACE).is_some());
        assert!(h.policies.writes().is_empty());
        assert!(h.members.writes().is_empty());
    }
}
