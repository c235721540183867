//! Test utilities for unit testing the reconciler
//!
//! `MockMigrationStore` keeps the local cluster in memory and records every
//! write, so tests can assert on exactly what a pass changed.

use crate::metrics::Metrics;
use crate::reconciler::workload::WorkloadRegistry;
use crate::reconciler::{Federation, Reconciler};
use crate::store::{MigrationStore, StoreError};
use crds::*;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{Container as PodContainer, Namespace, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use karmada_client::{MockMemberClusterClient, MockPropagationClient};
use kube::core::{ApiResource, DynamicObject, Selector, SelectorExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

type Key = (String, String);

/// In-memory [`MigrationStore`]
#[derive(Clone, Default)]
pub struct MockMigrationStore {
    workloads: Arc<Mutex<HashMap<(String, String, String), DynamicObject>>>,
    pods: Arc<Mutex<Vec<Pod>>>,
    backups: Arc<Mutex<HashMap<Key, CheckpointBackup>>>,
    namespaces: Arc<Mutex<HashMap<String, Namespace>>>,
    finalizers: Arc<Mutex<HashMap<Key, Vec<String>>>>,
    migration_versions: Arc<Mutex<HashMap<Key, String>>>,
    next_version: Arc<Mutex<u64>>,
    writes: Arc<Mutex<Vec<String>>>,
}

fn key(namespace: Option<&String>, name: Option<&String>) -> Key {
    (namespace.cloned().unwrap_or_default(), name.cloned().unwrap_or_default())
}

impl MockMigrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_version(&self) -> String {
        let mut version = self.next_version.lock().unwrap();
        *version += 1;
        version.to_string()
    }

    fn record(&self, entry: String) {
        self.writes.lock().unwrap().push(entry);
    }

    pub fn add_workload(&self, resource: &ApiResource, mut workload: DynamicObject) {
        workload.metadata.resource_version = Some(self.bump_version());
        let (ns, name) = key(workload.metadata.namespace.as_ref(), workload.metadata.name.as_ref());
        self.workloads
            .lock()
            .unwrap()
            .insert((resource.kind.clone(), ns, name), workload);
    }

    pub fn workload(&self, resource: &ApiResource, namespace: &str, name: &str) -> Option<DynamicObject> {
        self.workloads
            .lock()
            .unwrap()
            .get(&(resource.kind.clone(), namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn add_pod(&self, pod: Pod) {
        self.pods.lock().unwrap().push(pod);
    }

    pub fn remove_pod(&self, namespace: &str, name: &str) {
        self.pods.lock().unwrap().retain(|p| {
            p.metadata.namespace.as_deref() != Some(namespace) || p.metadata.name.as_deref() != Some(name)
        });
    }

    /// Seed a backup as if it already existed (for test setup)
    pub fn add_backup(&self, mut backup: CheckpointBackup) {
        backup.metadata.resource_version = Some(self.bump_version());
        let k = key(backup.metadata.namespace.as_ref(), backup.metadata.name.as_ref());
        self.backups.lock().unwrap().insert(k, backup);
    }

    pub fn backup(&self, namespace: &str, name: &str) -> Option<CheckpointBackup> {
        self.backups
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Sorted backup names in a namespace
    pub fn backup_names(&self, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .backups
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn namespace(&self, name: &str) -> Option<Namespace> {
        self.namespaces.lock().unwrap().get(name).cloned()
    }

    /// Seed a StatefulMigration's finalizers and resourceVersion as stored
    ///
    /// Finalizer writes against a seeded migration must carry its current
    /// resourceVersion; unseeded migrations accept any write.
    pub fn add_migration(&self, migration: &StatefulMigration) {
        let k = key(migration.metadata.namespace.as_ref(), migration.metadata.name.as_ref());
        let version = migration.metadata.resource_version.clone().unwrap_or_else(|| self.bump_version());
        self.migration_versions.lock().unwrap().insert(k.clone(), version);
        self.finalizers
            .lock()
            .unwrap()
            .insert(k, migration.metadata.finalizers.clone().unwrap_or_default());
    }

    /// Current resourceVersion of a seeded StatefulMigration
    pub fn migration_version(&self, namespace: &str, name: &str) -> Option<String> {
        self.migration_versions
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn finalizers(&self, namespace: &str, name: &str) -> Option<Vec<String>> {
        self.finalizers
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Mutating calls in order, e.g. `create_backup default/mig1-app-0-c1`
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl MigrationStore for MockMigrationStore {
    async fn get_workload(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<DynamicObject, StoreError> {
        self.workload(resource, namespace, name)
            .ok_or_else(|| StoreError::NotFound(format!("{} {}/{}", resource.kind, namespace, name)))
    }

    async fn replace_workload(&self, resource: &ApiResource, workload: &DynamicObject) -> Result<DynamicObject, StoreError> {
        let (ns, name) = key(workload.metadata.namespace.as_ref(), workload.metadata.name.as_ref());
        let mut workloads = self.workloads.lock().unwrap();
        let slot = workloads
            .get_mut(&(resource.kind.clone(), ns.clone(), name.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("{} {}/{}", resource.kind, ns, name)))?;
        if slot.metadata.resource_version != workload.metadata.resource_version {
            return Err(StoreError::Conflict(format!("{} {}/{}", resource.kind, ns, name)));
        }
        let mut stored = workload.clone();
        stored.metadata.resource_version = Some(self.bump_version());
        *slot = stored.clone();
        drop(workloads);
        self.record(format!("replace_workload {} {}/{}", resource.kind, ns, name));
        Ok(stored)
    }

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>, StoreError> {
        let empty = BTreeMap::new();
        Ok(self
            .pods
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.metadata.namespace.as_deref() == Some(namespace))
            .filter(|p| selector.matches(p.metadata.labels.as_ref().unwrap_or(&empty)))
            .cloned()
            .collect())
    }

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Option<CheckpointBackup>, StoreError> {
        Ok(self.backup(namespace, name))
    }

    async fn create_backup(&self, backup: &CheckpointBackup) -> Result<CheckpointBackup, StoreError> {
        let k = key(backup.metadata.namespace.as_ref(), backup.metadata.name.as_ref());
        if self.backups.lock().unwrap().contains_key(&k) {
            return Err(StoreError::Conflict(format!("CheckpointBackup {}/{}", k.0, k.1)));
        }
        let mut stored = backup.clone();
        stored.metadata.resource_version = Some(self.bump_version());
        self.backups.lock().unwrap().insert(k.clone(), stored.clone());
        self.record(format!("create_backup {}/{}", k.0, k.1));
        Ok(stored)
    }

    async fn replace_backup(&self, backup: &CheckpointBackup) -> Result<CheckpointBackup, StoreError> {
        let k = key(backup.metadata.namespace.as_ref(), backup.metadata.name.as_ref());
        let current = self
            .backup(&k.0, &k.1)
            .ok_or_else(|| StoreError::NotFound(format!("CheckpointBackup {}/{}", k.0, k.1)))?;
        if current.metadata.resource_version != backup.metadata.resource_version {
            return Err(StoreError::Conflict(format!("CheckpointBackup {}/{}", k.0, k.1)));
        }
        let mut stored = backup.clone();
        stored.metadata.resource_version = Some(self.bump_version());
        self.backups.lock().unwrap().insert(k.clone(), stored.clone());
        self.record(format!("replace_backup {}/{}", k.0, k.1));
        Ok(stored)
    }

    async fn list_backups(&self, namespace: &str, migration: &str) -> Result<Vec<CheckpointBackup>, StoreError> {
        let mut backups: Vec<CheckpointBackup> = self
            .backups
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.metadata.namespace.as_deref() == Some(namespace))
            .filter(|b| {
                b.metadata
                    .labels
                    .as_ref()
                    .and_then(|l| l.get(STATEFUL_MIGRATION_LABEL))
                    .is_some_and(|m| m == migration)
            })
            .cloned()
            .collect();
        backups.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(backups)
    }

    async fn delete_backup(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.backups
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("CheckpointBackup {}/{}", namespace, name)))?;
        self.record(format!("delete_backup {}/{}", namespace, name));
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError> {
        Ok(self.namespace(name))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, StoreError> {
        let name = namespace.metadata.name.clone().unwrap_or_default();
        let mut namespaces = self.namespaces.lock().unwrap();
        if namespaces.contains_key(&name) {
            return Err(StoreError::Conflict(format!("namespace {}", name)));
        }
        namespaces.insert(name.clone(), namespace.clone());
        drop(namespaces);
        self.record(format!("create_namespace {}", name));
        Ok(namespace.clone())
    }

    async fn set_migration_finalizers(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        let k = (namespace.to_string(), name.to_string());
        let mut versions = self.migration_versions.lock().unwrap();
        if let Some(current) = versions.get(&k) {
            if resource_version.is_some_and(|v| v != current) {
                return Err(StoreError::Conflict(format!("StatefulMigration {}/{}", namespace, name)));
            }
            versions.insert(k.clone(), self.bump_version());
        }
        drop(versions);
        self.finalizers.lock().unwrap().insert(k, finalizers);
        self.record(format!("set_finalizers {}/{}", namespace, name));
        Ok(())
    }
}

/// Everything a reconciler test needs, with handles on each fake
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub store: MockMigrationStore,
    pub policies: MockPropagationClient,
    pub members: MockMemberClusterClient,
    pub metrics: Arc<Metrics>,
}

impl TestHarness {
    /// Reconciler wired to mocks with Karmada connected
    pub fn connected() -> Self {
        let policies = MockPropagationClient::new();
        let members = MockMemberClusterClient::new();
        let federation = Federation::Connected {
            policies: Arc::new(policies.clone()),
            members: Arc::new(members.clone()),
        };
        Self::with_federation(federation, policies, members)
    }

    /// Reconciler running without Karmada
    pub fn degraded() -> Self {
        Self::with_federation(
            Federation::Unavailable,
            MockPropagationClient::new(),
            MockMemberClusterClient::new(),
        )
    }

    fn with_federation(federation: Federation, policies: MockPropagationClient, members: MockMemberClusterClient) -> Self {
        let store = MockMigrationStore::new();
        let metrics = Arc::new(Metrics::new().unwrap());
        let reconciler = Reconciler::new(
            Arc::new(store.clone()),
            federation,
            WorkloadRegistry::with_defaults(),
            Arc::clone(&metrics),
        );
        Self {
            reconciler,
            store,
            policies,
            members,
            metrics,
        }
    }

    /// Writes across the local store and both Karmada mocks
    pub fn all_writes(&self) -> Vec<String> {
        let mut writes = self.store.writes();
        writes.extend(self.policies.writes());
        writes.extend(self.members.writes());
        writes
    }

    pub fn clear_writes(&self) {
        self.store.clear_writes();
        self.policies.clear_writes();
        self.members.clear_writes();
    }
}

/// Helper to create a test StatefulMigration referencing `kind`/`workload`
pub fn create_test_migration(name: &str, namespace: &str, kind: &str, workload: &str, clusters: &[&str]) -> StatefulMigration {
    let api_version = if kind == "Pod" { "v1" } else { "apps/v1" };
    StatefulMigration {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("{}-uid", name)),
            ..Default::default()
        },
        spec: StatefulMigrationSpec {
            resource_ref: ResourceRef {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
                namespace: Some(namespace.to_string()),
                name: workload.to_string(),
            },
            source_clusters: clusters.iter().map(|c| c.to_string()).collect(),
            registry: Registry {
                url: "registry.local".to_string(),
                repository: "checkpoints".to_string(),
                secret_ref: None,
            },
            schedule: "*/5 * * * *".to_string(),
        },
    }
}

/// The same migration with the backup finalizer attached
pub fn with_finalizer(mut migration: StatefulMigration) -> StatefulMigration {
    migration
        .metadata
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(MIGRATION_BACKUP_FINALIZER.to_string());
    migration
}

/// The same migration marked for deletion
pub fn terminating(mut migration: StatefulMigration) -> StatefulMigration {
    migration.metadata.deletion_timestamp = Some(serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap());
    migration
}

/// Helper to create a test StatefulSet with `spec.selector.matchLabels = {app: <app>}`
pub fn create_test_stateful_set(name: &str, namespace: &str, app: &str) -> (ApiResource, DynamicObject) {
    let resource = ApiResource::erase::<StatefulSet>(&());
    let object = DynamicObject::new(name, &resource).within(namespace).data(serde_json::json!({
        "spec": {
            "selector": { "matchLabels": { "app": app } }
        }
    }));
    (resource, object)
}

/// Helper to create a test Pod with an `app` label and one container
pub fn create_test_pod(name: &str, namespace: &str, app: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([("app".to_string(), app.to_string())])),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![PodContainer {
                name: "main".to_string(),
                image: Some(format!("{}:latest", app)),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}
