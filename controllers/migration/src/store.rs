//! Local cluster access
//!
//! The reconciler reads and writes the local (Karmada control plane) API only
//! through [`MigrationStore`], so tests can swap in the in-memory store from
//! `test_utils`.

use crds::{CheckpointBackup, STATEFUL_MIGRATION_LABEL, StatefulMigration};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, Selector};
use kube::Client;
use thiserror::Error;

/// Field manager used for patches
pub const FIELD_MANAGER: &str = "stateful-migration-operator";

/// Errors returned by a [`MigrationStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Kubernetes error: {0}")]
    Kube(#[source] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    fn from_kube(err: kube::Error, what: impl Into<String>) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound(what.into()),
            kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict(what.into()),
            other => StoreError::Kube(other),
        }
    }
}

/// Local cluster operations used by the migration reconciler
#[async_trait::async_trait]
pub trait MigrationStore: Send + Sync {
    /// Fetch a workload of the given resource type
    async fn get_workload(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<DynamicObject, StoreError>;

    /// Replace a workload (full object, optimistic concurrency on resourceVersion)
    async fn replace_workload(&self, resource: &ApiResource, workload: &DynamicObject) -> Result<DynamicObject, StoreError>;

    /// List pods in a namespace matching a label selector
    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>, StoreError>;

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Option<CheckpointBackup>, StoreError>;

    async fn create_backup(&self, backup: &CheckpointBackup) -> Result<CheckpointBackup, StoreError>;

    async fn replace_backup(&self, backup: &CheckpointBackup) -> Result<CheckpointBackup, StoreError>;

    /// List the backups labelled `stateful-migration=<migration>`
    async fn list_backups(&self, namespace: &str, migration: &str) -> Result<Vec<CheckpointBackup>, StoreError>;

    /// Delete a backup; a missing backup is [`StoreError::NotFound`]
    async fn delete_backup(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError>;

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, StoreError>;

    /// Overwrite the finalizer list of a StatefulMigration
    ///
    /// With `resource_version` set, a StatefulMigration changed since that
    /// version is a [`StoreError::Conflict`].
    async fn set_migration_finalizers(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError>;
}

/// Merge patch replacing the finalizer list
///
/// The API server treats `metadata.resourceVersion` in a merge patch as a
/// precondition, so a stale list is rejected with 409 instead of overwriting
/// finalizers added in the meantime.
pub fn finalizer_patch(resource_version: Option<&str>, finalizers: Vec<String>) -> serde_json::Value {
    let mut metadata = serde_json::json!({ "finalizers": finalizers });
    if let Some(version) = resource_version {
        metadata["resourceVersion"] = serde_json::Value::String(version.to_string());
    }
    serde_json::json!({ "metadata": metadata })
}

/// [`MigrationStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeMigrationStore {
    client: Client,
}

impl KubeMigrationStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn backups(&self, namespace: &str) -> Api<CheckpointBackup> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn workloads(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }
}

fn object_key<'a>(namespace: Option<&'a str>, name: Option<&'a str>) -> Result<(&'a str, &'a str), StoreError> {
    match (namespace, name) {
        (Some(ns), Some(n)) => Ok((ns, n)),
        _ => Err(StoreError::NotFound("object without namespace/name".to_string())),
    }
}

#[async_trait::async_trait]
impl MigrationStore for KubeMigrationStore {
    async fn get_workload(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<DynamicObject, StoreError> {
        self.workloads(resource, namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("{} {}/{}", resource.kind, namespace, name)))
    }

    async fn replace_workload(&self, resource: &ApiResource, workload: &DynamicObject) -> Result<DynamicObject, StoreError> {
        let (namespace, name) = object_key(workload.metadata.namespace.as_deref(), workload.metadata.name.as_deref())?;
        self.workloads(resource, namespace)
            .replace(name, &PostParams::default(), workload)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("{} {}/{}", resource.kind, namespace, name)))
    }

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>, StoreError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels_from(selector))
            .await
            .map_err(|e| StoreError::from_kube(e, format!("pods in {}", namespace)))?;
        Ok(pods.items)
    }

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Option<CheckpointBackup>, StoreError> {
        self.backups(namespace)
            .get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("CheckpointBackup {}/{}", namespace, name)))
    }

    async fn create_backup(&self, backup: &CheckpointBackup) -> Result<CheckpointBackup, StoreError> {
        let (namespace, name) = object_key(backup.metadata.namespace.as_deref(), backup.metadata.name.as_deref())?;
        self.backups(namespace)
            .create(&PostParams::default(), backup)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("CheckpointBackup {}/{}", namespace, name)))
    }

    async fn replace_backup(&self, backup: &CheckpointBackup) -> Result<CheckpointBackup, StoreError> {
        let (namespace, name) = object_key(backup.metadata.namespace.as_deref(), backup.metadata.name.as_deref())?;
        self.backups(namespace)
            .replace(name, &PostParams::default(), backup)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("CheckpointBackup {}/{}", namespace, name)))
    }

    async fn list_backups(&self, namespace: &str, migration: &str) -> Result<Vec<CheckpointBackup>, StoreError> {
        let params = ListParams::default().labels(&format!("{}={}", STATEFUL_MIGRATION_LABEL, migration));
        let backups = self
            .backups(namespace)
            .list(&params)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("CheckpointBackups in {}", namespace)))?;
        Ok(backups.items)
    }

    async fn delete_backup(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.backups(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| StoreError::from_kube(e, format!("CheckpointBackup {}/{}", namespace, name)))
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("namespace {}", name)))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, StoreError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let name = namespace.metadata.name.clone().unwrap_or_default();
        api.create(&PostParams::default(), namespace)
            .await
            .map_err(|e| StoreError::from_kube(e, format!("namespace {}", name)))
    }

    async fn set_migration_finalizers(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        let api: Api<StatefulMigration> = Api::namespaced(self.client.clone(), namespace);
        let patch = finalizer_patch(resource_version, finalizers);
        api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|e| StoreError::from_kube(e, format!("StatefulMigration {}/{}", namespace, name)))
    }
}
