//! StatefulMigration CRD
//!
//! The user-authored intent: which workload to checkpoint, on what schedule,
//! from which member clusters and into which registry.

use crate::labels::MIGRATION_BACKUP_FINALIZER;
use crate::references::{Registry, ResourceRef};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "migration.dcnlab.com",
    version = "v1",
    kind = "StatefulMigration",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StatefulMigrationSpec {
    /// Workload to migrate
    pub resource_ref: ResourceRef,

    /// Member clusters to back up from (order matters for `Pod` workloads)
    pub source_clusters: Vec<String>,

    /// Registry that receives checkpoint images
    pub registry: Registry,

    /// Backup schedule in cron format
    pub schedule: String,
}

impl StatefulMigration {
    /// Whether the backup finalizer is attached
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|name| name == MIGRATION_BACKUP_FINALIZER))
    }

    /// Whether the API server has marked this object for deletion
    pub fn is_terminating(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
