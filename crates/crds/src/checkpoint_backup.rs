//! CheckpointBackup CRD
//!
//! One object per (pod, member cluster) pair derived from a StatefulMigration.
//! These are propagated to the member cluster where the checkpoint agent runs.

use crate::references::{Container, PodRef, Registry, ResourceRef};
use kube::{CustomResource, CustomResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fully qualified name of the CheckpointBackup CRD
pub const CHECKPOINT_BACKUP_CRD_NAME: &str = "checkpointbackups.migration.dcnlab.com";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "migration.dcnlab.com",
    version = "v1",
    kind = "CheckpointBackup",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointBackupSpec {
    /// Backup schedule in cron format
    pub schedule: String,

    /// Pod to checkpoint
    pub pod_ref: PodRef,

    /// Workload the pod belongs to
    pub resource_ref: ResourceRef,

    /// Registry that receives checkpoint images
    pub registry: Registry,

    /// Containers of the pod at discovery time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
}

/// Deterministic CheckpointBackup name: `{migration}-{pod}-{cluster}`
pub fn checkpoint_backup_name(migration: &str, pod: &str, cluster: &str) -> String {
    format!("{}-{}-{}", migration, pod, cluster)
}

/// Name of the PropagationPolicy that distributes a CheckpointBackup
pub fn backup_policy_name(backup: &str) -> String {
    format!("{}-policy", backup)
}

/// Renders the CheckpointBackup CRD manifest as YAML.
///
/// Used as the built-in fallback when no CRD file is mounted into the controller.
pub fn checkpoint_backup_crd_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&CheckpointBackup::crd())
}
