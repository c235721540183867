//! CheckpointRestore CRD
//!
//! Requests restoration of a pod from a CheckpointBackup.

use crate::references::{BackupRef, Container};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "migration.dcnlab.com",
    version = "v1",
    kind = "CheckpointRestore",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRestoreSpec {
    /// Backup to restore from
    pub backup_ref: BackupRef,

    /// Name of the pod to restore
    pub pod_name: String,

    /// Container images to restore
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
}
