//! Orphaned CheckpointBackup removal

use super::Reconciler;
use super::workload::PodIdentity;
use crate::error::ControllerError;
use crds::{CheckpointBackup, TARGET_POD_LABEL, backup_policy_name};
use std::collections::HashSet;
use tracing::{info, warn};

/// Backups whose `target-pod` label is missing or names a pod not in `pods`.
///
/// Only the pod name is compared; a backup for a cluster no longer listed
/// in `sourceClusters` is kept as long as its pod exists.
pub fn find_orphans<'a>(backups: &'a [CheckpointBackup], pods: &[PodIdentity]) -> Vec<&'a CheckpointBackup> {
    let desired: HashSet<&str> = pods.iter().map(|p| p.name.as_str()).collect();
    backups
        .iter()
        .filter(|backup| {
            backup
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(TARGET_POD_LABEL))
                .is_none_or(|pod| !desired.contains(pod.as_str()))
        })
        .collect()
}

impl Reconciler {
    /// Delete the intent's backups that no longer match a discovered pod
    pub(crate) async fn collect_orphans(
        &self,
        namespace: &str,
        migration: &str,
        pods: &[PodIdentity],
    ) -> Result<usize, ControllerError> {
        let backups = self.store.list_backups(namespace, migration).await?;
        let orphans = find_orphans(&backups, pods);
        for backup in &orphans {
            let Some(name) = backup.metadata.name.as_deref() else {
                warn!("Skipping CheckpointBackup without a name in {}", namespace);
                continue;
            };
            info!("Deleting orphaned CheckpointBackup {}/{}", namespace, name);
            self.delete_backup_and_policy(namespace, name).await?;
        }
        Ok(orphans.len())
    }

    /// Delete a backup and its PropagationPolicy, tolerating either being gone
    pub(crate) async fn delete_backup_and_policy(&self, namespace: &str, name: &str) -> Result<(), ControllerError> {
        match self.store.delete_backup(namespace, name).await {
            Ok(()) => {
                self.metrics.backup_deleted();
                info!("Deleted CheckpointBackup {}/{}", namespace, name);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.delete_policy(namespace, &backup_policy_name(name)).await?;
        Ok(())
    }
}
