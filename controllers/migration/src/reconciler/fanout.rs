//! CheckpointBackup fan-out
//!
//! One backup per (pod, cluster) pair, each followed by the policy that
//! binds it to its cluster.

use super::Reconciler;
use super::workload::PodIdentity;
use crate::error::ControllerError;
use crds::{
    CheckpointBackup, CheckpointBackupSpec, PodRef, PropagationSpec, STATEFUL_MIGRATION_LABEL, StatefulMigration,
    TARGET_CLUSTER_LABEL, TARGET_POD_LABEL, backup_policy_name, checkpoint_backup_name,
};
use kube::Resource;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What happened to a single backup during fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Pick one identity per pod name for `cluster`, in discovery order.
///
/// Discovery through the proxy returns the same pod once per cluster; the
/// copy read from `cluster` wins, otherwise the first one seen.
pub fn pods_for_cluster<'a>(pods: &'a [PodIdentity], cluster: &str) -> Vec<&'a PodIdentity> {
    let mut selected: Vec<&PodIdentity> = Vec::new();
    for pod in pods {
        match selected.iter_mut().find(|p| p.name == pod.name) {
            Some(slot) => {
                if slot.cluster.as_deref() != Some(cluster) && pod.cluster.as_deref() == Some(cluster) {
                    *slot = pod;
                }
            }
            None => selected.push(pod),
        }
    }
    selected
}

/// Desired spec of the backup for `pod`
pub fn desired_backup_spec(intent: &StatefulMigration, namespace: &str, pod: &PodIdentity) -> CheckpointBackupSpec {
    let mut resource_ref = intent.spec.resource_ref.clone();
    if resource_ref.namespace.is_none() {
        resource_ref.namespace = Some(namespace.to_string());
    }
    CheckpointBackupSpec {
        schedule: intent.spec.schedule.clone(),
        pod_ref: PodRef {
            namespace: Some(pod.namespace.clone()),
            name: pod.name.clone(),
        },
        resource_ref,
        registry: intent.spec.registry.clone(),
        containers: pod.containers.clone(),
    }
}

fn backup_labels(migration: &str, pod: &str, cluster: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (STATEFUL_MIGRATION_LABEL.to_string(), migration.to_string()),
        (TARGET_CLUSTER_LABEL.to_string(), cluster.to_string()),
        (TARGET_POD_LABEL.to_string(), pod.to_string()),
    ])
}

impl Reconciler {
    /// Create or replace every backup in pods × clusters; the first failure aborts
    pub(crate) async fn fan_out_backups(
        &self,
        intent: &StatefulMigration,
        pods: &[PodIdentity],
    ) -> Result<(), ControllerError> {
        let migration = intent.metadata.name.as_deref().ok_or(ControllerError::MissingObjectKey("name"))?;
        let namespace = intent
            .metadata
            .namespace
            .as_deref()
            .ok_or(ControllerError::MissingObjectKey("namespace"))?;

        for cluster in &intent.spec.source_clusters {
            for pod in pods_for_cluster(pods, cluster) {
                let backup_name = checkpoint_backup_name(migration, &pod.name, cluster);
                let spec = desired_backup_spec(intent, namespace, pod);
                self.apply_backup(intent, namespace, &backup_name, &pod.name, cluster, spec)
                    .await?;

                let policy_spec = PropagationSpec::for_object(
                    &CheckpointBackup::api_version(&()),
                    &CheckpointBackup::kind(&()),
                    Some(namespace),
                    &backup_name,
                    vec![cluster.clone()],
                );
                self.upsert_policy(namespace, &backup_policy_name(&backup_name), BTreeMap::new(), policy_spec)
                    .await?;
            }
        }
        Ok(())
    }

    async fn apply_backup(
        &self,
        intent: &StatefulMigration,
        namespace: &str,
        name: &str,
        pod: &str,
        cluster: &str,
        spec: CheckpointBackupSpec,
    ) -> Result<BackupOutcome, ControllerError> {
        let migration = intent.metadata.name.as_deref().unwrap_or_default();

        let Some(mut existing) = self.store.get_backup(namespace, name).await? else {
            let owner = intent
                .controller_owner_ref(&())
                .ok_or(ControllerError::MissingObjectKey("uid"))?;
            let backup = CheckpointBackup {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some(namespace.to_string()),
                    labels: Some(backup_labels(migration, pod, cluster)),
                    owner_references: Some(vec![owner]),
                    ..Default::default()
                },
                spec,
            };
            self.store.create_backup(&backup).await?;
            self.metrics.backup_created();
            info!("Created CheckpointBackup {}/{} for cluster {}", namespace, name, cluster);
            return Ok(BackupOutcome::Created);
        };

        if existing.spec == spec {
            debug!("CheckpointBackup {}/{} is up to date", namespace, name);
            return Ok(BackupOutcome::Unchanged);
        }
        existing.spec = spec;
        self.store.replace_backup(&existing).await?;
        info!("Updated CheckpointBackup {}/{}", namespace, name);
        Ok(BackupOutcome::Updated)
    }
}
