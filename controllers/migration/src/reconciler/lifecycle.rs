//! StatefulMigration lifecycle: finalizer, normal pass and teardown.

use super::Reconciler;
use super::workload::WorkloadContext;
use crate::error::ControllerError;
use crds::{MIGRATION_BACKUP_FINALIZER, StatefulMigration};
use kube_runtime::controller::Action;
use std::time::Duration;
use tracing::{debug, info};

/// Delay between two passes over an unchanged StatefulMigration
pub const REQUEUE_INTERVAL: Duration = Duration::from_secs(300);

/// Where a StatefulMigration sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentPhase {
    /// No finalizer yet
    Unmanaged,
    /// Finalizer attached, converging every pass
    Active,
    /// Deletion requested
    Terminating,
}

impl IntentPhase {
    pub fn of(intent: &StatefulMigration) -> Self {
        if intent.is_terminating() {
            IntentPhase::Terminating
        } else if intent.has_finalizer() {
            IntentPhase::Active
        } else {
            IntentPhase::Unmanaged
        }
    }
}

impl Reconciler {
    /// Reconcile one StatefulMigration
    pub async fn reconcile_migration(&self, intent: &StatefulMigration) -> Result<Action, ControllerError> {
        let name = intent.metadata.name.as_deref().ok_or(ControllerError::MissingObjectKey("name"))?;
        let namespace = intent
            .metadata
            .namespace
            .as_deref()
            .ok_or(ControllerError::MissingObjectKey("namespace"))?;

        match IntentPhase::of(intent) {
            IntentPhase::Terminating => {
                if intent.has_finalizer() {
                    self.teardown(intent, namespace, name).await?;
                } else {
                    debug!("StatefulMigration {}/{} is terminating without our finalizer", namespace, name);
                }
                Ok(Action::await_change())
            }
            IntentPhase::Unmanaged => {
                let mut finalizers = intent.metadata.finalizers.clone().unwrap_or_default();
                finalizers.push(MIGRATION_BACKUP_FINALIZER.to_string());
                self.store
                    .set_migration_finalizers(namespace, name, intent.metadata.resource_version.as_deref(), finalizers)
                    .await?;
                info!("Added finalizer to StatefulMigration {}/{}", namespace, name);
                self.converge(intent, namespace, name).await
            }
            IntentPhase::Active => self.converge(intent, namespace, name).await,
        }
    }

    fn workload_context<'a>(&'a self, intent: &'a StatefulMigration, namespace: &'a str) -> WorkloadContext<'a> {
        WorkloadContext {
            store: self.store.as_ref(),
            federation: &self.federation,
            namespace: intent.spec.resource_ref.namespace_or(namespace),
            name: &intent.spec.resource_ref.name,
            clusters: &intent.spec.source_clusters,
        }
    }

    /// Full re-derivation of everything the intent owns
    async fn converge(&self, intent: &StatefulMigration, namespace: &str, name: &str) -> Result<Action, ControllerError> {
        let workload = self.workloads.get(&intent.spec.resource_ref.kind)?;
        let ctx = self.workload_context(intent, namespace);

        workload.add_label(&ctx).await?;
        let pods = workload.resolve_pods(&ctx).await?;
        debug!("StatefulMigration {}/{} resolved {} pods", namespace, name, pods.len());

        self.ensure_shared_namespace(&intent.spec.source_clusters).await?;
        self.bootstrap_member_clusters(namespace, &intent.spec.source_clusters)
            .await?;
        self.fan_out_backups(intent, &pods).await?;

        let removed = self.collect_orphans(namespace, name, &pods).await?;
        if removed > 0 {
            info!("Removed {} orphaned CheckpointBackups for {}/{}", removed, namespace, name);
        }

        Ok(Action::requeue(REQUEUE_INTERVAL))
    }

    /// Remove the label, every backup and finally the finalizer
    async fn teardown(&self, intent: &StatefulMigration, namespace: &str, name: &str) -> Result<(), ControllerError> {
        info!("Cleaning up StatefulMigration {}/{}", namespace, name);

        let workload = self.workloads.get(&intent.spec.resource_ref.kind)?;
        workload.remove_label(&self.workload_context(intent, namespace)).await?;

        for backup in self.store.list_backups(namespace, name).await? {
            if let Some(backup_name) = backup.metadata.name.as_deref() {
                self.delete_backup_and_policy(namespace, backup_name).await?;
            }
        }

        let finalizers: Vec<String> = intent
            .metadata
            .finalizers
            .iter()
            .flatten()
            .filter(|f| f.as_str() != MIGRATION_BACKUP_FINALIZER)
            .cloned()
            .collect();
        self.store
            .set_migration_finalizers(namespace, name, intent.metadata.resource_version.as_deref(), finalizers)
            .await?;
        info!("Removed finalizer from StatefulMigration {}/{}", namespace, name);
        Ok(())
    }
}
