//! StatefulMigration watcher.
//!
//! Drives [`Reconciler::reconcile_migration`] from a kube_runtime Controller.
//! CheckpointBackups are watched as owned objects, so deleting or editing one
//! by hand requeues its StatefulMigration.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{CheckpointBackup, StatefulMigration};
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Wait this long after the last event before reconciling
const DEBOUNCE: Duration = Duration::from_secs(5);

fn resource_key(migration: &StatefulMigration) -> String {
    format!("{}/{}", migration.namespace().unwrap_or_default(), migration.name_any())
}

async fn reconcile(migration: Arc<StatefulMigration>, reconciler: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let key = resource_key(&migration);
    debug!("Reconciling StatefulMigration {}", key);

    match reconciler.reconcile_migration(&migration).await {
        Ok(action) => {
            reconciler.reset_backoff(&key);
            reconciler.metrics.reconcile_succeeded();
            Ok(action)
        }
        Err(e) => {
            reconciler.metrics.reconcile_failed();
            Err(e)
        }
    }
}

fn error_policy(migration: Arc<StatefulMigration>, error: &ControllerError, reconciler: Arc<Reconciler>) -> Action {
    let key = resource_key(&migration);
    error!("Reconciliation error for StatefulMigration {}: {}", key, error);
    Action::requeue(reconciler.backoff_after_error(&key))
}

/// Watches StatefulMigrations and their CheckpointBackups.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    migrations: Api<StatefulMigration>,
    backups: Api<CheckpointBackup>,
    concurrency: u16,
}

impl Watcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        migrations: Api<StatefulMigration>,
        backups: Api<CheckpointBackup>,
        concurrency: u16,
    ) -> Self {
        Self {
            reconciler,
            migrations,
            backups,
            concurrency,
        }
    }

    /// Run until the watch stream ends
    pub async fn watch_migrations(self) -> Result<(), ControllerError> {
        info!("Starting StatefulMigration watcher (concurrency {})", self.concurrency);

        let config = ControllerConfig::default()
            .debounce(DEBOUNCE)
            .concurrency(self.concurrency);

        Controller::new(self.migrations, watcher::Config::default())
            .owns(self.backups, watcher::Config::default())
            .with_config(config)
            .run(reconcile, error_policy, self.reconciler)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled StatefulMigration {}/{}", obj.namespace.as_deref().unwrap_or_default(), obj.name),
                    Err(e) => error!("StatefulMigration controller error: {}", e),
                }
            })
            .await;

        Err(ControllerError::Watch("StatefulMigration watch stream ended".to_string()))
    }
}
