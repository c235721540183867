//! Restore side of the migration.
//!
//! Only acknowledges StatefulMigrations for now; restoring checkpoints on
//! the destination cluster is driven by CheckpointRestore objects that no
//! component creates yet.

use crate::error::ControllerError;
use crds::StatefulMigration;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Log receipt of a StatefulMigration
pub fn acknowledge(migration: &StatefulMigration) -> Action {
    info!(
        "Restore controller received StatefulMigration {}/{}",
        migration.namespace().unwrap_or_default(),
        migration.name_any()
    );
    Action::await_change()
}

async fn reconcile(migration: Arc<StatefulMigration>, _ctx: Arc<()>) -> Result<Action, ControllerError> {
    Ok(acknowledge(&migration))
}

fn error_policy(_migration: Arc<StatefulMigration>, error: &ControllerError, _ctx: Arc<()>) -> Action {
    error!("Restore reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}

/// Run the restore watcher until the watch stream ends
pub async fn watch_restores(migrations: Api<StatefulMigration>) -> Result<(), ControllerError> {
    info!("Starting restore watcher");

    Controller::new(migrations, watcher::Config::default())
        .run(reconcile, error_policy, Arc::new(()))
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Restore controller error: {}", e);
            }
        })
        .await;

    Err(ControllerError::Watch("restore watch stream ended".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_migration;

    #[test]
    fn test_acknowledge_never_requeues() {
        let migration = create_test_migration("mig1", "default", "StatefulSet", "app", &["c1"]);
        assert_eq!(acknowledge(&migration), Action::await_change());
    }
}
