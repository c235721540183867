//! Main controller implementation.
//!
//! Builds the reconciler from the local client and the Karmada federation
//! and runs the backup watcher, the restore watcher and the probe server
//! side by side.

use crate::config::Config;
use crate::error::ControllerError;
use crate::metrics::{self, Metrics};
use crate::reconciler::workload::WorkloadRegistry;
use crate::reconciler::{Federation, Reconciler};
use crate::restore;
use crate::store::KubeMigrationStore;
use crate::watcher::Watcher;
use crds::{CheckpointBackup, StatefulMigration};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

fn namespaced_or_all<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = kube::core::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Main controller for StatefulMigration resources.
pub struct Controller {
    backup_watcher: JoinHandle<Result<(), ControllerError>>,
    restore_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates the controller and starts all of its tasks.
    pub fn start(config: &Config, client: Client, federation: Federation) -> Result<Self, ControllerError> {
        info!("Initializing StatefulMigration controller");
        if !federation.is_connected() {
            info!("Running without Karmada: policies and member cluster bootstrap are skipped");
        }

        let metrics = Arc::new(Metrics::new()?);
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(KubeMigrationStore::new(client.clone())),
            federation,
            WorkloadRegistry::with_defaults(),
            Arc::clone(&metrics),
        ));

        let namespace = config.watch_namespace.as_deref();
        let watcher = Watcher::new(
            reconciler,
            namespaced_or_all::<StatefulMigration>(&client, namespace),
            namespaced_or_all::<CheckpointBackup>(&client, namespace),
            config.max_concurrent_reconciles,
        );
        let backup_watcher = tokio::spawn(watcher.watch_migrations());

        let restore_watcher = tokio::spawn(restore::watch_restores(namespaced_or_all::<StatefulMigration>(
            &client, namespace,
        )));

        let probe_server = tokio::spawn(metrics::serve_probes(config.probe_bind_address, metrics));

        Ok(Self {
            backup_watcher,
            restore_watcher,
            probe_server,
        })
    }

    /// Runs until one of the tasks exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("StatefulMigration controller running");

        let (task, result) = tokio::select! {
            result = &mut self.backup_watcher => ("backup watcher", result),
            result = &mut self.restore_watcher => ("restore watcher", result),
            result = &mut self.probe_server => ("probe server", result),
        };

        match result {
            Ok(Ok(())) => {
                info!("{} exited", task);
                Ok(())
            }
            Ok(Err(e)) => {
                error!("{} failed: {}", task, e);
                Err(e)
            }
            Err(e) => {
                error!("{} panicked: {}", task, e);
                Err(ControllerError::Watch(format!("{} task failed: {}", task, e)))
            }
        }
    }
}
