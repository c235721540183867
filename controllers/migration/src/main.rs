//! Stateful Migration Controller
//!
//! Turns each StatefulMigration into one CheckpointBackup per (pod, member
//! cluster) pair and keeps the set in sync with the workload's pods. Backups
//! reach their member cluster through Karmada PropagationPolicies.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod restore;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::Federation;
use controller::Controller;
use karmada_client::{
    CrdSource, MemberClusterClient, PropagationClient, PropagationClientTrait, karmada_client_from_kubeconfig,
};
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Connect to Karmada and check it answers; any failure means degraded mode
async fn connect_federation(config: &Config) -> Federation {
    let client = match karmada_client_from_kubeconfig(&config.karmada_kubeconfig).await {
        Ok(client) => client,
        Err(e) => {
            warn!(
                "Failed to load Karmada kubeconfig {}: {}",
                config.karmada_kubeconfig.display(),
                e
            );
            return Federation::Unavailable;
        }
    };

    let policies = PropagationClient::new(client.clone());
    if let Err(e) = policies.test_connection().await {
        warn!("Karmada control plane is unreachable: {}", e);
        return Federation::Unavailable;
    }
    info!("Connected to Karmada control plane");

    let members = MemberClusterClient::new(client, CrdSource::new(config.crd_search_paths.clone()));
    Federation::Connected {
        policies: Arc::new(policies),
        members: Arc::new(members),
    }
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube's rustls-tls needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting StatefulMigration controller");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Karmada kubeconfig: {}", config.karmada_kubeconfig.display());
    info!("  Max concurrent reconciles: {}", config.max_concurrent_reconciles);
    info!("  Probe address: {}", config.probe_bind_address);

    let client = Client::try_default().await?;
    let federation = connect_federation(&config).await;

    let controller = Controller::start(&config, client, federation)?;
    controller.run().await?;

    Ok(())
}
