//! Reconciliation logic for StatefulMigration.
//!
//! The reconciler is split by concern, each file adding methods to
//! [`Reconciler`]:
//! - `lifecycle`: finalizer handling and normal/delete branching
//! - `workload`: pod discovery and ownership labelling per workload kind
//! - `namespace`: shared namespace and member cluster bootstrap
//! - `fanout`: CheckpointBackup create-or-replace per (pod, cluster)
//! - `orphans`: removal of backups whose pod is gone
//! - `propagation`: PropagationPolicy upsert and delete

pub mod fanout;
pub mod lifecycle;
pub mod namespace;
pub mod orphans;
pub mod propagation;
pub mod workload;

#[cfg(test)]
mod lifecycle_test;

use crate::backoff::BackoffStates;
use crate::metrics::Metrics;
use crate::store::MigrationStore;
use karmada_client::{MemberClusterClientTrait, PropagationClientTrait};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use workload::WorkloadRegistry;

pub use lifecycle::{IntentPhase, REQUEUE_INTERVAL};
pub use workload::PodIdentity;

/// Access to the Karmada control plane, decided once at startup
#[derive(Clone)]
pub enum Federation {
    Connected {
        policies: Arc<dyn PropagationClientTrait>,
        members: Arc<dyn MemberClusterClientTrait>,
    },
    /// Karmada was unreachable; policy work is skipped and member cluster
    /// access fails
    Unavailable,
}

impl Federation {
    pub fn policies(&self) -> Option<&dyn PropagationClientTrait> {
        match self {
            Federation::Connected { policies, .. } => Some(policies.as_ref()),
            Federation::Unavailable => None,
        }
    }

    pub fn members(&self) -> Option<&dyn MemberClusterClientTrait> {
        match self {
            Federation::Connected { members, .. } => Some(members.as_ref()),
            Federation::Unavailable => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Federation::Connected { .. })
    }
}

/// Reconciles StatefulMigration resources.
pub struct Reconciler {
    pub(crate) store: Arc<dyn MigrationStore>,
    pub(crate) federation: Federation,
    pub(crate) workloads: WorkloadRegistry,
    pub(crate) metrics: Arc<Metrics>,
    /// Error backoff per StatefulMigration (namespace/name)
    backoff_states: BackoffStates,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn MigrationStore>,
        federation: Federation,
        workloads: WorkloadRegistry,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            federation,
            workloads,
            metrics,
            backoff_states: BackoffStates::default(),
        }
    }

    /// Requeue delay after a failed reconcile of `resource_key`
    pub fn backoff_after_error(&self, resource_key: &str) -> Duration {
        let (delay, error_count) = self.backoff_states.record_error(resource_key);
        if error_count > 1 {
            warn!(
                "StatefulMigration {} failed {} times in a row, retrying in {}s",
                resource_key,
                error_count,
                delay.as_secs()
            );
        }
        delay
    }

    /// Reset the error backoff of `resource_key` after a successful reconcile
    pub fn reset_backoff(&self, resource_key: &str) {
        self.backoff_states.reset(resource_key);
    }
}
