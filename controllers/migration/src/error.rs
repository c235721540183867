//! Controller-specific error types.
//!
//! Wraps the local store and Karmada client errors and adds the failures
//! that only the reconciler can detect.

use crate::store::StoreError;
use karmada_client::KarmadaError;
use thiserror::Error;

/// Errors that can occur in the migration controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error outside the store (client construction, watches)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Local cluster store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Karmada or member cluster error
    #[error("Karmada error: {0}")]
    Karmada(#[from] KarmadaError),

    /// The workload kind has no registered strategy
    #[error("Unsupported resource kind: {0}")]
    UnsupportedKind(String),

    /// The workload selector cannot be turned into a label selector
    #[error("Invalid selector on {0}: {1}")]
    InvalidSelector(String, String),

    /// The workload has no `spec.selector`
    #[error("Workload {0} has no selector")]
    MissingSelector(String),

    /// A `Pod` workload needs at least one source cluster
    #[error("No source clusters specified for pod {0}")]
    NoSourceClusters(String),

    /// Member cluster access was needed but Karmada is unavailable
    #[error("Member cluster client unavailable: {0}")]
    MemberClusterUnavailable(String),

    /// An object is missing its name or namespace
    #[error("Object is missing {0}")]
    MissingObjectKey(&'static str),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe server I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    /// Whether the underlying cause is a missing object
    pub fn is_not_found(&self) -> bool {
        match self {
            ControllerError::Store(e) => e.is_not_found(),
            ControllerError::Karmada(e) => e.is_not_found(),
            ControllerError::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }
}
