//! Karmada client errors

use thiserror::Error;

/// Errors that can occur when talking to the Karmada control plane or,
/// through its aggregated proxy, to a member cluster
#[derive(Debug, Error)]
pub enum KarmadaError {
    /// Kubernetes client error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource not found (locally or on the member cluster)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API server rejected the request
    #[error("Karmada API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed HTTP request
    #[error("HTTP request error: {0}")]
    Http(#[from] http::Error),

    /// Kubeconfig could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable CheckpointBackup CRD definition
    #[error("CRD definition error: {0}")]
    CrdDefinition(String),
}

impl KarmadaError {
    /// Whether the error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, KarmadaError::NotFound(_))
    }

    /// Maps a kube error, turning a 404 into [`KarmadaError::NotFound`]
    pub(crate) fn from_kube(err: kube::Error, what: impl Into<String>) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => KarmadaError::NotFound(what.into()),
            other => KarmadaError::Kube(other),
        }
    }

    /// Whether the kube error is a 409 AlreadyExists/Conflict
    pub(crate) fn is_conflict(err: &kube::Error) -> bool {
        matches!(err, kube::Error::Api(ae) if ae.code == 409)
    }
}
