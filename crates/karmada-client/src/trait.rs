//! Client traits for mocking
//!
//! The reconciler only talks to Karmada through these traits. The concrete
//! clients implement them against a live control plane, and tests use the
//! in-memory mocks from the `test-util` feature.

use crate::crd_source::CrdOrigin;
use crate::error::KarmadaError;
use crds::{PropagationPolicy, PropagationSpec};
use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

/// Operations against a member cluster through the aggregated proxy
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait MemberClusterClientTrait: Send + Sync {
    /// Fetch a pod; a missing pod is [`KarmadaError::NotFound`]
    async fn get_pod(&self, cluster: &str, namespace: &str, name: &str) -> Result<Pod, KarmadaError>;

    /// List pods, optionally filtered by a label selector string
    ///
    /// Part of the proxy surface next to get/update; discovery itself reads
    /// pods one at a time by name, so no reconcile step lists them.
    async fn list_pods(&self, cluster: &str, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>, KarmadaError>;

    /// Replace a pod (full object, optimistic concurrency on resourceVersion)
    async fn update_pod(&self, cluster: &str, pod: &Pod) -> Result<Pod, KarmadaError>;

    /// Create the namespace on the member cluster unless it already exists
    ///
    /// Returns `true` when the namespace was created.
    async fn ensure_namespace(&self, cluster: &str, name: &str) -> Result<bool, KarmadaError>;

    /// Install the CheckpointBackup CRD on the member cluster unless present
    ///
    /// Returns the definition source when the CRD was installed, `None` when
    /// it already existed.
    async fn ensure_crd(&self, cluster: &str) -> Result<Option<CrdOrigin>, KarmadaError>;
}

/// PropagationPolicy operations on the Karmada control plane
#[async_trait::async_trait]
pub trait PropagationClientTrait: Send + Sync {
    /// Verify the control plane answers; returns the number of policies seen
    async fn test_connection(&self) -> Result<usize, KarmadaError>;

    /// Fetch a policy, `None` when absent
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<PropagationPolicy>, KarmadaError>;

    /// Create a new policy
    async fn create_policy(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
        spec: PropagationSpec,
    ) -> Result<PropagationPolicy, KarmadaError>;

    /// Replace an existing policy; `policy` must carry the current resourceVersion
    async fn replace_policy(&self, policy: &PropagationPolicy) -> Result<PropagationPolicy, KarmadaError>;

    /// Delete a policy; a missing policy is [`KarmadaError::NotFound`]
    async fn delete_policy(&self, namespace: &str, name: &str) -> Result<(), KarmadaError>;
}
