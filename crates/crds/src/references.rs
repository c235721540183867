//! Shared reference and configuration types
//!
//! Value types embedded in more than one migration CRD: workload and pod
//! references, registry configuration and container image descriptions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to the workload being migrated
///
/// The `kind` field selects how pods are discovered and labelled
/// (`StatefulSet`, `Deployment` or `Pod`, matched case-insensitively).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    /// API version of the referenced resource (e.g., "apps/v1")
    pub api_version: String,

    /// Kind of the referenced resource (e.g., "StatefulSet")
    pub kind: String,

    /// Namespace of the referenced resource (defaults to the namespace of the referencing resource)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Name of the referenced resource
    pub name: String,
}

impl ResourceRef {
    /// Namespace of the workload, falling back to `default_namespace`
    pub fn namespace_or<'a>(&'a self, default_namespace: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default_namespace)
    }
}

/// Reference to a single pod
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodRef {
    /// Namespace of the pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Name of the pod
    pub name: String,
}

/// Reference to a CheckpointBackup
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackupRef {
    /// Name of the CheckpointBackup
    pub name: String,
}

/// Reference to a Secret in the same namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    /// Name of the Secret
    pub name: String,
}

/// Container registry that checkpoint images are pushed to
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Registry URL (e.g., "registry.example.com")
    pub url: String,

    /// Repository path inside the registry
    pub repository: String,

    /// Credentials for the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
}

/// Container name and image pair captured from a pod
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,

    /// Container image
    pub image: String,
}
