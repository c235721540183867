//! PropagationPolicy (policy.karmada.io/v1alpha1)

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[kube(
    group = "policy.karmada.io",
    version = "v1alpha1",
    kind = "PropagationPolicy",
    plural = "propagationpolicies",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PropagationSpec {
    /// Resources this policy propagates
    pub resource_selectors: Vec<ResourceSelector>,

    /// Where the selected resources are propagated to
    #[serde(default)]
    pub placement: Placement,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    /// API version of the target resource
    pub api_version: String,

    /// Kind of the target resource
    pub kind: String,

    /// Namespace of the target resource (defaults to the policy namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Name of the target resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Restricts scheduling to a set of clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_affinity: Option<ClusterAffinity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAffinity {
    /// Member clusters eligible to receive the resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_names: Vec<String>,
}

impl PropagationSpec {
    /// Policy propagating exactly one named object to the given clusters
    ///
    /// `namespace` must be set for namespaced objects: Karmada's webhook
    /// fills it in with the policy namespace, and a selector stored that way
    /// has to compare equal to the one we build.
    pub fn for_object(
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
        clusters: Vec<String>,
    ) -> Self {
        Self {
            resource_selectors: vec![ResourceSelector {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
                namespace: namespace.map(str::to_string),
                name: Some(name.to_string()),
            }],
            placement: Placement {
                cluster_affinity: Some(ClusterAffinity {
                    cluster_names: clusters,
                }),
            },
        }
    }

    /// Cluster names the policy is restricted to
    pub fn cluster_names(&self) -> &[String] {
        self.placement
            .cluster_affinity
            .as_ref()
            .map(|a| a.cluster_names.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_object_binds_single_selector() {
        let spec = PropagationSpec::for_object(
            "migration.dcnlab.com/v1",
            "CheckpointBackup",
            Some("default"),
            "mig1-app-0-c1",
            vec!["c1".to_string()],
        );
        assert_eq!(spec.resource_selectors.len(), 1);
        assert_eq!(spec.resource_selectors[0].namespace.as_deref(), Some("default"));
        assert_eq!(spec.resource_selectors[0].name.as_deref(), Some("mig1-app-0-c1"));
        assert_eq!(spec.cluster_names(), ["c1".to_string()]);
    }

    #[test]
    fn test_unknown_karmada_fields_are_ignored() {
        let value = serde_json::json!({
            "resourceSelectors": [{"apiVersion": "v1", "kind": "Namespace", "name": "stateful-migration"}],
            "placement": {
                "clusterAffinity": {"clusterNames": ["c1", "c2"]},
                "replicaScheduling": {"replicaSchedulingType": "Duplicated"}
            },
            "conflictResolution": "Abort"
        });
        let spec: PropagationSpec = serde_json::from_value(value).unwrap();
        assert_eq!(spec.cluster_names().len(), 2);
    }
}
