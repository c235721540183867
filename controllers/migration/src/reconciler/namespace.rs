//! Shared namespace and member cluster bootstrap

use super::Reconciler;
use crate::error::ControllerError;
use crate::store::StoreError;
use crds::{CREATED_BY, PropagationSpec, SHARED_NAMESPACE};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// PropagationPolicy distributing the shared namespace
pub const NAMESPACE_POLICY_NAME: &str = "stateful-migration-propagation";

fn shared_namespace_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("created-by".to_string(), CREATED_BY.to_string()),
        ("app.kubernetes.io/name".to_string(), SHARED_NAMESPACE.to_string()),
        ("app.kubernetes.io/part-of".to_string(), CREATED_BY.to_string()),
    ])
}

impl Reconciler {
    /// Create the shared namespace locally and its PropagationPolicy if missing
    pub(crate) async fn ensure_shared_namespace(&self, clusters: &[String]) -> Result<(), ControllerError> {
        if self.store.get_namespace(SHARED_NAMESPACE).await?.is_none() {
            let namespace = Namespace {
                metadata: ObjectMeta {
                    name: Some(SHARED_NAMESPACE.to_string()),
                    labels: Some(shared_namespace_labels()),
                    ..Default::default()
                },
                ..Default::default()
            };
            match self.store.create_namespace(&namespace).await {
                Ok(_) => info!("Created namespace {}", SHARED_NAMESPACE),
                // Another worker won the race
                Err(StoreError::Conflict(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut labels = shared_namespace_labels();
        labels.insert("resource-type".to_string(), "namespace".to_string());
        let spec = PropagationSpec::for_object("v1", "Namespace", None, SHARED_NAMESPACE, clusters.to_vec());
        self.create_policy_if_absent(SHARED_NAMESPACE, NAMESPACE_POLICY_NAME, labels, spec)
            .await?;
        Ok(())
    }

    /// Make sure each member cluster has the intent namespace and the
    /// CheckpointBackup CRD; skipped when Karmada is unavailable
    pub(crate) async fn bootstrap_member_clusters(&self, namespace: &str, clusters: &[String]) -> Result<(), ControllerError> {
        let Some(members) = self.federation.members() else {
            debug!("Karmada unavailable, skipping member cluster bootstrap");
            return Ok(());
        };
        for cluster in clusters {
            if members.ensure_namespace(cluster, namespace).await? {
                info!("Created namespace {} on cluster {}", namespace, cluster);
            }
            if let Some(origin) = members.ensure_crd(cluster).await? {
                info!("Installed CheckpointBackup CRD on cluster {} from {}", cluster, origin);
            }
        }
        Ok(())
    }
}
