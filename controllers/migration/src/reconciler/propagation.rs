//! PropagationPolicy management
//!
//! Policies are not owned by the StatefulMigration, so they are never
//! garbage collected and are deleted explicitly alongside their backup.

use super::Reconciler;
use crate::error::ControllerError;
use crds::{KARMADA_SYSTEM_LABEL_PREFIXES, PropagationPolicy, PropagationSpec};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Created,
    Replaced,
    Unchanged,
    /// Karmada is unavailable
    Skipped,
}

fn is_karmada_label(key: &str) -> bool {
    KARMADA_SYSTEM_LABEL_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// Desired labels plus the Karmada-owned labels already on the stored policy
pub fn merge_labels(existing: Option<&BTreeMap<String, String>>, desired: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut merged = desired.clone();
    if let Some(existing) = existing {
        for (key, value) in existing {
            if is_karmada_label(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

impl Reconciler {
    /// Create the policy, or replace it when spec or labels drifted
    pub(crate) async fn upsert_policy(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
        spec: PropagationSpec,
    ) -> Result<PolicyOutcome, ControllerError> {
        let Some(policies) = self.federation.policies() else {
            debug!("Karmada unavailable, skipping PropagationPolicy {}/{}", namespace, name);
            return Ok(PolicyOutcome::Skipped);
        };

        let Some(existing) = policies.get_policy(namespace, name).await? else {
            policies.create_policy(namespace, name, labels, spec).await?;
            self.metrics.policy_applied();
            info!("Created PropagationPolicy {}/{}", namespace, name);
            return Ok(PolicyOutcome::Created);
        };

        let merged = merge_labels(existing.metadata.labels.as_ref(), &labels);
        let current_labels = existing.metadata.labels.clone().unwrap_or_default();
        if existing.spec == spec && current_labels == merged {
            debug!("PropagationPolicy {}/{} is up to date", namespace, name);
            return Ok(PolicyOutcome::Unchanged);
        }

        let replacement = PropagationPolicy {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(merged),
                resource_version: existing.metadata.resource_version.clone(),
                ..Default::default()
            },
            spec,
        };
        policies.replace_policy(&replacement).await?;
        self.metrics.policy_applied();
        info!("Updated PropagationPolicy {}/{}", namespace, name);
        Ok(PolicyOutcome::Replaced)
    }

    /// Create the policy only when absent; an existing one is left untouched
    pub(crate) async fn create_policy_if_absent(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
        spec: PropagationSpec,
    ) -> Result<PolicyOutcome, ControllerError> {
        let Some(policies) = self.federation.policies() else {
            debug!("Karmada unavailable, skipping PropagationPolicy {}/{}", namespace, name);
            return Ok(PolicyOutcome::Skipped);
        };

        if policies.get_policy(namespace, name).await?.is_some() {
            debug!("PropagationPolicy {}/{} already exists", namespace, name);
            return Ok(PolicyOutcome::Unchanged);
        }
        policies.create_policy(namespace, name, labels, spec).await?;
        self.metrics.policy_applied();
        info!("Created PropagationPolicy {}/{}", namespace, name);
        Ok(PolicyOutcome::Created)
    }

    /// Delete a policy; returns whether it existed
    pub(crate) async fn delete_policy(&self, namespace: &str, name: &str) -> Result<bool, ControllerError> {
        let Some(policies) = self.federation.policies() else {
            return Ok(false);
        };
        match policies.delete_policy(namespace, name).await {
            Ok(()) => {
                info!("Deleted PropagationPolicy {}/{}", namespace, name);
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
