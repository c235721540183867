//! Workload kinds
//!
//! A workload kind knows how to find its pods and how to carry the
//! `checkpoint-migration.dcn.io` ownership label. Kinds are looked up by
//! lower-cased name in a [`WorkloadRegistry`].

use crate::error::ControllerError;
use crate::reconciler::Federation;
use crate::store::MigrationStore;
use crds::{CHECKPOINT_MIGRATION_LABEL, Container};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::{ApiResource, DynamicObject, Selector};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// A pod found by discovery, recomputed on every pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodIdentity {
    pub namespace: String,
    pub name: String,
    /// Member cluster the pod was read from, when discovery went through the proxy
    pub cluster: Option<String>,
    pub containers: Vec<Container>,
}

impl PodIdentity {
    pub fn from_pod(pod: &Pod, default_namespace: &str, cluster: Option<&str>) -> Self {
        let containers = pod
            .spec
            .as_ref()
            .map(|spec| {
                spec.containers
                    .iter()
                    .map(|c| Container {
                        name: c.name.clone(),
                        image: c.image.clone().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_else(|| default_namespace.to_string()),
            name: pod.metadata.name.clone().unwrap_or_default(),
            cluster: cluster.map(str::to_string),
            containers,
        }
    }
}

/// Everything a workload kind needs to act on one StatefulMigration
pub struct WorkloadContext<'a> {
    pub store: &'a dyn MigrationStore,
    pub federation: &'a Federation,
    pub namespace: &'a str,
    pub name: &'a str,
    pub clusters: &'a [String],
}

/// Pod discovery and labelling for one workload kind
#[async_trait::async_trait]
pub trait WorkloadStrategy: Send + Sync {
    /// Current pods of the workload
    async fn resolve_pods(&self, ctx: &WorkloadContext<'_>) -> Result<Vec<PodIdentity>, ControllerError>;

    /// Set the ownership label; returns `true` when a write was issued
    async fn add_label(&self, ctx: &WorkloadContext<'_>) -> Result<bool, ControllerError>;

    /// Remove the ownership label; a missing workload is not an error
    async fn remove_label(&self, ctx: &WorkloadContext<'_>) -> Result<(), ControllerError>;
}

fn has_migration_label(labels: Option<&BTreeMap<String, String>>) -> bool {
    labels
        .and_then(|l| l.get(CHECKPOINT_MIGRATION_LABEL))
        .is_some_and(|v| v == "true")
}

/// Workloads whose pods are found through `spec.selector` on the local cluster
pub struct SelectorWorkload {
    resource: ApiResource,
}

impl SelectorWorkload {
    pub fn new(resource: ApiResource) -> Self {
        Self { resource }
    }

    pub fn stateful_set() -> Self {
        Self::new(ApiResource::erase::<StatefulSet>(&()))
    }

    pub fn deployment() -> Self {
        Self::new(ApiResource::erase::<Deployment>(&()))
    }

    fn selector(&self, workload: &DynamicObject, ctx: &WorkloadContext<'_>) -> Result<Selector, ControllerError> {
        let what = format!("{} {}/{}", self.resource.kind, ctx.namespace, ctx.name);
        let raw = workload
            .data
            .get("spec")
            .and_then(|spec| spec.get("selector"))
            .filter(|s| !s.is_null())
            .ok_or_else(|| ControllerError::MissingSelector(what.clone()))?;
        let label_selector: LabelSelector = serde_json::from_value(raw.clone())
            .map_err(|e| ControllerError::InvalidSelector(what.clone(), e.to_string()))?;
        Selector::try_from(label_selector).map_err(|e| ControllerError::InvalidSelector(what, e.to_string()))
    }
}

#[async_trait::async_trait]
impl WorkloadStrategy for SelectorWorkload {
    async fn resolve_pods(&self, ctx: &WorkloadContext<'_>) -> Result<Vec<PodIdentity>, ControllerError> {
        let workload = ctx.store.get_workload(&self.resource, ctx.namespace, ctx.name).await?;
        let selector = self.selector(&workload, ctx)?;
        let pods = ctx.store.list_pods(ctx.namespace, &selector).await?;
        debug!(
            "Resolved {} pods for {} {}/{}",
            pods.len(),
            self.resource.kind,
            ctx.namespace,
            ctx.name
        );
        Ok(pods.iter().map(|p| PodIdentity::from_pod(p, ctx.namespace, None)).collect())
    }

    async fn add_label(&self, ctx: &WorkloadContext<'_>) -> Result<bool, ControllerError> {
        let mut workload = ctx.store.get_workload(&self.resource, ctx.namespace, ctx.name).await?;
        if has_migration_label(workload.metadata.labels.as_ref()) {
            return Ok(false);
        }
        workload
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(CHECKPOINT_MIGRATION_LABEL.to_string(), "true".to_string());
        ctx.store.replace_workload(&self.resource, &workload).await?;
        info!("Labelled {} {}/{} for migration", self.resource.kind, ctx.namespace, ctx.name);
        Ok(true)
    }

    async fn remove_label(&self, ctx: &WorkloadContext<'_>) -> Result<(), ControllerError> {
        let mut workload = match ctx.store.get_workload(&self.resource, ctx.namespace, ctx.name).await {
            Ok(w) => w,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let removed = workload
            .metadata
            .labels
            .as_mut()
            .and_then(|labels| labels.remove(CHECKPOINT_MIGRATION_LABEL))
            .is_some();
        if removed {
            ctx.store.replace_workload(&self.resource, &workload).await?;
            info!("Removed migration label from {} {}/{}", self.resource.kind, ctx.namespace, ctx.name);
        }
        Ok(())
    }
}

/// A single pod living on member clusters, read through the Karmada proxy
pub struct RemotePod;

#[async_trait::async_trait]
impl WorkloadStrategy for RemotePod {
    async fn resolve_pods(&self, ctx: &WorkloadContext<'_>) -> Result<Vec<PodIdentity>, ControllerError> {
        let members = ctx
            .federation
            .members()
            .ok_or_else(|| ControllerError::MemberClusterUnavailable(format!("pod {}/{}", ctx.namespace, ctx.name)))?;

        let mut pods = Vec::new();
        for cluster in ctx.clusters {
            match members.get_pod(cluster, ctx.namespace, ctx.name).await {
                Ok(pod) => pods.push(PodIdentity::from_pod(&pod, ctx.namespace, Some(cluster))),
                Err(e) if e.is_not_found() => {
                    debug!("Pod {}/{} not found on cluster {}", ctx.namespace, ctx.name, cluster);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(pods)
    }

    /// Only the first source cluster is labelled
    async fn add_label(&self, ctx: &WorkloadContext<'_>) -> Result<bool, ControllerError> {
        let members = ctx
            .federation
            .members()
            .ok_or_else(|| ControllerError::MemberClusterUnavailable(format!("pod {}/{}", ctx.namespace, ctx.name)))?;
        let cluster = ctx
            .clusters
            .first()
            .ok_or_else(|| ControllerError::NoSourceClusters(format!("{}/{}", ctx.namespace, ctx.name)))?;

        let mut pod = members.get_pod(cluster, ctx.namespace, ctx.name).await?;
        if has_migration_label(pod.metadata.labels.as_ref()) {
            return Ok(false);
        }
        pod.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(CHECKPOINT_MIGRATION_LABEL.to_string(), "true".to_string());
        members.update_pod(cluster, &pod).await?;
        info!("Labelled pod {}/{} on cluster {} for migration", ctx.namespace, ctx.name, cluster);
        Ok(true)
    }

    /// Every source cluster is cleaned, pods missing on a cluster are skipped
    async fn remove_label(&self, ctx: &WorkloadContext<'_>) -> Result<(), ControllerError> {
        let Some(members) = ctx.federation.members() else {
            return Ok(());
        };
        for cluster in ctx.clusters {
            let mut pod = match members.get_pod(cluster, ctx.namespace, ctx.name).await {
                Ok(pod) => pod,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            let removed = pod
                .metadata
                .labels
                .as_mut()
                .and_then(|labels| labels.remove(CHECKPOINT_MIGRATION_LABEL))
                .is_some();
            if removed {
                members.update_pod(cluster, &pod).await?;
                info!("Removed migration label from pod {}/{} on cluster {}", ctx.namespace, ctx.name, cluster);
            }
        }
        Ok(())
    }
}

/// Workload strategies keyed by lower-cased kind
pub struct WorkloadRegistry {
    strategies: HashMap<String, Box<dyn WorkloadStrategy>>,
}

impl WorkloadRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// `StatefulSet`, `Deployment` and `Pod`
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("StatefulSet", SelectorWorkload::stateful_set());
        registry.register("Deployment", SelectorWorkload::deployment());
        registry.register("Pod", RemotePod);
        registry
    }

    pub fn register(&mut self, kind: &str, strategy: impl WorkloadStrategy + 'static) {
        self.strategies.insert(kind.to_lowercase(), Box::new(strategy));
    }

    pub fn get(&self, kind: &str) -> Result<&dyn WorkloadStrategy, ControllerError> {
        self.strategies
            .get(&kind.to_lowercase())
            .map(|s| s.as_ref())
            .ok_or_else(|| ControllerError::UnsupportedKind(kind.to_string()))
    }
}

impl Default for WorkloadRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
