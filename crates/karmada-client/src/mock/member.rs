//! Mock member cluster client

use super::WriteLog;
use crate::crd_source::CrdOrigin;
use crate::error::KarmadaError;
use crate::karmada_trait::MemberClusterClientTrait;
use k8s_openapi::api::core::v1::Pod;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

type PodKey = (String, String, String);

/// Mock member cluster client
///
/// Pods are keyed by `(cluster, namespace, name)`. Clusters marked
/// unreachable fail every call with [`KarmadaError::Api`].
#[derive(Clone, Default)]
pub struct MockMemberClusterClient {
    pods: Arc<Mutex<HashMap<PodKey, Pod>>>,
    namespaces: Arc<Mutex<HashSet<(String, String)>>>,
    crds: Arc<Mutex<HashSet<String>>>,
    unreachable: Arc<Mutex<HashSet<String>>>,
    writes: WriteLog,
}

impl MockMemberClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pod on a cluster (for test setup)
    pub fn add_pod(&self, cluster: &str, pod: Pod) {
        let key = (
            cluster.to_string(),
            pod.metadata.namespace.clone().unwrap_or_else(|| "default".to_string()),
            pod.metadata.name.clone().unwrap_or_default(),
        );
        self.pods.lock().unwrap().insert(key, pod);
    }

    /// Current copy of a pod, if present
    pub fn pod(&self, cluster: &str, namespace: &str, name: &str) -> Option<Pod> {
        self.pods
            .lock()
            .unwrap()
            .get(&(cluster.to_string(), namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Seed an existing namespace (for test setup)
    pub fn add_namespace(&self, cluster: &str, name: &str) {
        self.namespaces.lock().unwrap().insert((cluster.to_string(), name.to_string()));
    }

    pub fn has_namespace(&self, cluster: &str, name: &str) -> bool {
        self.namespaces.lock().unwrap().contains(&(cluster.to_string(), name.to_string()))
    }

    /// Mark the CheckpointBackup CRD as installed (for test setup)
    pub fn add_crd(&self, cluster: &str) {
        self.crds.lock().unwrap().insert(cluster.to_string());
    }

    pub fn has_crd(&self, cluster: &str) -> bool {
        self.crds.lock().unwrap().contains(cluster)
    }

    /// Make every call against `cluster` fail
    pub fn set_unreachable(&self, cluster: &str) {
        self.unreachable.lock().unwrap().insert(cluster.to_string());
    }

    /// Mutating calls in order, e.g. `update_pod c1 default/app-0`
    pub fn writes(&self) -> Vec<String> {
        self.writes.entries()
    }

    pub fn clear_writes(&self) {
        self.writes.clear();
    }

    fn check_reachable(&self, cluster: &str) -> Result<(), KarmadaError> {
        if self.unreachable.lock().unwrap().contains(cluster) {
            return Err(KarmadaError::Api(format!("cluster {} is unreachable", cluster)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MemberClusterClientTrait for MockMemberClusterClient {
    async fn get_pod(&self, cluster: &str, namespace: &str, name: &str) -> Result<Pod, KarmadaError> {
        self.check_reachable(cluster)?;
        self.pod(cluster, namespace, name)
            .ok_or_else(|| KarmadaError::NotFound(format!("pod {}/{} on cluster {}", namespace, name, cluster)))
    }

    async fn list_pods(&self, cluster: &str, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>, KarmadaError> {
        self.check_reachable(cluster)?;
        // Only equality selectors (`k=v,k2=v2`) are understood by the mock
        let wanted: Vec<(&str, &str)> = label_selector
            .map(|s| s.split(',').filter_map(|pair| pair.split_once('=')).collect())
            .unwrap_or_default();
        let mut pods: Vec<Pod> = self
            .pods
            .lock()
            .unwrap()
            .iter()
            .filter(|((c, ns, _), _)| c == cluster && ns == namespace)
            .map(|(_, pod)| pod)
            .filter(|pod| {
                let labels = pod.metadata.labels.clone().unwrap_or_default();
                wanted.iter().all(|(k, v)| labels.get(*k).map(String::as_str) == Some(*v))
            })
            .cloned()
            .collect();
        pods.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(pods)
    }

    async fn update_pod(&self, cluster: &str, pod: &Pod) -> Result<Pod, KarmadaError> {
        self.check_reachable(cluster)?;
        let namespace = pod.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = pod.metadata.name.clone().unwrap_or_default();
        let key = (cluster.to_string(), namespace.clone(), name.clone());

        let mut pods = self.pods.lock().unwrap();
        let stored = pods
            .get(&key)
            .ok_or_else(|| KarmadaError::NotFound(format!("pod {}/{} on cluster {}", namespace, name, cluster)))?;
        if stored.metadata.resource_version != pod.metadata.resource_version {
            return Err(KarmadaError::Api(format!("conflict updating pod {}/{}", namespace, name)));
        }

        let next = stored
            .metadata
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let mut updated = pod.clone();
        updated.metadata.resource_version = Some(next.to_string());
        pods.insert(key, updated.clone());
        self.writes.record(format!("update_pod {} {}/{}", cluster, namespace, name));
        Ok(updated)
    }

    async fn ensure_namespace(&self, cluster: &str, name: &str) -> Result<bool, KarmadaError> {
        self.check_reachable(cluster)?;
        let created = self.namespaces.lock().unwrap().insert((cluster.to_string(), name.to_string()));
        if created {
            self.writes.record(format!("create_namespace {} {}", cluster, name));
        }
        Ok(created)
    }

    async fn ensure_crd(&self, cluster: &str) -> Result<Option<CrdOrigin>, KarmadaError> {
        self.check_reachable(cluster)?;
        if self.crds.lock().unwrap().insert(cluster.to_string()) {
            self.writes.record(format!("create_crd {}", cluster));
            return Ok(Some(CrdOrigin::BuiltIn));
        }
        Ok(None)
    }
}
