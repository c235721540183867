//! Member cluster client
//!
//! Talks to member clusters through Karmada's aggregated cluster proxy, so a
//! single Karmada kubeconfig is enough to reach every cluster.

use crate::crd_source::{CrdOrigin, CrdSource};
use crate::error::KarmadaError;
use crate::karmada_trait::MemberClusterClientTrait;
use crate::proxy::{CRDS_PATH, NAMESPACES_PATH, crd_path, namespace_path, pod_path, proxy_path, with_query};
use crds::{CHECKPOINT_BACKUP_CRD_NAME, CREATED_BY};
use k8s_openapi::List;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::ObjectMeta;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Member cluster client backed by the Karmada proxy
#[derive(Clone)]
pub struct MemberClusterClient {
    client: kube::Client,
    crd_source: CrdSource,
}

impl MemberClusterClient {
    pub fn new(client: kube::Client, crd_source: CrdSource) -> Self {
        Self { client, crd_source }
    }

    async fn get<T: DeserializeOwned>(&self, cluster: &str, remote_path: &str, what: &str) -> Result<T, KarmadaError> {
        let request = http::Request::get(proxy_path(cluster, remote_path)).body(Vec::new())?;
        self.client
            .request::<T>(request)
            .await
            .map_err(|e| KarmadaError::from_kube(e, format!("{} on cluster {}", what, cluster)))
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: http::Method,
        uri: String,
        body: &B,
    ) -> Result<T, KarmadaError> {
        let request = http::Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?)?;
        Ok(self.client.request::<T>(request).await?)
    }
}

#[async_trait::async_trait]
impl MemberClusterClientTrait for MemberClusterClient {
    async fn get_pod(&self, cluster: &str, namespace: &str, name: &str) -> Result<Pod, KarmadaError> {
        self.get(cluster, &pod_path(namespace, name), &format!("pod {}/{}", namespace, name))
            .await
    }

    async fn list_pods(&self, cluster: &str, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>, KarmadaError> {
        let mut params = Vec::new();
        if let Some(selector) = label_selector {
            params.push(("labelSelector", selector));
        }
        let path = with_query(format!("api/v1/namespaces/{}/pods", namespace), &params);
        let list: List<Pod> = self.get(cluster, &path, &format!("namespace {}", namespace)).await?;
        Ok(list.items)
    }

    async fn update_pod(&self, cluster: &str, pod: &Pod) -> Result<Pod, KarmadaError> {
        let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");
        let name = pod
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| KarmadaError::Api("pod has no name".to_string()))?;
        let uri = proxy_path(cluster, &pod_path(namespace, name));
        self.send(http::Method::PUT, uri, pod).await.map_err(|e| match e {
            KarmadaError::Kube(err) => KarmadaError::from_kube(err, format!("pod {}/{} on cluster {}", namespace, name, cluster)),
            other => other,
        })
    }

    async fn ensure_namespace(&self, cluster: &str, name: &str) -> Result<bool, KarmadaError> {
        match self
            .get::<Namespace>(cluster, &namespace_path(name), &format!("namespace {}", name))
            .await
        {
            Ok(_) => return Ok(false),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([
                    ("created-by".to_string(), CREATED_BY.to_string()),
                    ("cluster".to_string(), cluster.to_string()),
                ])),
                ..Default::default()
            },
            ..Default::default()
        };
        let uri = proxy_path(cluster, NAMESPACES_PATH);
        match self.send::<_, Namespace>(http::Method::POST, uri, &namespace).await {
            Ok(_) => {
                info!("Created namespace {} on cluster {}", name, cluster);
                Ok(true)
            }
            Err(KarmadaError::Kube(ref err)) if KarmadaError::is_conflict(err) => {
                debug!("Namespace {} on cluster {} created concurrently", name, cluster);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_crd(&self, cluster: &str) -> Result<Option<CrdOrigin>, KarmadaError> {
        match self
            .get::<CustomResourceDefinition>(cluster, &crd_path(CHECKPOINT_BACKUP_CRD_NAME), "CheckpointBackup CRD")
            .await
        {
            Ok(_) => return Ok(None),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let (crd, origin) = self.crd_source.load().await?;
        let uri = proxy_path(cluster, CRDS_PATH);
        match self
            .send::<_, CustomResourceDefinition>(http::Method::POST, uri, &crd)
            .await
        {
            Ok(_) => {
                info!("Installed CheckpointBackup CRD on cluster {} from {}", cluster, origin);
                Ok(Some(origin))
            }
            Err(KarmadaError::Kube(ref err)) if KarmadaError::is_conflict(err) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
