//! PropagationPolicy client for the Karmada control plane

use crate::error::KarmadaError;
use crate::karmada_trait::PropagationClientTrait;
use crds::{PropagationPolicy, PropagationSpec};
use kube::api::{Api, DeleteParams, ListParams, ObjectMeta, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Build a client for the Karmada API server from a kubeconfig file
pub async fn karmada_client_from_kubeconfig(path: impl AsRef<Path>) -> Result<kube::Client, KarmadaError> {
    let path = path.as_ref();
    let kubeconfig = Kubeconfig::read_from(path)
        .map_err(|e| KarmadaError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| KarmadaError::Config(format!("invalid kubeconfig {}: {}", path.display(), e)))?;
    kube::Client::try_from(config).map_err(KarmadaError::Kube)
}

/// PropagationPolicy client backed by the Karmada API server
#[derive(Clone)]
pub struct PropagationClient {
    client: kube::Client,
}

impl PropagationClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<PropagationPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl PropagationClientTrait for PropagationClient {
    async fn test_connection(&self) -> Result<usize, KarmadaError> {
        let api: Api<PropagationPolicy> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default().limit(1)).await?;
        Ok(list.items.len())
    }

    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<PropagationPolicy>, KarmadaError> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create_policy(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
        spec: PropagationSpec,
    ) -> Result<PropagationPolicy, KarmadaError> {
        let policy = PropagationPolicy {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            spec,
        };
        debug!("Creating PropagationPolicy {}/{}", namespace, name);
        Ok(self.api(namespace).create(&PostParams::default(), &policy).await?)
    }

    async fn replace_policy(&self, policy: &PropagationPolicy) -> Result<PropagationPolicy, KarmadaError> {
        let namespace = policy
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| KarmadaError::Api("policy has no namespace".to_string()))?;
        let name = policy
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| KarmadaError::Api("policy has no name".to_string()))?;
        debug!("Replacing PropagationPolicy {}/{}", namespace, name);
        self.api(namespace)
            .replace(name, &PostParams::default(), policy)
            .await
            .map_err(|e| KarmadaError::from_kube(e, format!("PropagationPolicy {}/{}", namespace, name)))
    }

    async fn delete_policy(&self, namespace: &str, name: &str) -> Result<(), KarmadaError> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| KarmadaError::from_kube(e, format!("PropagationPolicy {}/{}", namespace, name)))
    }
}
