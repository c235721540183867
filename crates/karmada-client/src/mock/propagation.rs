//! Mock PropagationPolicy client

use super::WriteLog;
use crate::error::KarmadaError;
use crate::karmada_trait::PropagationClientTrait;
use crds::{PropagationPolicy, PropagationSpec};
use kube::api::ObjectMeta;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock PropagationPolicy client
///
/// Policies are keyed by `(namespace, name)`. Every stored object carries a
/// resourceVersion; `replace_policy` rejects stale versions like the API
/// server does. Stored selectors get the policy namespace filled in the way
/// Karmada's mutating webhook does it.
#[derive(Clone)]
pub struct MockPropagationClient {
    policies: Arc<Mutex<HashMap<(String, String), PropagationPolicy>>>,
    next_version: Arc<Mutex<u64>>,
    failing: Arc<Mutex<HashSet<String>>>,
    writes: WriteLog,
}

impl Default for MockPropagationClient {
    fn default() -> Self {
        Self {
            policies: Arc::new(Mutex::new(HashMap::new())),
            next_version: Arc::new(Mutex::new(1)),
            failing: Arc::new(Mutex::new(HashSet::new())),
            writes: WriteLog::default(),
        }
    }
}

fn default_selector_namespaces(spec: &mut PropagationSpec, namespace: &str) {
    for selector in &mut spec.resource_selectors {
        if selector.namespace.is_none() {
            selector.namespace = Some(namespace.to_string());
        }
    }
}

impl MockPropagationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a policy as if Karmada already stored it (for test setup)
    pub fn add_policy(&self, mut policy: PropagationPolicy) {
        policy.metadata.resource_version = Some(self.next_version().to_string());
        let key = (
            policy.metadata.namespace.clone().unwrap_or_default(),
            policy.metadata.name.clone().unwrap_or_default(),
        );
        default_selector_namespaces(&mut policy.spec, &key.0);
        self.policies.lock().unwrap().insert(key, policy);
    }

    /// Make creates and replaces of the named policy fail
    pub fn fail_writes_to(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Undo [`fail_writes_to`](Self::fail_writes_to) for every policy
    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn check_writable(&self, namespace: &str, name: &str) -> Result<(), KarmadaError> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(KarmadaError::Api(format!("admission rejected PropagationPolicy {}/{}", namespace, name)));
        }
        Ok(())
    }

    pub fn policy(&self, namespace: &str, name: &str) -> Option<PropagationPolicy> {
        self.policies
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Sorted names of all policies in a namespace
    pub fn policy_names(&self, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .policies
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Mutating calls in order, e.g. `create_policy default/mig1-app-0-c1-policy`
    pub fn writes(&self) -> Vec<String> {
        self.writes.entries()
    }

    pub fn clear_writes(&self) {
        self.writes.clear();
    }

    fn next_version(&self) -> u64 {
        let mut version = self.next_version.lock().unwrap();
        let current = *version;
        *version += 1;
        current
    }
}

#[async_trait::async_trait]
impl PropagationClientTrait for MockPropagationClient {
    async fn test_connection(&self) -> Result<usize, KarmadaError> {
        Ok(self.policies.lock().unwrap().len().min(1))
    }

    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<PropagationPolicy>, KarmadaError> {
        Ok(self.policy(namespace, name))
    }

    async fn create_policy(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
        mut spec: PropagationSpec,
    ) -> Result<PropagationPolicy, KarmadaError> {
        self.check_writable(namespace, name)?;
        let key = (namespace.to_string(), name.to_string());
        if self.policies.lock().unwrap().contains_key(&key) {
            return Err(KarmadaError::Api(format!("PropagationPolicy {}/{} already exists", namespace, name)));
        }
        default_selector_namespaces(&mut spec, namespace);
        let policy = PropagationPolicy {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels),
                resource_version: Some(self.next_version().to_string()),
                ..Default::default()
            },
            spec,
        };
        self.policies.lock().unwrap().insert(key, policy.clone());
        self.writes.record(format!("create_policy {}/{}", namespace, name));
        Ok(policy)
    }

    async fn replace_policy(&self, policy: &PropagationPolicy) -> Result<PropagationPolicy, KarmadaError> {
        let namespace = policy.metadata.namespace.clone().unwrap_or_default();
        let name = policy.metadata.name.clone().unwrap_or_default();
        let key = (namespace.clone(), name.clone());
        self.check_writable(&namespace, &name)?;

        let current_version = self
            .policy(&namespace, &name)
            .ok_or_else(|| KarmadaError::NotFound(format!("PropagationPolicy {}/{}", namespace, name)))?
            .metadata
            .resource_version;
        if current_version != policy.metadata.resource_version {
            return Err(KarmadaError::Api(format!("conflict replacing PropagationPolicy {}/{}", namespace, name)));
        }

        let mut stored = policy.clone();
        stored.metadata.resource_version = Some(self.next_version().to_string());
        default_selector_namespaces(&mut stored.spec, &namespace);
        self.policies.lock().unwrap().insert(key, stored.clone());
        self.writes.record(format!("replace_policy {}/{}", namespace, name));
        Ok(stored)
    }

    async fn delete_policy(&self, namespace: &str, name: &str) -> Result<(), KarmadaError> {
        self.policies
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| KarmadaError::NotFound(format!("PropagationPolicy {}/{}", namespace, name)))?;
        self.writes.record(format!("delete_policy {}/{}", namespace, name));
        Ok(())
    }
}
