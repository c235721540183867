//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use karmada_client::DEFAULT_CRD_SEARCH_PATHS;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_KARMADA_KUBECONFIG: &str = "/etc/karmada/kubeconfig";
const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 3;
const DEFAULT_PROBE_BIND_ADDRESS: &str = "0.0.0.0:8081";

#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch, `None` for all namespaces
    pub watch_namespace: Option<String>,
    pub karmada_kubeconfig: PathBuf,
    pub crd_search_paths: Vec<PathBuf>,
    pub max_concurrent_reconciles: u16,
    pub probe_bind_address: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let karmada_kubeconfig = lookup("KARMADA_KUBECONFIG")
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_KARMADA_KUBECONFIG.to_string())
            .into();

        let crd_search_paths = match lookup("CRD_SEARCH_PATHS") {
            Some(paths) if !paths.is_empty() => paths
                .split(':')
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect(),
            _ => DEFAULT_CRD_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
        };

        let max_concurrent_reconciles = match lookup("MAX_CONCURRENT_RECONCILES") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "MAX_CONCURRENT_RECONCILES must be a positive integer, got '{}'",
                        raw
                    )));
                }
            },
            None => DEFAULT_MAX_CONCURRENT_RECONCILES,
        };

        let raw_addr = lookup("PROBE_BIND_ADDRESS").unwrap_or_else(|| DEFAULT_PROBE_BIND_ADDRESS.to_string());
        let probe_bind_address = raw_addr.parse::<SocketAddr>().map_err(|e| {
            ControllerError::InvalidConfig(format!("PROBE_BIND_ADDRESS '{}' is not a socket address: {}", raw_addr, e))
        })?;

        Ok(Self {
            watch_namespace,
            karmada_kubeconfig,
            crd_search_paths,
            max_concurrent_reconciles,
            probe_bind_address,
        })
    }
}
