//! Aggregated proxy addressing
//!
//! Karmada exposes every member cluster's API under
//! `/apis/cluster.karmada.io/v1alpha1/clusters/<cluster>/proxy/<remote-path>`.
//! Requests sent there are forwarded verbatim to the member API server.

/// API group/version serving the cluster proxy subresource
pub const CLUSTER_PROXY_PREFIX: &str = "/apis/cluster.karmada.io/v1alpha1/clusters";

/// Absolute proxy path for `remote_path` on `cluster`
pub fn proxy_path(cluster: &str, remote_path: &str) -> String {
    format!(
        "{}/{}/proxy/{}",
        CLUSTER_PROXY_PREFIX,
        cluster,
        remote_path.trim_start_matches('/')
    )
}

/// Appends URL-encoded query parameters to a path
pub fn with_query(path: String, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path;
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", path, query)
}

/// Remote path of a namespaced pod
pub fn pod_path(namespace: &str, name: &str) -> String {
    format!("api/v1/namespaces/{}/pods/{}", namespace, name)
}

/// Remote path of a namespace
pub fn namespace_path(name: &str) -> String {
    format!("api/v1/namespaces/{}", name)
}

/// Remote path of the namespace collection
pub const NAMESPACES_PATH: &str = "api/v1/namespaces";

/// Remote path of the CRD collection
pub const CRDS_PATH: &str = "apis/apiextensions.k8s.io/v1/customresourcedefinitions";

/// Remote path of a single CRD
pub fn crd_path(name: &str) -> String {
    format!("{}/{}", CRDS_PATH, name)
}
