//! Cluster client handle and connection bootstrap

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::io::AsyncBufRead;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::Api;
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use crate::config::ConfigResolver;
use crate::error::{ClusterError, Result};

/// An open log stream. Dropping it closes the underlying connection.
pub type LogStream = Pin<Box<dyn AsyncBufRead + Send>>;

/// The control-plane operations kubepeek depends on.
///
/// Implemented over a real `kube::Client` by [`KubeClusterApi`]; tests
/// substitute their own implementation.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List every node in the cluster
    async fn list_nodes(&self) -> kube::Result<Vec<Node>>;

    /// List every pod in a namespace, in API server order
    async fn list_pods(&self, namespace: &str) -> kube::Result<Vec<Pod>>;

    /// Open a log stream for a pod
    async fn open_log_stream(
        &self,
        namespace: &str,
        pod_name: &str,
        params: &LogParams,
    ) -> kube::Result<LogStream>;
}

/// [`ClusterApi`] backed by a live `kube::Client`
#[derive(Clone)]
pub struct KubeClusterApi {
    client: kube::Client,
}

impl KubeClusterApi {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_nodes(&self) -> kube::Result<Vec<Node>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        Ok(nodes.list(&ListParams::default()).await?.items)
    }

    async fn list_pods(&self, namespace: &str) -> kube::Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(pods.list(&ListParams::default()).await?.items)
    }

    async fn open_log_stream(
        &self,
        namespace: &str,
        pod_name: &str,
        params: &LogParams,
    ) -> kube::Result<LogStream> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let stream = pods.log_stream(pod_name, params).await?;
        Ok(Box::pin(stream))
    }
}

/// Shared, read-only connection to a cluster.
///
/// Cloning is cheap; clones share the same underlying client.
#[derive(Clone)]
pub struct ClusterHandle {
    api: Arc<dyn ClusterApi>,
}

impl ClusterHandle {
    pub fn new(api: impl ClusterApi + 'static) -> Self {
        Self { api: Arc::new(api) }
    }

    pub fn api(&self) -> &dyn ClusterApi {
        self.api.as_ref()
    }
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterHandle").finish_non_exhaustive()
    }
}

/// Resolve a kubeconfig and build a handle for its current context.
///
/// `explicit_path` may be empty, in which case the resolver's precedence
/// applies. No request is sent to the cluster; the connection is lazy.
pub async fn connect(resolver: &mut ConfigResolver, explicit_path: &str) -> Result<ClusterHandle> {
    let source = resolver.resolve(explicit_path)?;
    let path = source.path;
    debug!(path = %path.display(), origin = ?source.origin, "loading kubeconfig");

    let kubeconfig = Kubeconfig::read_from(&path).map_err(|source| ClusterError::Configuration {
        path: path.clone(),
        source,
    })?;

    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|source| ClusterError::Configuration {
            path: path.clone(),
            source,
        })?;

    let client = kube::Client::try_from(config)
        .map_err(|source| ClusterError::ConnectionBuild { path, source })?;

    Ok(ClusterHandle::new(KubeClusterApi::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const KUBECONFIG_YAML: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: dev
  cluster:
    server: http://127.0.0.1:8080
contexts:
- name: dev
  context:
    cluster: dev
    user: dev
users:
- name: dev
  user:
    token: not-a-real-token
"#;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kubepeek-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_connect_missing_file() {
        let mut resolver = ConfigResolver::new();
        let err = connect(&mut resolver, "/nonexistent/kubepeek/config")
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_connect_malformed_file() {
        let path = scratch_file("malformed.yaml", "clusters: [this is: not valid");
        let mut resolver = ConfigResolver::new();
        let err = connect(&mut resolver, path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_connect_through_override() {
        let path = scratch_file("valid.yaml", KUBECONFIG_YAML);
        let mut resolver = ConfigResolver::new()
            .with_override(crate::config::KUBECONFIG_VAR, path.to_str().unwrap());
        let handle = connect(&mut resolver, "").await;
        assert!(handle.is_ok());
    }

    #[tokio::test]
    async fn test_missing_home_surfaces_from_connect() {
        let mut resolver = ConfigResolver::new();
        let err = connect(&mut resolver, "").await.unwrap_err();
        assert!(matches!(err, ClusterError::MissingHome));
    }
}
