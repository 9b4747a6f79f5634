//! Read-only resource listing

use k8s_openapi::api::core::v1::Node;
use tracing::debug;

use crate::client::ClusterHandle;
use crate::error::{ClusterError, Result};
use crate::types::{NodeStatus, NodeSummary};

/// Label prefix kubectl uses to derive node roles
const NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";

/// Lists nodes and pods through a [`ClusterHandle`]
#[derive(Clone, Debug)]
pub struct ResourceLister {
    handle: ClusterHandle,
}

impl ResourceLister {
    pub fn new(handle: ClusterHandle) -> Self {
        Self { handle }
    }

    /// Fetch every node in the cluster, unmodified
    pub async fn nodes(&self) -> Result<Vec<Node>> {
        let nodes = self
            .handle
            .api()
            .list_nodes()
            .await
            .map_err(|source| ClusterError::Query {
                resource: "nodes",
                source,
            })?;
        debug!(count = nodes.len(), "listed nodes");
        Ok(nodes)
    }

    /// Fetch every node and project it for display
    pub async fn node_summaries(&self) -> Result<Vec<NodeSummary>> {
        Ok(self.nodes().await?.iter().map(node_to_summary).collect())
    }

    /// Fetch the names of all pods in a namespace, in API server order
    pub async fn pod_names(&self, namespace: &str) -> Result<Vec<String>> {
        let pods = self
            .handle
            .api()
            .list_pods(namespace)
            .await
            .map_err(|source| ClusterError::Query {
                resource: "pods",
                source,
            })?;
        debug!(namespace, count = pods.len(), "listed pods");

        Ok(pods
            .into_iter()
            .map(|pod| pod.metadata.name.unwrap_or_default())
            .collect())
    }
}

/// Convert a k8s Node to NodeSummary
pub fn node_to_summary(node: &Node) -> NodeSummary {
    let name = node.metadata.name.clone().unwrap_or_default();
    let mut summary = NodeSummary::new(name);

    if let Some(labels) = &node.metadata.labels {
        summary.roles = labels
            .keys()
            .filter_map(|k| k.strip_prefix(NODE_ROLE_PREFIX))
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect();
    }

    summary.created = node.metadata.creation_timestamp.as_ref().map(|t| t.0);

    if let Some(status) = &node.status {
        summary.status = status
            .conditions
            .as_ref()
            .and_then(|conds| conds.iter().find(|c| c.type_ == "Ready"))
            .map(|c| NodeStatus::from(c.status.as_str()))
            .unwrap_or(NodeStatus::Unknown);

        summary.kubelet_version = status
            .node_info
            .as_ref()
            .map(|info| info.kubelet_version.clone());
    }

    summary
}
