//! Kubernetes client for kubepeek
//!
//! This crate resolves which kubeconfig to use, builds a shared cluster
//! handle from it, and lists nodes and pods through that handle.

mod client;
mod config;
mod error;
mod lister;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use kubepeek_types as types;

pub use client::{ClusterApi, ClusterHandle, KubeClusterApi, LogStream, connect};
pub use config::{ConfigOrigin, ConfigResolver, ConfigSource, KUBECONFIG_VAR, default_kubeconfig_path};
pub use error::{ClusterError, Result};
pub use lister::{ResourceLister, node_to_summary};

// Re-export types that are used in our public API
pub use k8s_openapi::api::core::v1::{Node, Pod};
pub use kube::api::LogParams;
pub use kubepeek_types::{NodeStatus, NodeSummary};
