use std::path::PathBuf;

use kube::config::KubeconfigError;
use thiserror::Error;

/// Errors returned by every cluster-facing operation
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cannot derive a kubeconfig path: home directory is unknown and KUBECONFIG is unset")]
    MissingHome,

    #[error("failed to load kubeconfig from {}", .path.display())]
    Configuration {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },

    #[error("failed to build cluster client from {}", .path.display())]
    ConnectionBuild {
        path: PathBuf,
        #[source]
        source: kube::Error,
    },

    #[error("failed to list {resource}")]
    Query {
        resource: &'static str,
        #[source]
        source: kube::Error,
    },

    #[error("failed to open log stream for pod {namespace}/{pod}")]
    StreamOpen {
        namespace: String,
        pod: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to read log stream for pod {namespace}/{pod}")]
    StreamRead {
        namespace: String,
        pod: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClusterError {
    /// HTTP status reported by the API server, if the failure came from it
    pub fn api_status(&self) -> Option<u16> {
        match self {
            Self::ConnectionBuild { source, .. }
            | Self::Query { source, .. }
            | Self::StreamOpen { source, .. } => match source {
                kube::Error::Api(resp) => Some(resp.code),
                _ => None,
            },
            _ => None,
        }
    }
}

pub type Result<T, E = ClusterError> = std::result::Result<T, E>;
