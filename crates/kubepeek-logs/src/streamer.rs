use futures::AsyncReadExt;
use kube::api::LogParams;
use tracing::debug;

use kubepeek_k8s::{ClusterError, ClusterHandle, Result};
use kubepeek_types::LogRequest;

/// Fetches complete log snapshots for pods
#[derive(Clone, Debug)]
pub struct LogStreamer {
    handle: ClusterHandle,
}

impl LogStreamer {
    pub fn new(handle: ClusterHandle) -> Self {
        Self { handle }
    }

    /// Fetch the full log of a pod's container.
    ///
    /// An empty `container_name` leaves the request unscoped, which the API
    /// server only accepts for single-container pods.
    pub async fn pod_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container_name: &str,
    ) -> Result<String> {
        self.fetch(&LogRequest::new(namespace, pod_name, container_name))
            .await
    }

    /// Open a log stream for `req` and drain it into memory
    pub async fn fetch(&self, req: &LogRequest) -> Result<String> {
        let params = log_params(req);

        let mut stream = self
            .handle
            .api()
            .open_log_stream(&req.namespace, &req.pod_name, &params)
            .await
            .map_err(|source| ClusterError::StreamOpen {
                namespace: req.namespace.clone(),
                pod: req.pod_name.clone(),
                source,
            })?;
        debug!(
            namespace = %req.namespace,
            pod = %req.pod_name,
            container = ?req.container,
            "log stream opened"
        );

        let mut buf = Vec::new();
        let read = stream.read_to_end(&mut buf).await;
        // Close before surfacing any read error
        drop(stream);

        read.map_err(|source| ClusterError::StreamRead {
            namespace: req.namespace.clone(),
            pod: req.pod_name.clone(),
            source,
        })?;
        debug!(pod = %req.pod_name, bytes = buf.len(), "log stream drained");

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Build snapshot `LogParams` for a request. `follow` is never set.
pub fn log_params(req: &LogRequest) -> LogParams {
    LogParams {
        container: req.container.clone(),
        // Use since_seconds if provided, otherwise use tail_lines
        tail_lines: if req.since_seconds.is_some() {
            None
        } else {
            req.tail_lines
        },
        since_seconds: req.since_seconds,
        timestamps: req.timestamps,
        previous: req.previous,
        limit_bytes: req.limit_bytes,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubepeek_k8s::testing::FakeCluster;

    fn two_container_cluster() -> FakeCluster {
        FakeCluster::new()
            .with_pod("default", "web", &[("nginx", "GET / 200\nGET /health 200\n")])
            .with_pod(
                "default",
                "api",
                &[
                    ("server", "listening on :8080\n"),
                    ("sidecar", "proxy ready\n"),
                ],
            )
    }

    #[tokio::test]
    async fn test_single_container_unscoped() {
        let fake = two_container_cluster();
        let counters = fake.counters();
        let streamer = LogStreamer::new(ClusterHandle::new(fake));

        let logs = streamer.pod_logs("default", "web", "").await.unwrap();
        assert_eq!(logs, "GET / 200\nGET /health 200\n");
        assert_eq!(counters.opened(), 1);
        assert_eq!(counters.leaked(), 0);
    }

    #[tokio::test]
    async fn test_scoped_to_sidecar() {
        let streamer = LogStreamer::new(ClusterHandle::new(two_container_cluster()));

        let sidecar = streamer.pod_logs("default", "api", "sidecar").await.unwrap();
        let server = streamer.pod_logs("default", "api", "server").await.unwrap();
        assert_eq!(sidecar, "proxy ready\n");
        assert_eq!(server, "listening on :8080\n");
        assert_ne!(sidecar, server);
    }

    #[tokio::test]
    async fn test_unscoped_multi_container_rejected_remotely() {
        let fake = two_container_cluster();
        let counters = fake.counters();
        let streamer = LogStreamer::new(ClusterHandle::new(fake));

        let err = streamer.pod_logs("default", "api", "").await.unwrap_err();
        assert!(matches!(err, ClusterError::StreamOpen { .. }));
        assert_eq!(err.api_status(), Some(400));
        assert_eq!(counters.opened(), 0);
    }

    #[tokio::test]
    async fn test_missing_pod_leaks_nothing() {
        let fake = two_container_cluster();
        let counters = fake.counters();
        let streamer = LogStreamer::new(ClusterHandle::new(fake));

        let result = streamer.pod_logs("default", "ghost", "").await;
        let err = result.unwrap_err();
        assert!(matches!(err, ClusterError::StreamOpen { ref pod, .. } if pod == "ghost"));
        assert_eq!(err.api_status(), Some(404));
        assert_eq!(counters.leaked(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_closes_stream() {
        let fake = two_container_cluster().with_broken_stream("default", "web");
        let counters = fake.counters();
        let streamer = LogStreamer::new(ClusterHandle::new(fake));

        let err = streamer.pod_logs("default", "web", "nginx").await.unwrap_err();
        assert!(matches!(err, ClusterError::StreamRead { .. }));
        assert_eq!(counters.opened(), 1);
        assert_eq!(counters.closed(), 1);
    }

    #[test]
    fn test_since_seconds_overrides_tail_lines() {
        let mut req = LogRequest::new("default", "web", "nginx");
        req.tail_lines = Some(100);

        let params = log_params(&req);
        assert_eq!(params.tail_lines, Some(100));
        assert_eq!(params.container.as_deref(), Some("nginx"));
        assert!(!params.follow);

        req.since_seconds = Some(300);
        let params = log_params(&req);
        assert_eq!(params.tail_lines, None);
        assert_eq!(params.since_seconds, Some(300));
    }
}
