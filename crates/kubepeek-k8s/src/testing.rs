//! In-memory [`ClusterApi`] for tests
//!
//! Mimics the API server responses kubepeek relies on, including the 400
//! returned for unscoped log requests against multi-container pods. Every
//! stream it hands out is counted on open and on drop.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::io::{AsyncBufRead, AsyncRead};
use k8s_openapi::api::core::v1::{Container, Node, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::LogParams;
use kube::core::ErrorResponse;

use crate::client::{ClusterApi, LogStream};

/// Opened/closed counters shared by all streams of one fake
#[derive(Debug, Default)]
pub struct StreamCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl StreamCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Streams opened but not yet dropped
    pub fn leaked(&self) -> usize {
        self.opened() - self.closed()
    }
}

struct FakePod {
    pod: Pod,
    logs: Vec<(String, String)>,
    broken_stream: bool,
}

/// Cluster fixture with nodes, pods and per-container logs
#[derive(Default)]
pub struct FakeCluster {
    nodes: Vec<Node>,
    pods: Vec<FakePod>,
    fail_lists: bool,
    counters: Arc<StreamCounters>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, name: &str) -> Self {
        self.nodes.push(Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        });
        self
    }

    /// Add a pod whose containers emit the given `(container, log)` pairs
    pub fn with_pod(mut self, namespace: &str, name: &str, containers: &[(&str, &str)]) -> Self {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: containers
                    .iter()
                    .map(|(c, _)| Container {
                        name: c.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.pods.push(FakePod {
            pod,
            logs: containers
                .iter()
                .map(|(c, log)| (c.to_string(), log.to_string()))
                .collect(),
            broken_stream: false,
        });
        self
    }

    /// Streams for this pod deliver their log, then fail with a connection reset
    pub fn with_broken_stream(mut self, namespace: &str, name: &str) -> Self {
        if let Some(pod) = self.find_mut(namespace, name) {
            pod.broken_stream = true;
        }
        self
    }

    /// Every list call is rejected with 403 Forbidden
    pub fn failing_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn counters(&self) -> Arc<StreamCounters> {
        Arc::clone(&self.counters)
    }

    fn find(&self, namespace: &str, name: &str) -> Option<&FakePod> {
        self.pods.iter().find(|p| {
            p.pod.metadata.namespace.as_deref() == Some(namespace)
                && p.pod.metadata.name.as_deref() == Some(name)
        })
    }

    fn find_mut(&mut self, namespace: &str, name: &str) -> Option<&mut FakePod> {
        self.pods.iter_mut().find(|p| {
            p.pod.metadata.namespace.as_deref() == Some(namespace)
                && p.pod.metadata.name.as_deref() == Some(name)
        })
    }
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_nodes(&self) -> kube::Result<Vec<Node>> {
        if self.fail_lists {
            return Err(api_error(
                403,
                "Forbidden",
                "nodes is forbidden: User \"viewer\" cannot list resource \"nodes\"".to_string(),
            ));
        }
        Ok(self.nodes.clone())
    }

    async fn list_pods(&self, namespace: &str) -> kube::Result<Vec<Pod>> {
        if self.fail_lists {
            return Err(api_error(
                403,
                "Forbidden",
                format!("pods is forbidden: User \"viewer\" cannot list resource \"pods\" in namespace \"{namespace}\""),
            ));
        }
        Ok(self
            .pods
            .iter()
            .filter(|p| p.pod.metadata.namespace.as_deref() == Some(namespace))
            .map(|p| p.pod.clone())
            .collect())
    }

    async fn open_log_stream(
        &self,
        namespace: &str,
        pod_name: &str,
        params: &LogParams,
    ) -> kube::Result<LogStream> {
        let Some(pod) = self.find(namespace, pod_name) else {
            return Err(api_error(
                404,
                "NotFound",
                format!("pods \"{pod_name}\" not found"),
            ));
        };

        let log = match &params.container {
            Some(container) => pod
                .logs
                .iter()
                .find(|(c, _)| c == container)
                .map(|(_, log)| log.clone())
                .ok_or_else(|| {
                    api_error(
                        400,
                        "BadRequest",
                        format!("container {container} is not valid for pod {pod_name}"),
                    )
                })?,
            None => match pod.logs.as_slice() {
                [(_, log)] => log.clone(),
                many => {
                    let names: Vec<&str> = many.iter().map(|(c, _)| c.as_str()).collect();
                    return Err(api_error(
                        400,
                        "BadRequest",
                        format!(
                            "a container name must be specified for pod {pod_name}, choose one of: [{}]",
                            names.join(" ")
                        ),
                    ));
                }
            },
        };

        Ok(Box::pin(TrackedStream::new(
            log.into_bytes(),
            pod.broken_stream,
            Arc::clone(&self.counters),
        )))
    }
}

/// In-memory log stream that records its own drop
struct TrackedStream {
    data: Vec<u8>,
    pos: usize,
    fail_at_end: bool,
    counters: Arc<StreamCounters>,
}

impl TrackedStream {
    fn new(data: Vec<u8>, fail_at_end: bool, counters: Arc<StreamCounters>) -> Self {
        counters.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            data,
            pos: 0,
            fail_at_end,
            counters,
        }
    }

    fn reset_error() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let remaining = &this.data[this.pos..];
        if remaining.is_empty() {
            if this.fail_at_end {
                return Poll::Ready(Err(Self::reset_error()));
            }
            return Poll::Ready(Ok(0));
        }
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        this.pos += n;
        Poll::Ready(Ok(n))
    }
}

impl AsyncBufRead for TrackedStream {
    fn poll_fill_buf(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        let this = self.get_mut();
        if this.pos >= this.data.len() && this.fail_at_end {
            return Poll::Ready(Err(Self::reset_error()));
        }
        Poll::Ready(Ok(&this.data[this.pos..]))
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        let this = self.get_mut();
        this.pos = (this.pos + amt).min(this.data.len());
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
