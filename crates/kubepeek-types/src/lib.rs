//! Shared types for kubepeek
//!
//! This crate contains data structures used across multiple kubepeek crates.

use chrono::{DateTime, Utc};

// ============================================================================
// Kubernetes Resource Types
// ============================================================================

/// Display projection of a cluster node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSummary {
    pub name: String,
    pub status: NodeStatus,
    pub roles: Vec<String>,
    pub kubelet_version: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

impl NodeSummary {
    pub fn new(name: String) -> Self {
        Self {
            name,
            status: NodeStatus::Unknown,
            roles: Vec::new(),
            kubelet_version: None,
            created: None,
        }
    }

    /// Roles joined the way kubectl prints them, `<none>` when unlabeled
    pub fn roles_label(&self) -> String {
        if self.roles.is_empty() {
            "<none>".to_string()
        } else {
            self.roles.join(",")
        }
    }

    /// Compact age relative to `now`, e.g. "5d", "3h", "12m"
    pub fn age(&self, now: DateTime<Utc>) -> String {
        let Some(created) = self.created else {
            return "<unknown>".to_string();
        };
        let secs = (now - created).num_seconds().max(0);
        match secs {
            s if s >= 86_400 => format!("{}d", s / 86_400),
            s if s >= 3_600 => format!("{}h", s / 3_600),
            s if s >= 60 => format!("{}m", s / 60),
            s => format!("{}s", s),
        }
    }
}

/// Node readiness, taken from the `Ready` condition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    Ready,
    NotReady,
    Unknown,
}

impl From<&str> for NodeStatus {
    /// Maps a `Ready` condition status ("True"/"False"/"Unknown")
    fn from(s: &str) -> Self {
        match s {
            "True" => Self::Ready,
            "False" => Self::NotReady,
            _ => Self::Unknown,
        }
    }
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "NotReady",
            Self::Unknown => "Unknown",
        }
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// A one-shot log snapshot request for a single pod
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogRequest {
    pub namespace: String,
    pub pod_name: String,

    /// Target container; `None` lets the API server pick the only one
    pub container: Option<String>,

    /// Number of lines from the end of the log
    pub tail_lines: Option<i64>,

    /// Only return lines newer than this many seconds
    pub since_seconds: Option<i64>,

    /// Prefix each line with an RFC3339 timestamp
    pub timestamps: bool,

    /// Logs of the previous terminated container instance
    pub previous: bool,

    /// Upper bound on bytes returned by the server
    pub limit_bytes: Option<i64>,
}

impl LogRequest {
    /// Create a request for a pod, scoped to `container` unless it is empty
    pub fn new(namespace: &str, pod_name: &str, container: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            pod_name: pod_name.to_string(),
            container: (!container.is_empty()).then(|| container.to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_container_is_unscoped() {
        let req = LogRequest::new("default", "web", "");
        assert_eq!(req.container, None);

        let req = LogRequest::new("default", "web", "sidecar");
        assert_eq!(req.container.as_deref(), Some("sidecar"));
    }

    #[test]
    fn test_node_status_from_condition() {
        assert_eq!(NodeStatus::from("True"), NodeStatus::Ready);
        assert_eq!(NodeStatus::from("False"), NodeStatus::NotReady);
        assert_eq!(NodeStatus::from("Unknown"), NodeStatus::Unknown);
    }

    #[test]
    fn test_node_age() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let mut node = NodeSummary::new("worker-1".to_string());
        assert_eq!(node.age(now), "<unknown>");

        node.created = Some(Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap());
        assert_eq!(node.age(now), "5d");

        node.created = Some(Utc.with_ymd_and_hms(2024, 1, 10, 9, 30, 0).unwrap());
        assert_eq!(node.age(now), "2h");
    }

    #[test]
    fn test_roles_label() {
        let mut node = NodeSummary::new("cp".to_string());
        assert_eq!(node.roles_label(), "<none>");
        node.roles = vec!["control-plane".to_string(), "master".to_string()];
        assert_eq!(node.roles_label(), "control-plane,master");
    }
}
