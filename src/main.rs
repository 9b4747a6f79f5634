mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kubepeek_k8s::{ClusterHandle, ConfigResolver, ResourceLister, connect};
use kubepeek_logs::LogStreamer;
use kubepeek_types::{LogRequest, NodeSummary};

use crate::settings::Settings;

/// Kubepeek - inspect nodes, pods and container logs of a Kubernetes cluster
#[derive(Parser, Debug)]
#[command(name = "kubepeek")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a kubeconfig file (defaults to $KUBECONFIG, then the settings file, then ~/.kube/config)
    #[arg(long, global = true, value_name = "PATH")]
    kubeconfig: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List cluster nodes
    Nodes,

    /// List pod names in a namespace
    Pods {
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Print the logs of a pod
    Logs {
        /// Pod name
        #[arg(value_name = "POD")]
        pod: String,

        #[arg(short, long)]
        namespace: Option<String>,

        /// Container name (required for multi-container pods)
        #[arg(short, long)]
        container: Option<String>,

        /// Number of lines from the end of the log
        #[arg(long)]
        tail: Option<i64>,

        /// Only return logs newer than this many seconds
        #[arg(long, value_name = "SECONDS")]
        since: Option<i64>,

        /// Prefix each line with its timestamp
        #[arg(long)]
        timestamps: bool,

        /// Print the logs of the previous container instance
        #[arg(short, long)]
        previous: bool,

        /// Maximum bytes of log output to fetch
        #[arg(long)]
        limit_bytes: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    let settings = Settings::load()?;

    let mut resolver = ConfigResolver::from_env().with_fallback(settings.kubeconfig.as_deref());
    let kubeconfig = args.kubeconfig.as_deref().unwrap_or_default();
    let handle = connect(&mut resolver, kubeconfig)
        .await
        .context("Failed to connect to cluster. Is kubectl configured?")?;

    match args.command {
        Commands::Nodes => print_nodes(&handle).await,
        Commands::Pods { namespace } => {
            let namespace = settings.namespace(namespace.as_deref());
            let names = ResourceLister::new(handle)
                .pod_names(&namespace)
                .await
                .context(format!("Failed to list pods in {}", namespace))?;
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Logs {
            pod,
            namespace,
            container,
            tail,
            since,
            timestamps,
            previous,
            limit_bytes,
        } => {
            let namespace = settings.namespace(namespace.as_deref());
            let mut req = LogRequest::new(&namespace, &pod, container.as_deref().unwrap_or_default());
            req.tail_lines = tail.or(settings.logs.tail_lines);
            req.since_seconds = since;
            req.timestamps = timestamps || settings.logs.timestamps;
            req.previous = previous;
            req.limit_bytes = limit_bytes;

            let logs = LogStreamer::new(handle)
                .fetch(&req)
                .await
                .context(format!("Failed to get logs for pod '{}' in namespace '{}'", pod, namespace))?;
            print!("{}", logs);
            Ok(())
        }
    }
}

async fn print_nodes(handle: &ClusterHandle) -> Result<()> {
    let nodes = ResourceLister::new(handle.clone())
        .node_summaries()
        .await
        .context("Failed to list nodes")?;

    let now = chrono::Utc::now();
    let width = nodes
        .iter()
        .map(|n| n.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    println!("{:<width$}  {:<8}  {:<20}  {:<6}  VERSION", "NAME", "STATUS", "ROLES", "AGE");
    for node in &nodes {
        println!("{}", format_node_row(node, width, now));
    }
    Ok(())
}

fn format_node_row(node: &NodeSummary, width: usize, now: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "{:<width$}  {:<8}  {:<20}  {:<6}  {}",
        node.name,
        node.status.as_str(),
        node.roles_label(),
        node.age(now),
        node.kubelet_version.as_deref().unwrap_or("<unknown>"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kubepeek_types::NodeStatus;

    #[test]
    fn test_parse_logs_command() {
        let args = Args::parse_from([
            "kubepeek", "logs", "api", "-n", "prod", "-c", "sidecar", "--tail", "50",
        ]);
        match args.command {
            Commands::Logs { pod, namespace, container, tail, .. } => {
                assert_eq!(pod, "api");
                assert_eq!(namespace.as_deref(), Some("prod"));
                assert_eq!(container.as_deref(), Some("sidecar"));
                assert_eq!(tail, Some(50));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_kubeconfig_flag() {
        let args = Args::parse_from(["kubepeek", "nodes", "--kubeconfig", "/tmp/kc", "-vv"]);
        assert_eq!(args.kubeconfig.as_deref(), Some("/tmp/kc"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_format_node_row() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let mut node = NodeSummary::new("worker-1".to_string());
        node.status = NodeStatus::Ready;
        node.created = Some(chrono::Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap());
        node.kubelet_version = Some("v1.30.0".to_string());

        let row = format_node_row(&node, 8, now);
        assert_eq!(
            row,
            format!("worker-1  {:<8}  {:<20}  {:<6}  v1.30.0", "Ready", "<none>", "3d")
        );
    }
}
