//! CCE Operator
//!
//! Reconciles `ClusterConfig` records against managed Kubernetes clusters on
//! the cloud container engine:
//! - creates the network prerequisites, the cluster and its node pools
//! - imports existing clusters and adopts their node pools
//! - keeps version, metadata and node pools converged with the record
//! - tears down everything it created when the record is deleted

mod backoff;
mod controller;
mod driver;
mod error;
mod metrics;
mod reconciler;
mod server;
mod settings;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use anyhow::Context;
use clap::Parser;
use controller::Controller;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use metrics::Metrics;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a kubeconfig file; in-cluster configuration is used when unset
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Override the API server address from the kubeconfig
    #[arg(long)]
    master: Option<String>,

    /// Only watch this namespace; all namespaces when unset
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(long)]
    debug: bool,

    /// Listen address for /healthz, /readyz and /metrics
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: SocketAddr,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if std::env::var("RUST_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn kube_client(args: &Args) -> anyhow::Result<Client> {
    let mut config = match &args.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer().await?,
    };
    if let Some(master) = &args.master {
        config.cluster_url = master
            .parse()
            .with_context(|| format!("invalid API server address {}", master))?;
    }
    Ok(Client::try_from(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    info!("Starting CCE Operator v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Namespace: {}", args.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Metrics address: {}", args.metrics_addr);

    let client = kube_client(&args).await.context("creating Kubernetes client")?;
    let metrics = Metrics::new(prometheus::Registry::new()).context("registering metrics")?;

    let controller = Controller::new(client, args.namespace, metrics, args.metrics_addr);
    controller.run().await?;

    Ok(())
}
