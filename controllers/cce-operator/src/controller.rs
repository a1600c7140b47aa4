//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the record store,
//! the driver cache and the reconciler together, then runs the ClusterConfig
//! watcher alongside the health and metrics server.

use crate::driver::{DriverCache, HttpDriverFactory};
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::server::{ServerState, run_server};
use crate::settings::Settings;
use crate::store::KubeStore;
use crate::watcher::Watcher;
use crds::ClusterConfig;
use kube::{Api, Client};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Concurrent reconciliations across all records
const WATCHER_CONCURRENCY: u16 = 3;

/// Main controller for ClusterConfig lifecycle management.
pub struct Controller {
    cluster_config_watcher: JoinHandle<Result<(), ControllerError>>,
    server: JoinHandle<Result<(), ControllerError>>,
    server_state: ServerState,
    shutdown: Arc<Notify>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller").finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    ///
    /// With `namespace` unset every namespace is watched.
    pub fn new(
        client: Client,
        namespace: Option<String>,
        metrics: Metrics,
        metrics_addr: SocketAddr,
    ) -> Self {
        info!("Initializing CCE operator");

        let api: Api<ClusterConfig> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(client.clone(), ns),
            None => Api::all(client.clone()),
        };

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(KubeStore::new(client)),
            DriverCache::new(Arc::new(HttpDriverFactory)),
            Settings::default(),
            metrics.clone(),
        ));

        let server_state = ServerState::new(metrics);
        let shutdown = Arc::new(Notify::new());

        let server = {
            let state = server_state.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                run_server(metrics_addr, state, async move { shutdown.notified().await }).await
            })
        };

        let cluster_config_watcher = {
            let watcher = Watcher::new(reconciler, api, WATCHER_CONCURRENCY);
            tokio::spawn(async move { watcher.watch_cluster_configs().await })
        };
        server_state.set_ready(true);

        Self {
            cluster_config_watcher,
            server,
            server_state,
            shutdown,
        }
    }

    /// Runs until the watcher stops on a shutdown signal or a task fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("CCE operator running");

        let result = tokio::select! {
            result = &mut self.cluster_config_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("ClusterConfig watcher panicked: {}", e)))?
            }
            result = &mut self.server => {
                let result = result.map_err(|e| ControllerError::Server(format!("Metrics server panicked: {}", e)))?;
                if let Err(ref e) = result {
                    error!("Metrics server stopped: {}", e);
                }
                self.cluster_config_watcher.abort();
                return result;
            }
        };

        self.server_state.set_ready(false);
        self.shutdown.notify_one();
        match self.server.await {
            Ok(Err(e)) => error!("Metrics server stopped with error: {}", e),
            Err(e) => error!("Metrics server panicked: {}", e),
            Ok(Ok(())) => {}
        }

        info!("CCE operator stopped");
        result
    }
}
