//! fnproxy: load-balancing front door for function-execution nodes.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                   FNPROXY                     │
//!                      │                                               │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ──────────────────▶│  │  proxy  │──▶│ grouper  │──▶│  router   │  │
//!                      │  │ server  │   │ (healthy │   │ (consist. │  │
//!                      │  └─────────┘   │  nodes)  │   │  hash)    │  │
//!                      │       │        └──────────┘   └─────┬─────┘  │
//!                      │       │              ▲               │        │
//!   Client Response    │       ▼              │               ▼        │
//!   ◀──────────────────│  relay body     probe loop      forward to   │──── Function
//!                      │  + learn wait   (/version)      chosen node  │      Node
//!                      │                                               │
//!                      │  ┌─────────────────────────────────────────┐ │
//!                      │  │   config · store · observability ·      │ │
//!                      │  │   lifecycle · management API (/1/lb)    │ │
//!                      │  └─────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use clap::Parser;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;

use fnproxy::config::{self, GrouperDriver, ProxyConfig};
use fnproxy::grouper::AllGrouper;
use fnproxy::lifecycle::{signals, Shutdown};
use fnproxy::observability::{logging, metrics};
use fnproxy::router::ChRouter;
use fnproxy::store::{FileStore, MemoryStore, NodeStore};
use fnproxy::ProxyServer;

#[derive(Parser)]
#[command(name = "fnproxy")]
#[command(about = "Load-balancing front door for function-execution nodes", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated seed node addresses, appended to the configured list.
    #[arg(long)]
    nodes: Option<String>,

    /// Listen address override (host:port).
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listener.bind_address = listen;
    }
    if let Some(nodes) = args.nodes {
        config.grouper.nodes.extend(
            nodes
                .split(',')
                .map(|node| node.trim().to_string())
                .filter(|node| !node.is_empty()),
        );
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fnproxy starting");

    // Overrides bypass the loader, so validate the final config here.
    if let Err(errors) = config::validate_config(&config) {
        for error in &errors {
            tracing::error!(%error, "invalid configuration");
        }
        return Err("configuration validation failed".into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        driver = ?config.grouper.driver,
        probe_path = %config.health_check.path,
        probe_interval_secs = config.health_check.interval_secs,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                error = %e,
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let grouper = match config.grouper.driver {
        GrouperDriver::Static => {
            let store: Arc<dyn NodeStore> = match &config.grouper.store_path {
                Some(path) => Arc::new(FileStore::open(path).await?),
                None => Arc::new(MemoryStore::new()),
            };
            let client: Client<HttpConnector, Body> =
                Client::builder(TokioExecutor::new()).build(HttpConnector::new());
            AllGrouper::new(&config.health_check, &config.grouper.nodes, store, client).await?
        }
        GrouperDriver::Cluster => {
            // The watch contract is orchestrator-specific; this binary
            // ships no implementation of it.
            return Err(fnproxy::Error::Config(
                "the cluster driver needs a pod-event source; embed the library and \
                 supply a fnproxy::grouper::PodWatch implementation"
                    .to_string(),
            )
            .into());
        }
    };

    let shutdown = Shutdown::new();
    tokio::spawn(Arc::clone(&grouper).run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let server = ProxyServer::new(grouper, Arc::new(ChRouter::new()));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
