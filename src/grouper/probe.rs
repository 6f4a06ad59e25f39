//! Active health probing.
//!
//! # Responsibilities
//! - Issue the periodic version probe against one backend
//! - Enforce the probe timeout and minimum API version
//! - Drive the shared probe loop both grouper drivers run
//!
//! # Design Decisions
//! - One probe task is spawned per node per tick so a slow backend cannot
//!   delay the verdict on the others
//! - The timeout covers the full request including the response body read

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use semver::Version;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::error::Error;
use crate::grouper::node::NodeTable;
use crate::observability::metrics;

/// Why one probe round failed.
#[derive(Debug, Error)]
pub(crate) enum ProbeFailure {
    #[error("probe timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("unreadable body: {0}")]
    Body(String),
    #[error("version rejected: {0}")]
    Version(String),
}

#[derive(Debug, Deserialize)]
struct VersionBody {
    version: String,
}

/// Issues version probes against backend nodes.
pub(crate) struct Prober {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
    min_version: Version,
    /// When set, a missing or unreadable version body fails the probe.
    require_version: bool,
}

impl Prober {
    pub(crate) fn new(
        client: Client<HttpConnector, Body>,
        config: &HealthCheckConfig,
        require_version: bool,
    ) -> Result<Self, Error> {
        let min_version = Version::parse(&config.min_api_version).map_err(|e| {
            Error::Config(format!(
                "invalid min_api_version '{}': {}",
                config.min_api_version, e
            ))
        })?;
        Ok(Self {
            client,
            path: config.path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            min_version,
            require_version,
        })
    }

    /// One probe round against `address`.
    pub(crate) async fn probe(&self, address: &str) -> Result<(), ProbeFailure> {
        let uri = format!("http://{}{}", address, self.path);
        let request = Request::builder()
            .method("GET")
            .uri(&uri)
            .header("user-agent", "fnproxy-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeFailure::Request(e.to_string()))?;

        let (status, bytes) = time::timeout(self.timeout, async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ProbeFailure::Request(e.to_string()))?;
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ProbeFailure::Body(e.to_string()))?
                .to_bytes();
            Ok::<_, ProbeFailure>((status, bytes))
        })
        .await
        .map_err(|_| ProbeFailure::Timeout)??;

        if !status.is_success() {
            return Err(ProbeFailure::Status(status));
        }

        match serde_json::from_slice::<VersionBody>(&bytes) {
            Ok(body) => {
                let version = Version::parse(&body.version)
                    .map_err(|e| ProbeFailure::Version(format!("'{}': {}", body.version, e)))?;
                if version < self.min_version {
                    return Err(ProbeFailure::Version(format!(
                        "{} is below the minimum {}",
                        version, self.min_version
                    )));
                }
                Ok(())
            }
            // A 2xx without a readable version body still counts for nodes
            // added by hand; orchestrator-discovered pods must report one.
            Err(e) if self.require_version => Err(ProbeFailure::Body(e.to_string())),
            Err(_) => Ok(()),
        }
    }
}

/// Tick-driven probe loop shared by both grouper drivers.
pub(crate) async fn run_probe_loop(
    table: Arc<NodeTable>,
    prober: Arc<Prober>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "health probe loop starting");
    let mut ticker = time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => probe_all(&table, &prober),
            _ = shutdown.recv() => {
                tracing::info!("health probe loop received shutdown signal, exiting");
                break;
            }
        }
    }
}

fn probe_all(table: &Arc<NodeTable>, prober: &Arc<Prober>) {
    for (id, address) in table.targets() {
        let table = Arc::clone(table);
        let prober = Arc::clone(prober);
        tokio::spawn(async move {
            match prober.probe(&address).await {
                Ok(()) => {
                    metrics::record_probe(&address, true);
                    if table.record_success(&id).is_some() {
                        tracing::info!(addr = %address, "node is online");
                        metrics::record_healthy_nodes(table.healthy_list().len());
                    }
                }
                Err(failure) => {
                    metrics::record_probe(&address, false);
                    tracing::warn!(addr = %address, error = %failure, "health check failed");
                    if table.record_failure(&id).is_some() {
                        tracing::info!(addr = %address, "node is offline");
                        metrics::record_healthy_nodes(table.healthy_list().len());
                    }
                }
            }
        });
    }
}
