//! Orchestrator-backed driver: membership follows the pod lifecycle.
//!
//! # Responsibilities
//! - Register and unregister pods from the watch event stream
//! - Reconnect the watch with exponential backoff when it drops
//! - Run the shared probe loop over the discovered set
//!
//! # Design Decisions
//! - Entries are keyed by pod uid so an IP change on restart replaces the
//!   old address instead of leaking it
//! - Discovered pods must report a parseable API version; a bare 2xx from
//!   the probe endpoint is not enough

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::{ClusterConfig, HealthCheckConfig};
use crate::error::{Error, Result};
use crate::grouper::node::NodeTable;
use crate::grouper::probe::{run_probe_loop, Prober};
use crate::grouper::watch::{PodEvent, PodEventKind, PodWatch};
use crate::grouper::{Grouper, NodeStatus};
use crate::resilience::backoff::calculate_backoff;

const WATCH_BACKOFF_BASE_MS: u64 = 500;
const WATCH_BACKOFF_MAX_MS: u64 = 30_000;

pub struct ClusterGrouper {
    table: Arc<NodeTable>,
    prober: Arc<Prober>,
    watcher: Arc<dyn PodWatch>,
    namespace: String,
    label_selector: String,
    target_port: u16,
    interval: Duration,
}

impl ClusterGrouper {
    pub fn new(
        health: &HealthCheckConfig,
        cluster: &ClusterConfig,
        watcher: Arc<dyn PodWatch>,
        client: Client<HttpConnector, Body>,
    ) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            table: Arc::new(NodeTable::new(
                health.healthy_threshold,
                health.unhealthy_threshold,
            )),
            prober: Arc::new(Prober::new(client, health, true)?),
            watcher,
            namespace: cluster.namespace.clone(),
            label_selector: cluster.label_selector.clone(),
            target_port: cluster.target_port,
            interval: Duration::from_secs(health.interval_secs),
        }))
    }

    /// Probe discovered pods until shutdown fires.
    pub async fn run_health(self: Arc<Self>, shutdown: broadcast::Receiver<()>) {
        run_probe_loop(
            Arc::clone(&self.table),
            Arc::clone(&self.prober),
            self.interval,
            shutdown,
        )
        .await;
    }

    /// Consume pod events, reconnecting whenever the stream ends. The
    /// backoff resets after any stream that delivered at least one event.
    pub async fn run_watch(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut attempt = 0u32;
        loop {
            match self
                .watcher
                .watch(&self.namespace, &self.label_selector)
                .await
            {
                Ok(mut events) => {
                    tracing::info!(
                        namespace = %self.namespace,
                        selector = %self.label_selector,
                        "pod watch connected"
                    );
                    let mut delivered = false;
                    loop {
                        tokio::select! {
                            event = events.recv() => match event {
                                Some(event) => {
                                    delivered = true;
                                    self.apply(event);
                                }
                                None => {
                                    tracing::warn!("pod watch stream ended");
                                    break;
                                }
                            },
                            _ = shutdown.recv() => {
                                tracing::info!("pod watch received shutdown signal, exiting");
                                return;
                            }
                        }
                    }
                    if delivered {
                        attempt = 0;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "pod watch connection failed");
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = calculate_backoff(attempt, WATCH_BACKOFF_BASE_MS, WATCH_BACKOFF_MAX_MS);
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = shutdown.recv() => return,
            }
        }
    }

    fn apply(&self, event: PodEvent) {
        match event.kind {
            PodEventKind::Added | PodEventKind::Modified => {
                // Pods without a routable address stay out of the table
                // until a later event carries one.
                if let Some(address) = event.ready_address(self.target_port) {
                    if self.table.insert(&event.uid, &address) {
                        tracing::info!(uid = %event.uid, addr = %address, "pod registered");
                    }
                }
            }
            PodEventKind::Deleted => {
                if self.table.remove(&event.uid) {
                    tracing::info!(uid = %event.uid, "pod removed");
                }
            }
        }
    }
}

#[async_trait]
impl Grouper for ClusterGrouper {
    fn list(&self, _key: &str) -> Result<Arc<Vec<String>>> {
        let nodes = self.table.healthy_list();
        if nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        Ok(nodes)
    }

    async fn add(&self, _address: &str) -> Result<()> {
        Err(Error::Unsupported("cluster"))
    }

    async fn remove(&self, _address: &str) -> Result<()> {
        Err(Error::Unsupported("cluster"))
    }

    fn nodes(&self) -> BTreeMap<String, NodeStatus> {
        self.table
            .snapshot()
            .into_iter()
            .map(|(id, node)| (id, NodeStatus::from(node.health)))
            .collect()
    }
}
