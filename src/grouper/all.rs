//! Static-membership driver: every key may route to every tracked node.
//!
//! # Responsibilities
//! - Seed membership from the persisted store and the configured seed list
//! - Persist management adds and removes before touching the in-memory table
//! - Run the shared probe loop over the tracked set

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use tokio::sync::broadcast;

use crate::config::HealthCheckConfig;
use crate::error::{Error, Result};
use crate::grouper::node::NodeTable;
use crate::grouper::probe::{run_probe_loop, Prober};
use crate::grouper::{Grouper, NodeStatus};
use crate::store::NodeStore;

pub struct AllGrouper {
    table: Arc<NodeTable>,
    store: Arc<dyn NodeStore>,
    prober: Arc<Prober>,
    interval: Duration,
}

impl AllGrouper {
    /// Build the driver, restoring persisted members and registering the
    /// configured seeds. Restored and seeded nodes start `Unknown` and
    /// become routable once probes succeed.
    pub async fn new(
        config: &HealthCheckConfig,
        seeds: &[String],
        store: Arc<dyn NodeStore>,
        client: Client<HttpConnector, Body>,
    ) -> Result<Arc<Self>> {
        let grouper = Arc::new(Self {
            table: Arc::new(NodeTable::new(
                config.healthy_threshold,
                config.unhealthy_threshold,
            )),
            store,
            prober: Arc::new(Prober::new(client, config, false)?),
            interval: Duration::from_secs(config.interval_secs),
        });
        for address in grouper.store.list().await? {
            grouper.table.insert(&address, &address);
        }
        for address in seeds {
            grouper.add(address).await?;
        }
        Ok(grouper)
    }

    /// Probe the tracked set until shutdown fires.
    pub async fn run(self: Arc<Self>, shutdown: broadcast::Receiver<()>) {
        run_probe_loop(
            Arc::clone(&self.table),
            Arc::clone(&self.prober),
            self.interval,
            shutdown,
        )
        .await;
    }
}

#[async_trait]
impl Grouper for AllGrouper {
    fn list(&self, _key: &str) -> Result<Arc<Vec<String>>> {
        let nodes = self.table.healthy_list();
        if nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        Ok(nodes)
    }

    async fn add(&self, address: &str) -> Result<()> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(());
        }
        // Persist first so a crash between the two steps loses at most an
        // unprobed table entry, never a stored one.
        self.store.add(address).await?;
        if self.table.insert(address, address) {
            tracing::info!(addr = %address, "node added");
        }
        Ok(())
    }

    async fn remove(&self, address: &str) -> Result<()> {
        self.store.delete(address).await?;
        if !self.table.remove(address) {
            return Err(Error::UnknownNode(address.to_string()));
        }
        tracing::info!(addr = %address, "node removed");
        Ok(())
    }

    fn nodes(&self) -> BTreeMap<String, NodeStatus> {
        self.table
            .snapshot()
            .into_iter()
            .map(|(id, node)| (id, NodeStatus::from(node.health)))
            .collect()
    }
}
