//! Backend membership: which nodes exist and which are routable.
//!
//! # Data Flow
//! 1. Nodes enter the table from the management API, the persisted store,
//!    or an orchestrator pod watch, depending on the driver
//! 2. The probe loop feeds success/failure outcomes into the table
//! 3. The table republishes its sorted healthy-address slice on every
//!    health transition
//! 4. The proxy path reads that slice lock-free on each request
//!
//! # Design Decisions
//! - Two drivers share one node table and one probe loop; they differ only
//!   in where membership changes come from
//! - `list` returns a shared snapshot so a concurrent transition can never
//!   tear the slice a request is routing over

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

mod all;
mod cluster;
mod node;
mod probe;
mod watch;

pub use all::AllGrouper;
pub use cluster::ClusterGrouper;
pub use node::{BackendNode, Health, NodeTable};
pub use watch::{PodEvent, PodEventKind, PodPhase, PodWatch, WatchError};

/// Routability of a node as reported by the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
}

impl From<Health> for NodeStatus {
    fn from(health: Health) -> Self {
        if health.is_healthy() {
            NodeStatus::Online
        } else {
            NodeStatus::Offline
        }
    }
}

/// Membership source for the proxy.
#[async_trait]
pub trait Grouper: Send + Sync + 'static {
    /// Healthy candidate addresses for one request. The key is available
    /// for drivers that partition membership; the built-in drivers return
    /// the same slice for every key.
    fn list(&self, key: &str) -> Result<Arc<Vec<String>>>;

    /// Start tracking a node address.
    async fn add(&self, address: &str) -> Result<()>;

    /// Stop tracking a node address.
    async fn remove(&self, address: &str) -> Result<()>;

    /// Every tracked node and its routability, sorted by identifier.
    fn nodes(&self) -> BTreeMap<String, NodeStatus>;
}
