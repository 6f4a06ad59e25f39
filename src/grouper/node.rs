//! Node records and the published healthy list.
//!
//! # Responsibilities
//! - Track per-node health and consecutive-outcome counters
//! - Serialize health transitions under one table lock
//! - Publish the sorted healthy-address slice on transitions only
//!
//! # Design Decisions
//! - Readers never touch the lock: the healthy list is swapped atomically
//!   (`arc-swap`) and every `healthy_list()` call sees a complete snapshot
//! - Entries are keyed by a stable identifier; for explicitly managed nodes
//!   it is the address itself, for orchestrator pods it is the pod uid

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;

/// Health of one backend node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Tracked but not yet probed to a verdict.
    Unknown,
    Healthy,
    Unhealthy,
}

impl Health {
    pub fn is_healthy(self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// One tracked backend.
#[derive(Debug, Clone)]
pub struct BackendNode {
    pub address: String,
    pub health: Health,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl BackendNode {
    fn new(address: String) -> Self {
        Self {
            address,
            health: Health::Unknown,
            consecutive_successes: 0,
            consecutive_failures: 0,
        }
    }
}

/// Identifier-keyed node map plus the derived healthy-address slice.
#[derive(Debug)]
pub struct NodeTable {
    nodes: Mutex<HashMap<String, BackendNode>>,
    healthy: ArcSwap<Vec<String>>,
    healthy_threshold: u32,
    unhealthy_threshold: u32,
}

impl NodeTable {
    pub fn new(healthy_threshold: u32, unhealthy_threshold: u32) -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            healthy: ArcSwap::from_pointee(Vec::new()),
            healthy_threshold,
            unhealthy_threshold,
        }
    }

    /// Track `address` under `id`. Returns false when the identifier already
    /// maps to this address. A changed address replaces the entry and its
    /// health starts over at `Unknown`.
    pub fn insert(&self, id: &str, address: &str) -> bool {
        let mut nodes = self.lock();
        let prior = nodes.get(id).map(|n| (n.address.clone(), n.health));
        match prior {
            Some((existing, _)) if existing == address => false,
            prior => {
                nodes.insert(id.to_string(), BackendNode::new(address.to_string()));
                if matches!(prior, Some((_, Health::Healthy))) {
                    self.publish(&nodes);
                }
                true
            }
        }
    }

    /// Stop tracking `id`, dropping all counter state. Returns false when
    /// the identifier was not tracked.
    pub fn remove(&self, id: &str) -> bool {
        let mut nodes = self.lock();
        match nodes.remove(id) {
            Some(node) => {
                if node.health.is_healthy() {
                    self.publish(&nodes);
                }
                true
            }
            None => false,
        }
    }

    /// Feed one successful probe outcome. Returns the new health when this
    /// outcome caused a transition.
    pub fn record_success(&self, id: &str) -> Option<Health> {
        let mut nodes = self.lock();
        let node = nodes.get_mut(id)?;
        node.consecutive_failures = 0;
        node.consecutive_successes = node.consecutive_successes.saturating_add(1);
        let transitions =
            node.health != Health::Healthy && node.consecutive_successes >= self.healthy_threshold;
        if !transitions {
            return None;
        }
        node.health = Health::Healthy;
        self.publish(&nodes);
        Some(Health::Healthy)
    }

    /// Feed one failed probe outcome. A node that was never healthy goes
    /// `Unhealthy` on its first failure; an established `Healthy` node only
    /// flips once the failure threshold is met.
    pub fn record_failure(&self, id: &str) -> Option<Health> {
        let mut nodes = self.lock();
        let node = nodes.get_mut(id)?;
        node.consecutive_successes = 0;
        node.consecutive_failures = node.consecutive_failures.saturating_add(1);
        let transitions = match node.health {
            Health::Unknown => true,
            Health::Healthy => node.consecutive_failures >= self.unhealthy_threshold,
            Health::Unhealthy => false,
        };
        if !transitions {
            return None;
        }
        node.health = Health::Unhealthy;
        self.publish(&nodes);
        Some(Health::Unhealthy)
    }

    /// Current healthy addresses, sorted. Lock-free snapshot.
    pub fn healthy_list(&self) -> Arc<Vec<String>> {
        self.healthy.load_full()
    }

    /// Clone of every tracked node, keyed by identifier, sorted.
    pub fn snapshot(&self) -> BTreeMap<String, BackendNode> {
        self.lock()
            .iter()
            .map(|(id, node)| (id.clone(), node.clone()))
            .collect()
    }

    /// (identifier, address) pairs for the probe walk.
    pub fn targets(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .map(|(id, node)| (id.clone(), node.address.clone()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BackendNode>> {
        self.nodes.lock().expect("node table mutex poisoned")
    }

    // Rebuild and swap in the healthy slice. Callers hold the table lock,
    // which serializes publishes; readers keep whatever snapshot they
    // already loaded.
    fn publish(&self, nodes: &HashMap<String, BackendNode>) {
        let mut healthy: Vec<String> = nodes
            .values()
            .filter(|n| n.health.is_healthy())
            .map(|n| n.address.clone())
            .collect();
        healthy.sort();
        self.healthy.store(Arc::new(healthy));
    }
}
