//! Load-aware consistent-hash routing.
//!
//! # Responsibilities
//! - Map a routing key onto the healthy node list via jump hashing
//! - Steer around loaded nodes with a probabilistic acceptance test
//! - Learn backend load from the wait hint on each response
//!
//! # Design Decisions
//! - Acceptance never reaches zero, so no node is permanently unreachable
//! - The scan is capped; after 64 full sweeps the jump choice is forced
//! - The wait-hint header is stripped before the response is relayed

use std::time::Duration;

use axum::http::HeaderMap;

use crate::error::{Error, Result};
use crate::router::hash::{hash_key, jump_hash};
use crate::router::load::LoadTable;
use crate::router::stats::{StatsLog, ThroughputStat};
use crate::router::Router;

/// Response header carrying the backend's self-reported queue wait,
/// formatted as a duration string such as `45ms`.
pub const WAIT_HINT_HEADER: &str = "x-fnproxy-wait";

// Estimates below the lower bound are accepted outright; above the upper
// bound acceptance bottoms out at 10%. Between the two, acceptance slides
// linearly from 40% down to 10%.
const LOWER_LATENCY: Duration = Duration::from_millis(500);
const UPPER_LATENCY: Duration = Duration::from_secs(2);
const MIN_ACCEPT_PCT: u32 = 10;
const MAX_ACCEPT_PCT: u32 = 40;

/// Upper bound on full passes over the candidate list before the jump
/// choice is accepted unconditionally. At the 10% floor a single node
/// survives 64 draws with probability 0.9^64, about one in a thousand.
const MAX_SWEEPS: usize = 64;

/// Consistent-hash router with per-(node, key) load steering.
#[derive(Debug, Default)]
pub struct ChRouter {
    load: LoadTable,
    stats: StatsLog,
}

impl ChRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acceptance percentage for a given load estimate.
    fn accept_pct(load: Duration) -> u32 {
        if load < LOWER_LATENCY {
            return 100;
        }
        if load > UPPER_LATENCY {
            return MIN_ACCEPT_PCT;
        }
        let span = (UPPER_LATENCY - LOWER_LATENCY).as_nanos();
        let over = (load - LOWER_LATENCY).as_nanos();
        let slide = over * (MAX_ACCEPT_PCT - MIN_ACCEPT_PCT) as u128 / span;
        MAX_ACCEPT_PCT - slide as u32
    }

    fn accept(&self, node: &str, key: &str) -> bool {
        let pct = Self::accept_pct(self.load.get(node, key));
        pct >= 100 || fastrand::u32(0..100) < pct
    }

    /// Circular scan from the jump index, bounded by [`MAX_SWEEPS`].
    fn best(&self, nodes: &[String], key: &str, start: usize) -> String {
        let mut i = start;
        for _ in 0..nodes.len().saturating_mul(MAX_SWEEPS) {
            if self.accept(&nodes[i], key) {
                return nodes[i].clone();
            }
            i += 1;
            if i == nodes.len() {
                i = 0;
            }
        }
        nodes[start].clone()
    }
}

impl Router for ChRouter {
    fn route(&self, nodes: &[String], key: &str) -> Result<String> {
        if nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        let start = jump_hash(hash_key(key), nodes.len());
        Ok(self.best(nodes, key, start))
    }

    fn intercept_response(&self, target: &str, key: &str, headers: &mut HeaderMap) {
        // remove() both strips the hint from the relayed response and hands
        // back its value. A missing or unparseable hint reads as zero load.
        let wait = headers
            .remove(WAIT_HINT_HEADER)
            .and_then(|v| v.to_str().map(str::to_owned).ok())
            .and_then(|s| humantime::parse_duration(&s).ok())
            .unwrap_or(Duration::ZERO);

        self.load.observe(target, key, wait);
        self.stats.record(target, key, wait);
    }

    fn stats(&self) -> Vec<ThroughputStat> {
        self.stats.drain()
    }
}
