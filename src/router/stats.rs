//! Throughput and wait-time stats for the diagnostics endpoint.
//!
//! Every completed round trip appends one sample; the stats endpoint drains
//! the log and rolls samples up into per-second, per-(node, key) aggregates.
//! Samples older than a minute are pruned on record so an unwatched log
//! cannot grow without bound.

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

const RETENTION: Duration = Duration::from_secs(60);

/// One per-second aggregate as served by `GET /1/lb/stats`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThroughputStat {
    /// Unix seconds of the aggregated second.
    pub timestamp: u64,
    /// Completed round trips in that second.
    pub tp: u64,
    /// Backend address.
    pub node: String,
    /// Routing key.
    pub func: String,
    /// Mean reported wait in seconds.
    pub wait: f64,
}

#[derive(Debug)]
struct Sample {
    at: SystemTime,
    node: String,
    key: String,
    wait: Duration,
}

/// Append-only sample log with one-minute retention.
#[derive(Debug, Default)]
pub struct StatsLog {
    samples: Mutex<Vec<Sample>>,
}

impl StatsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, node: &str, key: &str, wait: Duration) {
        self.record_at(SystemTime::now(), node, key, wait);
    }

    fn record_at(&self, at: SystemTime, node: &str, key: &str, wait: Duration) {
        let mut samples = self.samples.lock().expect("stats log mutex poisoned");

        // Samples arrive in time order, so expired ones sit at the front.
        if let Some(cutoff) = at.checked_sub(RETENTION) {
            let first_live = samples
                .iter()
                .position(|s| s.at >= cutoff)
                .unwrap_or(samples.len());
            samples.drain(..first_live);
        }

        samples.push(Sample {
            at,
            node: node.to_string(),
            key: key.to_string(),
            wait,
        });
    }

    /// Take everything recorded so far and aggregate it per second and
    /// per (node, key).
    pub fn drain(&self) -> Vec<ThroughputStat> {
        let samples = {
            let mut guard = self.samples.lock().expect("stats log mutex poisoned");
            std::mem::take(&mut *guard)
        };
        rollup(samples)
    }
}

fn rollup(samples: Vec<Sample>) -> Vec<ThroughputStat> {
    use std::collections::BTreeMap;

    let mut buckets: BTreeMap<(u64, String, String), (u64, Duration)> = BTreeMap::new();
    for sample in samples {
        let second = unix_seconds(sample.at);
        let entry = buckets
            .entry((second, sample.node, sample.key))
            .or_insert((0, Duration::ZERO));
        entry.0 += 1;
        entry.1 += sample.wait;
    }

    buckets
        .into_iter()
        .map(|((timestamp, node, func), (tp, total_wait))| ThroughputStat {
            timestamp,
            tp,
            node,
            func,
            wait: total_wait.as_secs_f64() / tp as f64,
        })
        .collect()
}

fn unix_seconds(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
