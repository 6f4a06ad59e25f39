//! Per-(node, key) load estimation.
//!
//! The router's acceptance test reads these estimates on every request, and
//! every completed round trip writes one back, so the table is sharded
//! (`DashMap`) and each estimate is a lone atomic. Updates to the same pair
//! go through a compare-and-swap fold rather than a lock; two racing first
//! observations keep one sample and later updates fold normally.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

/// Weight of the newest sample in the moving average.
const DECAY: f64 = 0.1;

/// Concurrent map from (node address, routing key) to an EWMA of the
/// backend-reported wait, stored as integer nanoseconds.
#[derive(Debug, Default)]
pub struct LoadTable {
    samples: DashMap<String, AtomicU64>,
}

impl LoadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observed wait into the estimate for `(node, key)`. The first
    /// observation becomes the estimate as-is; there is no synthetic
    /// warm-up value.
    pub fn observe(&self, node: &str, key: &str, sample: Duration) {
        let nanos = duration_to_nanos(sample);
        let entry_key = load_key(node, key);

        if let Some(cell) = self.samples.get(&entry_key) {
            let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old| {
                Some(ewma(old, nanos))
            });
            return;
        }
        self.samples
            .entry(entry_key)
            .or_insert_with(|| AtomicU64::new(nanos));
    }

    /// Current estimate for `(node, key)`; zero when nothing has been
    /// observed yet, which the acceptance test reads as "unloaded".
    pub fn get(&self, node: &str, key: &str) -> Duration {
        self.samples
            .get(&load_key(node, key))
            .map(|cell| Duration::from_nanos(cell.load(Ordering::Relaxed)))
            .unwrap_or(Duration::ZERO)
    }
}

fn ewma(old: u64, sample: u64) -> u64 {
    (sample as f64 * DECAY + old as f64 * (1.0 - DECAY)) as u64
}

// NUL cannot appear in a host:port, so it cleanly separates node from key.
fn load_key(node: &str, key: &str) -> String {
    format!("{}\0{}", node, key)
}

fn duration_to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_taken_verbatim() {
        let table = LoadTable::new();
        table.observe("10.0.0.1:8080", "/fn/hello", Duration::from_millis(45));
        assert_eq!(
            table.get("10.0.0.1:8080", "/fn/hello"),
            Duration::from_millis(45)
        );
    }

    #[test]
    fn unobserved_pair_reads_zero() {
        let table = LoadTable::new();
        assert_eq!(table.get("10.0.0.1:8080", "/fn/hello"), Duration::ZERO);
    }

    #[test]
    fn converges_toward_a_steady_sample() {
        let table = LoadTable::new();
        let target = Duration::from_millis(1);

        // Start the estimate at twice the steady value, then feed the
        // steady value. decay 0.1 closes the gap to under 1% in 44 rounds.
        table.observe("n", "k", Duration::from_millis(2));
        for _ in 0..44 {
            table.observe("n", "k", target);
        }

        let estimate = table.get("n", "k");
        let error = estimate.abs_diff(target);
        assert!(
            error <= target / 100,
            "estimate {:?} not within 1% of {:?}",
            estimate,
            target
        );
    }

    #[test]
    fn pairs_are_independent() {
        let table = LoadTable::new();
        table.observe("a:1", "/x", Duration::from_secs(3));
        assert_eq!(table.get("a:1", "/y"), Duration::ZERO);
        assert_eq!(table.get("b:1", "/x"), Duration::ZERO);
    }

    #[test]
    fn separator_keeps_adjacent_names_apart() {
        let table = LoadTable::new();
        table.observe("node1", "1key", Duration::from_secs(1));
        assert_eq!(table.get("node11", "key"), Duration::ZERO);
    }

    #[test]
    fn concurrent_updates_do_not_lose_the_entry() {
        let table = std::sync::Arc::new(LoadTable::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    table.observe("n:1", "/k", Duration::from_millis(10));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // Every thread fed the same constant, so whatever interleaving
        // happened the estimate must have settled on it.
        assert_eq!(table.get("n:1", "/k"), Duration::from_millis(10));
    }
}
