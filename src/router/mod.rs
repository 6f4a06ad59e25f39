//! Backend selection.
//!
//! # Data Flow
//! ```text
//! routing key
//!     → hash.rs (keyed 64-bit hash → jump bucket)
//!     → consistent.rs (circular scan + load acceptance)
//!     → chosen backend address
//!
//! response
//!     → consistent.rs (wait hint → load.rs EWMA, stats.rs sample)
//! ```
//!
//! # Design Decisions
//! - Selection is a trait so routing policy stays swappable behind the
//!   frontend
//! - The router owns the load table and the stats log; the grouper owns
//!   membership and never sees load

pub mod consistent;
pub mod hash;
pub mod load;
pub mod stats;

use axum::http::HeaderMap;

use crate::error::Result;

pub use consistent::{ChRouter, WAIT_HINT_HEADER};
pub use load::LoadTable;
pub use stats::ThroughputStat;

/// Backend selection policy.
pub trait Router: Send + Sync + 'static {
    /// Pick one address from `nodes` for `key`. `nodes` must be the
    /// currently healthy list, in sorted order; an empty list is an error.
    fn route(&self, nodes: &[String], key: &str) -> Result<String>;

    /// Learn from a completed round trip against `target`. Consumes the
    /// wait hint out of `headers` so it is never relayed to the caller.
    fn intercept_response(&self, target: &str, key: &str, headers: &mut HeaderMap);

    /// Drain accumulated throughput aggregates.
    fn stats(&self) -> Vec<ThroughputStat>;
}
