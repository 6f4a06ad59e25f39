//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → trace.rs (W3C trace context propagation)
//!
//! Consumers:
//!     → Log aggregation (stdout, RUST_LOG filtered)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Whatever tracing backend the fleet runs
//! ```
//!
//! # Design Decisions
//! - Request ID and trace context flow through proxied requests
//! - Metrics are cheap (atomic increments behind the `metrics` macros)
//! - Trace context is parsed and propagated but never sampled locally;
//!   the sampled flag travels through unchanged

pub mod logging;
pub mod metrics;
pub mod trace;
