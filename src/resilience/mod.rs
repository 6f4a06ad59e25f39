//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Pod watch stream drops:
//!     → backoff.rs (delay grows per attempt, jittered, capped)
//!     → reconnect; a productive stream resets the attempt counter
//! ```
//!
//! # Design Decisions
//! - Proxied requests are never retried here; the caller owns retry
//!   semantics for function invocations
//! - Jitter keeps a fleet of proxies from reconnecting in lockstep

pub mod backoff;
