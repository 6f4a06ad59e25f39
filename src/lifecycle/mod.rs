//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Wire grouper/router → Spawn loops → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Loops exit → Listener drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to every
//!   long-running task
//! - The HTTP listener drains in-flight requests before the process exits

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
