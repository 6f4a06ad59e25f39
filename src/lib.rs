//! Routing and membership front door for a fleet of function nodes.
//!
//! The proxy sits in front of stateless function-execution servers. It
//! tracks which nodes exist and which are healthy (the grouper), picks one
//! per request with a consistent hash biased away from slow nodes (the
//! router), and forwards traffic with bodies streaming both ways (the
//! proxy frontend). A small management API adds and removes nodes at
//! runtime and exposes recent throughput.

pub mod config;
pub mod error;
pub mod grouper;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod router;
pub mod store;

pub use config::ProxyConfig;
pub use error::{Error, Result};
pub use lifecycle::Shutdown;
pub use proxy::ProxyServer;
