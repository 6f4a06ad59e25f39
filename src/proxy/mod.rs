//! HTTP front door: the proxy path and the management API.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (axum setup, request ID, trace context)
//!     → /1/lb/* lands in api.rs (membership and stats handlers)
//!     → everything else: grouper lists healthy nodes,
//!       router picks one for the routing key,
//!       request is forwarded with a rewritten authority,
//!       response headers are intercepted and relayed
//! ```
//!
//! # Design Decisions
//! - The proxy path carries no timeout layer; function invocations may
//!   legitimately outlive any fixed deadline, so only management routes
//!   get one
//! - Request bodies stream through untouched; only the no-nodes error
//!   path reads the body out before answering

pub mod api;
pub mod server;

pub use server::{AppState, KeyFn, ProxyServer};
