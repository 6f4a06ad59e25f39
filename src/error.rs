//! Crate-wide error type.
//!
//! The grouper, router, and proxy frontend all need to agree on a few
//! conditions (most importantly "no healthy nodes") without string matching,
//! so they share one enum instead of per-module error types.

use thiserror::Error;

use crate::store::StoreError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The healthy-node list is empty. The frontend maps this to a
    /// gateway-unavailable response.
    #[error("no nodes available")]
    NoNodes,

    /// The operation is not supported by the active membership driver
    /// (e.g. manual add/remove on the cluster-watch grouper).
    #[error("operation not supported by the {0} grouper")]
    Unsupported(&'static str),

    /// The address is not tracked by the grouper.
    #[error("node {0} not found")]
    UnknownNode(String),

    /// Node persistence failed.
    #[error("node store: {0}")]
    Store(#[from] StoreError),

    /// Configuration was structurally valid but semantically unusable.
    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// True when the error means the healthy-node list was empty.
    pub fn is_no_nodes(&self) -> bool {
        matches!(self, Error::NoNodes)
    }
}
