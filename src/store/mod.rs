//! Node membership persistence.
//!
//! The static grouper keeps its explicit node list durable through the
//! [`NodeStore`] contract: three operations over any keyed store. Adapters
//! here cover the in-memory case (tests, ephemeral deployments) and a JSON
//! file. Duplicate adds are idempotent and deleting an absent address is a
//! no-op, so the grouper never has to pre-check the store.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors produced by node-store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistence contract for the static grouper's node list.
#[async_trait]
pub trait NodeStore: Send + Sync + 'static {
    /// Record an address. Adding an address twice is not an error.
    async fn add(&self, address: &str) -> Result<(), StoreError>;

    /// Forget an address. Deleting an absent address is not an error.
    async fn delete(&self, address: &str) -> Result<(), StoreError>;

    /// Return every recorded address.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}
