//! In-memory node store.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{NodeStore, StoreError};

/// Node store backed by process memory. Membership does not survive a
/// restart; used when no store path is configured and throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: Mutex<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn add(&self, address: &str) -> Result<(), StoreError> {
        let mut nodes = self.nodes.lock().expect("node set mutex poisoned");
        nodes.insert(address.to_string());
        Ok(())
    }

    async fn delete(&self, address: &str) -> Result<(), StoreError> {
        let mut nodes = self.nodes.lock().expect("node set mutex poisoned");
        nodes.remove(address);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let nodes = self.nodes.lock().expect("node set mutex poisoned");
        Ok(nodes.iter().cloned().collect())
    }
}
