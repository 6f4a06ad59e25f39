//! JSON file node store.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{NodeStore, StoreError};

/// Node store backed by a JSON file (an array of addresses). The full set is
/// held in memory and the file is rewritten on every mutation; membership
/// lists stay small enough that incremental writes are not worth it.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    nodes: Mutex<BTreeSet<String>>,
}

impl FileStore {
    /// Open a store at `path`, loading any previously persisted addresses.
    /// A missing file is an empty store; an unreadable one is an error so a
    /// corrupt membership list never silently becomes "no nodes".
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let nodes = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<String> = serde_json::from_slice(&bytes)?;
                list.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            nodes: Mutex::new(nodes),
        })
    }

    /// Rewrite the whole file through a temp-and-rename so a crash mid-write
    /// leaves the previous membership list intact.
    async fn flush(&self, nodes: &BTreeSet<String>) -> Result<(), StoreError> {
        let list: Vec<&String> = nodes.iter().collect();
        let bytes = serde_json::to_vec_pretty(&list)?;
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl NodeStore for FileStore {
    async fn add(&self, address: &str) -> Result<(), StoreError> {
        let mut nodes = self.nodes.lock().await;
        if nodes.insert(address.to_string()) {
            self.flush(&nodes).await?;
        }
        Ok(())
    }

    async fn delete(&self, address: &str) -> Result<(), StoreError> {
        let mut nodes = self.nodes.lock().await;
        if nodes.remove(address) {
            self.flush(&nodes).await?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let nodes = self.nodes.lock().await;
        Ok(nodes.iter().cloned().collect())
    }
}
