//! Per-source throttle markers and the last-write diagnostic record.
//!
//! The sink owns no global state; it is handed a `MarkerStore` so tests can
//! substitute an in-memory map for the file-backed one.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Key prefix for a source's last persisted slot; full key is
/// `last_slot_<source_id>`.
pub const LAST_SLOT_PREFIX: &str = "last_slot_";
/// Key holding the serialized [`LastWrite`] record.
pub const LAST_WRITE_KEY: &str = "last_write";

/// Diagnostic record of the most recent acknowledged write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastWrite {
    pub at: String,
    pub slot_key: String,
    pub source_id: String,
}

#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed marker store: one small JSON object per data directory.
pub struct FsMarkerStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FsMarkerStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    }

    fn save(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(map)?)?;
        Ok(())
    }
}

#[async_trait]
impl MarkerStore for FsMarkerStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load()?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load()?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map)
    }
}

/// In-memory marker store for tests and embedded use.
#[derive(Default)]
pub struct InMemoryMarkerStore {
    map: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl MarkerStore for InMemoryMarkerStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip() {
        let store = InMemoryMarkerStore::default();
        assert_eq!(store.get("last_slot_cart_log").await.unwrap(), None);
        store.set("last_slot_cart_log", "2024-06-01:09:20").await.unwrap();
        assert_eq!(
            store.get("last_slot_cart_log").await.unwrap().as_deref(),
            Some("2024-06-01:09:20")
        );
    }

    #[tokio::test]
    async fn fs_store_persists_between_instances() {
        let dir = std::env::temp_dir().join("shopwatch-marker-test");
        let path = dir.join("markers.json");
        let _ = std::fs::remove_file(&path);

        let store = FsMarkerStore::new(path.clone());
        store.set("last_slot_flow_source", "2024-06-01:10:00").await.unwrap();
        drop(store);

        let reopened = FsMarkerStore::new(path);
        assert_eq!(
            reopened.get("last_slot_flow_source").await.unwrap().as_deref(),
            Some("2024-06-01:10:00")
        );
    }
}
