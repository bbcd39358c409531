//! Durable key-value storage shared by every tab.
//!
//! Two keys matter: the primary snapshot and the synchronization slot. The
//! slot is a last-value register; writers replace it wholesale and readers
//! never block them.

use crate::error::StorageError;
use crate::protocol::SyncRecord;
use crate::state::PersistedState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key holding the persisted snapshot
pub const STATE_KEY: &str = "quiz-game-state";
/// Key holding the most recent synchronization record
pub const SYNC_KEY: &str = "quiz-game-sync";

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// One JSON file per key inside a directory. Several processes may share the directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the store directory
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        // Write aside then rename, so readers in other processes never see half a value
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", key, ulid::Ulid::new()));
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Read the persisted snapshot. Absent, unreadable, malformed or invalid
/// content all yield `None`; the caller falls back to defaults.
pub async fn load_snapshot(store: &dyn KvStore) -> Option<PersistedState> {
    let raw = match store.get(STATE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Could not read persisted state: {}", e);
            return None;
        }
    };

    let snapshot: PersistedState = match serde_json::from_str(&raw) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("Ignoring malformed persisted state: {}", e);
            return None;
        }
    };

    if let Err(e) = snapshot.validate() {
        tracing::warn!("Ignoring persisted state: {}", e);
        return None;
    }
    Some(snapshot.with_builtin_sounds())
}

pub async fn save_snapshot(
    store: &dyn KvStore,
    snapshot: &PersistedState,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(snapshot)?;
    store.set(STATE_KEY, &json).await
}

/// Read the synchronization slot. Absent or malformed content means "no pending update".
pub async fn read_sync_record(store: &dyn KvStore) -> Option<SyncRecord> {
    let raw = match store.get(SYNC_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Sync slot unavailable: {}", e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("Skipping malformed sync record: {}", e);
            None
        }
    }
}

pub async fn write_sync_record(store: &dyn KvStore, record: &SyncRecord) -> Result<(), StorageError> {
    let json = serde_json::to_string(record)?;
    store.set(SYNC_KEY, &json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SyncAction;

    fn record(timestamp: i64) -> SyncRecord {
        SyncRecord {
            action: SyncAction::ShowAnswer {},
            timestamp,
            origin: Some("tab-a".to_string()),
            seq: 1,
        }
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).await.unwrap();

        assert_eq!(store.get("alpha").await.unwrap(), None);
        store.set("alpha", "{\"a\":1}").await.unwrap();
        assert_eq!(store.get("alpha").await.unwrap().as_deref(), Some("{\"a\":1}"));

        store.set("alpha", "{\"a\":2}").await.unwrap();
        assert_eq!(store.get("alpha").await.unwrap().as_deref(), Some("{\"a\":2}"));

        store.remove("alpha").await.unwrap();
        store.remove("alpha").await.unwrap();
        assert_eq!(store.get("alpha").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_two_file_stores_share_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileStore::open(dir.path()).await.unwrap();
        let reader = FileStore::open(dir.path()).await.unwrap();

        write_sync_record(&writer, &record(7)).await.unwrap();
        assert_eq!(read_sync_record(&reader).await, Some(record(7)));
    }

    #[tokio::test]
    async fn test_keys_are_checked() {
        let store = MemoryStore::new();
        let result = store.set("../escape", "x").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_malformed_sync_record_is_no_update() {
        let store = MemoryStore::new();
        assert_eq!(read_sync_record(&store).await, None);

        store.set(SYNC_KEY, "{not json").await.unwrap();
        assert_eq!(read_sync_record(&store).await, None);

        store
            .set(SYNC_KEY, r#"{"action":{"type":"NOPE","payload":{}},"timestamp":1}"#)
            .await
            .unwrap();
        assert_eq!(read_sync_record(&store).await, None);
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_and_fallbacks() {
        let store = MemoryStore::new();
        assert!(load_snapshot(&store).await.is_none());

        let snapshot = PersistedState::default();
        save_snapshot(&store, &snapshot).await.unwrap();
        assert_eq!(load_snapshot(&store).await, Some(snapshot));

        store.set(STATE_KEY, "[]").await.unwrap();
        assert!(load_snapshot(&store).await.is_none());
    }
}
