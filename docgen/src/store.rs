//! Key-value storage scoped to one app installation.
//!
//! The board platform offers a JSON `get/set` store per installation; this
//! module abstracts it behind [`KeyValueStore`] and ships two local backends:
//!
//! - [`MemoryStore`]: process-local, used by tests.
//! - [`FileStore`]: a single JSON object on disk, one top-level key per entry.
//!
//! There are no transactions. Two writers racing on the same key both succeed
//! and the last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// Error type for key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage file {path} is not a JSON object: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a store.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Persistent JSON key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// JSON-file-backed store.
///
/// The whole file is read and rewritten on every operation; the mutex only
/// keeps one process from interleaving partial writes.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }

    /// Get the storage file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn load(&self) -> StoreResult<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: format!("top-level value is {other}"),
            }),
            Err(e) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    async fn save(&self, map: Map<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_err(e))?;
            }
        }
        let json = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_err(e))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.save(map).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(map).await?;
        }
        Ok(())
    }
}
