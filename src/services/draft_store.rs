//! Local key-value store for drafts that survive restarts.
//!
//! Values are JSON, kept in memory and rewritten to a single file on every
//! change (temp file + rename) through `tokio::fs`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

/// Key under which the manual-markdown draft is stored.
pub const MANUAL_MARKDOWN_KEY: &str = "glass-manual-markdown";

/// Draft store errors.
#[derive(Debug, thiserror::Error)]
pub enum DraftStoreError {
    #[error("Draft store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Draft store contains invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed JSON key-value store.
#[derive(Clone)]
pub struct DraftStore {
    path: PathBuf,
    values: Arc<Mutex<Map<String, JsonValue>>>,
    /// Serializes file writes so they land in mutation order.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl DraftStore {
    fn with_values(path: PathBuf, values: Map<String, JsonValue>) -> Self {
        Self {
            path,
            values: Arc::new(Mutex::new(values)),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DraftStoreError> {
        let path = path.into();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Map::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened draft store {} ({} keys)", path.display(), values.len());

        Ok(Self::with_values(path, values))
    }

    /// Open the store, falling back to an empty one (not persisted until the
    /// next write) when the file is unreadable.
    pub async fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Failed to load draft store {}: {}", path.display(), e);
                Self::with_values(path, Map::new())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a value, or `None` if absent or of a different shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values().get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Failed to decode draft '{}': {}", key, e);
                None
            }
        }
    }

    /// Store a value and persist the whole map.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DraftStoreError> {
        let value = serde_json::to_value(value)?;
        let _write = self.write_lock.lock().await;
        let bytes = {
            let mut values = self.values();
            values.insert(key.to_string(), value);
            serde_json::to_vec_pretty(&*values)?
        };
        self.persist(bytes).await
    }

    /// Remove a value and persist. Removing a missing key is a no-op.
    pub async fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        let _write = self.write_lock.lock().await;
        let bytes = {
            let mut values = self.values();
            if values.remove(key).is_none() {
                return Ok(());
            }
            serde_json::to_vec_pretty(&*values)?
        };
        self.persist(bytes).await
    }

    fn values(&self) -> MutexGuard<'_, Map<String, JsonValue>> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn persist(&self, bytes: Vec<u8>) -> Result<(), DraftStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
