//! Simple key-value backend, the universal fallback.
//!
//! Values are strings stored under a fixed key. The map lives in memory,
//! optionally mirrored to a single JSON object file so it survives restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

use super::{StorageBackend, StorageError};

/// Key under which the document blob is stored.
pub const DATA_KEY: &str = "familyMealPlannerData";

/// Filename for the persistent key-value map.
pub const KV_FILE_NAME: &str = "kv-store.json";

/// A string key-value map holding the document under [`DATA_KEY`].
#[derive(Debug)]
pub struct KeyValueBackend {
    entries: Mutex<Option<HashMap<String, String>>>,
    mirror: Option<PathBuf>,
}

impl KeyValueBackend {
    /// A map that only lives as long as this process.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Some(HashMap::new())),
            mirror: None,
        }
    }

    /// A map mirrored to `path`, loaded lazily on first access.
    pub fn persistent(path: PathBuf) -> Self {
        Self {
            entries: Mutex::new(None),
            mirror: Some(path),
        }
    }

    /// Returns the mirror file path, if any.
    pub fn mirror_path(&self) -> Option<&PathBuf> {
        self.mirror.as_ref()
    }

    async fn load_mirror(&self) -> Result<HashMap<String, String>, StorageError> {
        let Some(path) = &self.mirror else {
            return Ok(HashMap::new());
        };

        match fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StorageError::Corrupt(path.clone(), e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StorageError::Io(path.clone(), e)),
        }
    }

    async fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let Some(path) = &self.mirror else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(parent.to_path_buf(), e))?;
        }

        let contents = serde_json::to_string(entries)
            .map_err(|e| StorageError::Corrupt(path.clone(), e.to_string()))?;
        fs::write(path, contents)
            .await
            .map_err(|e| StorageError::Io(path.clone(), e))
    }
}

#[async_trait]
impl StorageBackend for KeyValueBackend {
    fn name(&self) -> &'static str {
        "key-value"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_mirror().await?);
        }
        Ok(guard
            .as_ref()
            .and_then(|entries| entries.get(DATA_KEY).cloned()))
    }

    async fn write(&self, blob: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().await;
        let mut entries = match guard.take() {
            Some(entries) => entries,
            None => self.load_mirror().await?,
        };
        entries.insert(DATA_KEY.to_string(), blob.to_string());

        let flushed = self.flush(&entries).await;
        *guard = Some(entries);
        flushed
    }

    async fn delete(&self) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().await;
        let mut entries = match guard.take() {
            Some(entries) => entries,
            None => self.load_mirror().await?,
        };
        entries.remove(DATA_KEY);

        let flushed = self.flush(&entries).await;
        *guard = Some(entries);
        flushed
    }
}
