//! Durable file backend: the document lives in one JSON file.

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tokio::fs;

use super::{StorageBackend, StorageError};

/// Filename for the document blob inside the data directory.
pub const DATA_FILE_NAME: &str = "family-meal-planner-data.json";

/// Suffix for the staging file written before the atomic rename.
const STAGING_SUFFIX: &str = "tmp";

/// Name of the throwaway file written by the capability check.
const PROBE_PREFIX: &str = "write-check";

/// Stores the document as a single file in a data directory.
#[derive(Clone, Debug)]
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `data_dir`. Nothing is touched on disk yet.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the full path of the document file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE_NAME)
    }

    fn staging_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", DATA_FILE_NAME, STAGING_SUFFIX))
    }

    fn probe_path(&self) -> PathBuf {
        self.data_dir
            .join(format!(".{}.{}", PROBE_PREFIX, STAGING_SUFFIX))
    }

    /// Checks if the document file exists on disk.
    pub async fn exists(&self) -> bool {
        fs::try_exists(self.path()).await.unwrap_or(false)
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    /// The data directory can be created and a file written into it.
    async fn is_available(&self) -> bool {
        if fs::create_dir_all(&self.data_dir).await.is_err() {
            return false;
        }

        let probe = self.probe_path();
        if let Err(e) = fs::write(&probe, b"").await {
            tracing::debug!("Data directory {} is not writable: {}", self.data_dir.display(), e);
            return false;
        }
        if let Err(e) = fs::remove_file(&probe).await {
            tracing::warn!("Failed to remove write probe {}: {}", probe.display(), e);
        }
        true
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        let path = self.path();

        match fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    /// Writes to a staging file, then renames it over the document so a
    /// failed write never leaves a torn file behind.
    async fn write(&self, blob: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;

        let staging = self.staging_path();
        fs::write(&staging, blob)
            .await
            .map_err(|e| StorageError::Io(staging.clone(), e))?;

        let path = self.path();
        fs::rename(&staging, &path)
            .await
            .map_err(|e| StorageError::Io(path, e))?;

        Ok(())
    }

    async fn delete(&self) -> Result<(), StorageError> {
        let path = self.path();

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }
}
