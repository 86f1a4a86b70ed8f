//! Raw blob storage for the planner document.
//!
//! The whole document is one opaque JSON blob. Two interchangeable backends
//! can hold it:
//! - [`FileBackend`]: durable, one file in a data directory (preferred)
//! - [`KeyValueBackend`]: a string key-value map, always available (fallback)
//!
//! [`FallbackStorage`] probes the preferred backend once and routes reads
//! and writes through it, falling back on failure.
//!
//! Storage layout:
//! ```text
//! ~/.local/share/family-meal-planner/
//! ├── family-meal-planner-data.json   # FileBackend blob
//! └── kv-store.json                   # persistent KeyValueBackend map
//! ```

mod backend;
mod fallback;
mod file;
mod kv;

pub use backend::StorageBackend;
pub use fallback::FallbackStorage;
pub use file::{FileBackend, DATA_FILE_NAME};
pub use kv::{KeyValueBackend, DATA_KEY, KV_FILE_NAME};

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during backend operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    #[error("I/O error for {}: {1}", .0.display())]
    Io(PathBuf, #[source] io::Error),

    /// The backend cannot be used on this platform/configuration.
    #[error("{0} backend is not available")]
    NotAvailable(&'static str),

    /// The key-value map on disk could not be parsed.
    #[error("Key-value store {} is corrupt: {1}", .0.display())]
    Corrupt(PathBuf, String),

    /// Every configured backend failed.
    #[error("All storage backends failed: {0}")]
    Unavailable(String),
}

#[cfg(test)]
pub(crate) mod testing {
    //! Backends with scripted failures for exercising fallback paths.

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{KeyValueBackend, StorageBackend, StorageError};

    /// Wraps an in-memory backend and fails the operations it is told to.
    pub struct ScriptedBackend {
        inner: KeyValueBackend,
        pub available: bool,
        pub fail_reads: bool,
        pub fail_writes: bool,
        pub reads: AtomicUsize,
        pub writes: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn healthy() -> Self {
            Self {
                inner: KeyValueBackend::in_memory(),
                available: true,
                fail_reads: false,
                fail_writes: false,
                reads: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
            }
        }

        pub fn failing_writes() -> Self {
            Self {
                fail_writes: true,
                ..Self::healthy()
            }
        }

        pub fn failing_reads() -> Self {
            Self {
                fail_reads: true,
                ..Self::healthy()
            }
        }

        pub fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::healthy()
            }
        }

        pub fn shared(self) -> Arc<Self> {
            Arc::new(self)
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub async fn seed(&self, blob: &str) {
            self.inner.write(blob).await.unwrap();
        }

        pub async fn peek(&self) -> Option<String> {
            self.inner.read().await.unwrap()
        }
    }

    #[async_trait]
    impl StorageBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn read(&self) -> Result<Option<String>, StorageError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent loaders genuinely overlap.
            tokio::task::yield_now().await;
            if self.fail_reads {
                return Err(StorageError::NotAvailable("scripted"));
            }
            self.inner.read().await
        }

        async fn write(&self, blob: &str) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StorageError::NotAvailable("scripted"));
            }
            self.inner.write(blob).await
        }

        async fn delete(&self) -> Result<(), StorageError> {
            self.inner.delete().await
        }
    }
}
