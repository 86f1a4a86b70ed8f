//! The document store: one cached document, loaded once, saved through
//! the storage backends.
//!
//! # Load
//!
//! The first `load` performs exactly one storage read; concurrent callers
//! wait on the same in-flight load. The loaded blob is migrated to the
//! current schema before typed decoding. If nothing is stored, a default
//! document is created and persisted.
//!
//! # Save
//!
//! `save` replaces the cache before persisting, so later reads in this
//! process see the new state even if persistence fails. Persist failures
//! are logged and reported as `false`; the in-memory state is kept and may
//! be lost when the process exits. At most one backend write is in flight.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};

use crate::config::{BackendPreference, Config};
use crate::error::PlannerError;
use crate::migration::{MigrationEngine, MigrationRecord};
use crate::models::AppDocument;
use crate::storage::{FallbackStorage, FileBackend, KeyValueBackend, StorageBackend};

/// Owner of the in-memory document and its persistence.
pub struct DocumentStore {
    storage: FallbackStorage,
    migrations: MigrationEngine,
    cache: Mutex<Option<AppDocument>>,
    loaded: OnceCell<()>,
    write_queue: AsyncMutex<()>,
}

impl DocumentStore {
    pub fn new(storage: FallbackStorage) -> Self {
        Self {
            storage,
            migrations: MigrationEngine::new(),
            cache: Mutex::new(None),
            loaded: OnceCell::new(),
            write_queue: AsyncMutex::new(()),
        }
    }

    /// Store over a preferred backend with a fallback.
    pub fn with_backends(
        preferred: Arc<dyn StorageBackend>,
        fallback: Arc<dyn StorageBackend>,
    ) -> Self {
        Self::new(FallbackStorage::new(preferred, fallback))
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self::new(FallbackStorage::single(Arc::new(KeyValueBackend::in_memory())))
    }

    /// Builds the backend pair described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        let file = || Arc::new(FileBackend::new(config.data_dir.value.clone()));
        let kv = || Arc::new(KeyValueBackend::persistent(config.key_value_path()));

        let storage = match config.backend.value {
            BackendPreference::Auto => FallbackStorage::new(file(), kv()),
            BackendPreference::File => FallbackStorage::single(file()),
            BackendPreference::KeyValue => FallbackStorage::single(kv()),
            BackendPreference::Memory => {
                FallbackStorage::single(Arc::new(KeyValueBackend::in_memory()))
            }
        };
        tracing::debug!(
            "Document store configured with {} backend in {}",
            config.backend.value,
            config.data_dir.value.display()
        );
        Self::new(storage)
    }

    /// Returns the document, loading it on first use.
    pub async fn load(&self) -> AppDocument {
        self.loaded.get_or_init(|| self.initialize()).await;
        self.cache.lock().clone().unwrap_or_default()
    }

    /// Replaces the cached document and persists it.
    ///
    /// Stamps `last_updated` on `document`. Returns whether the write
    /// reached a backend; the cache is updated either way.
    pub async fn save(&self, document: &mut AppDocument) -> bool {
        document.last_updated = Utc::now();
        *self.cache.lock() = Some(document.clone());
        self.persist().await
    }

    /// Applies `change` to the cached document in place and persists it.
    ///
    /// `change` returns `None` to signal that nothing was modified, in which
    /// case nothing is written.
    pub(crate) async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut AppDocument) -> Option<T>,
    ) -> Option<T> {
        self.loaded.get_or_init(|| self.initialize()).await;
        let outcome = {
            let mut cache = self.cache.lock();
            let document = cache.get_or_insert_with(AppDocument::new);
            let outcome = change(document)?;
            document.last_updated = Utc::now();
            outcome
        };
        self.persist().await;
        Some(outcome)
    }

    /// Replaces the document with an empty one and persists it.
    pub async fn reset(&self) -> AppDocument {
        let mut document = AppDocument::new();
        if !self.save(&mut document).await {
            tracing::warn!("Reset document kept in memory only");
        }
        document
    }

    /// Deletes the stored blob from every backend and empties the cache.
    ///
    /// The fresh document is not persisted until the next save.
    pub async fn wipe(&self) -> Result<(), PlannerError> {
        let _guard = self.write_queue.lock().await;
        *self.cache.lock() = Some(AppDocument::new());
        // Nothing left to load after a wipe.
        let _ = self.loaded.set(());
        self.storage.delete().await?;
        tracing::info!("Stored document deleted");
        Ok(())
    }

    /// Size in bytes of the cached document as it would be persisted.
    pub async fn storage_usage(&self) -> usize {
        let document = self.load().await;
        encode(&document).map(|blob| blob.len()).unwrap_or(0)
    }

    /// Every migration step applied by this store.
    pub fn migration_history(&self) -> Vec<MigrationRecord> {
        self.migrations.history()
    }

    /// Name of the backend writes are routed to.
    pub async fn active_backend(&self) -> &'static str {
        self.storage.active_backend().await
    }

    /// Parses a stored blob, migrating it to the current version.
    ///
    /// Returns the document and whether any migration step ran.
    pub(crate) fn decode(&self, blob: &str) -> Result<(AppDocument, bool), PlannerError> {
        let raw: serde_json::Value = serde_json::from_str(blob)?;
        self.decode_value(raw).map_err(PlannerError::from)
    }

    pub(crate) fn decode_value(
        &self,
        raw: serde_json::Value,
    ) -> Result<(AppDocument, bool), serde_json::Error> {
        let migrated = self.migrations.needs_migration(&raw);
        let raw = if migrated {
            self.migrations.migrate(raw)
        } else {
            raw
        };
        let document = serde_json::from_value(raw)?;
        Ok((document, migrated))
    }

    async fn initialize(&self) {
        // A save before the first load already established the document.
        if self.cache.lock().is_some() {
            return;
        }

        let (mut document, persist) = match self.storage.read().await {
            Ok(Some(blob)) => match self.decode(&blob) {
                Ok((document, migrated)) => {
                    tracing::info!(
                        "Loaded document version {} ({} recipes, {} meal plans, {} shopping lists)",
                        document.version,
                        document.recipes.len(),
                        document.meal_plans.len(),
                        document.shopping_lists.len()
                    );
                    (document, migrated)
                }
                Err(e) => {
                    tracing::error!("Stored document is unreadable, starting empty: {}", e);
                    (AppDocument::new(), false)
                }
            },
            Ok(None) => {
                tracing::info!("No stored document found, creating default");
                (AppDocument::new(), true)
            }
            Err(e) => {
                tracing::error!(
                    "{}; starting with an in-memory document",
                    PlannerError::from(e)
                );
                (AppDocument::new(), false)
            }
        };

        if persist {
            document.last_updated = Utc::now();
        }
        {
            let mut cache = self.cache.lock();
            if cache.is_some() {
                return;
            }
            *cache = Some(document);
        }

        if persist && !self.persist().await {
            tracing::warn!("Initial document kept in memory only");
        }
    }

    /// Writes the current cache. Holding the write queue while taking the
    /// snapshot keeps the last write the newest state.
    async fn persist(&self) -> bool {
        let _guard = self.write_queue.lock().await;
        let Some(document) = self.cache.lock().clone() else {
            return false;
        };
        let blob = match encode(&document) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!("Failed to serialize document: {}", e);
                return false;
            }
        };

        match self.storage.write(&blob).await {
            Ok(()) => {
                tracing::debug!("Persisted document ({} bytes)", blob.len());
                true
            }
            Err(e) => {
                tracing::error!("Failed to persist document: {}", e);
                false
            }
        }
    }
}

pub(crate) fn encode(document: &AppDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}
