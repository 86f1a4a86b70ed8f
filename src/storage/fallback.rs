//! Preferred/fallback routing over two backends.

use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{StorageBackend, StorageError};

/// Routes blob operations to a preferred backend with a fallback.
///
/// The preferred backend's capability is probed once and memoized. A failed
/// preferred write is retried on the fallback before reporting failure; a
/// failed preferred read consults the fallback before reporting absence.
pub struct FallbackStorage {
    preferred: Arc<dyn StorageBackend>,
    fallback: Option<Arc<dyn StorageBackend>>,
    probe: OnceCell<bool>,
}

impl FallbackStorage {
    pub fn new(preferred: Arc<dyn StorageBackend>, fallback: Arc<dyn StorageBackend>) -> Self {
        Self {
            preferred,
            fallback: Some(fallback),
            probe: OnceCell::new(),
        }
    }

    /// A single backend with nothing to fall back to.
    pub fn single(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            preferred: backend,
            fallback: None,
            probe: OnceCell::new(),
        }
    }

    /// Whether the preferred backend passed its capability probe.
    pub async fn preferred_available(&self) -> bool {
        *self
            .probe
            .get_or_init(|| async {
                let available = self.preferred.is_available().await;
                if available {
                    tracing::debug!("Using {} storage backend", self.preferred.name());
                } else {
                    tracing::info!(
                        "{} storage backend not available, using fallback",
                        self.preferred.name()
                    );
                }
                available
            })
            .await
    }

    /// Name of the backend writes are currently routed to.
    pub async fn active_backend(&self) -> &'static str {
        if self.preferred_available().await {
            return self.preferred.name();
        }
        match &self.fallback {
            Some(fallback) => fallback.name(),
            None => self.preferred.name(),
        }
    }

    /// Reads the blob.
    ///
    /// `Ok(None)` means neither backend holds a document.
    pub async fn read(&self) -> Result<Option<String>, StorageError> {
        let mut failure = None;

        if self.preferred_available().await {
            match self.preferred.read().await {
                Ok(Some(blob)) => return Ok(Some(blob)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Failed to read from {} backend: {}",
                        self.preferred.name(),
                        e
                    );
                    failure = Some(e);
                }
            }
        } else {
            failure = Some(StorageError::NotAvailable(self.preferred.name()));
        }

        let Some(fallback) = &self.fallback else {
            return match failure {
                Some(e) => Err(StorageError::Unavailable(e.to_string())),
                None => Ok(None),
            };
        };

        match fallback.read().await {
            Ok(blob) => Ok(blob),
            Err(e) => {
                tracing::error!("Failed to read from {} backend: {}", fallback.name(), e);
                match failure {
                    Some(first) => Err(StorageError::Unavailable(format!("{}; {}", first, e))),
                    // Preferred simply had nothing stored.
                    None => Ok(None),
                }
            }
        }
    }

    /// Writes the blob, retrying on the fallback if the preferred write fails.
    pub async fn write(&self, blob: &str) -> Result<(), StorageError> {
        let mut failure = None;

        if self.preferred_available().await {
            match self.preferred.write(blob).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        "Failed to write to {} backend, retrying on fallback: {}",
                        self.preferred.name(),
                        e
                    );
                    failure = Some(e);
                }
            }
        }

        let Some(fallback) = &self.fallback else {
            let reason = failure
                .map(|e| e.to_string())
                .unwrap_or_else(|| StorageError::NotAvailable(self.preferred.name()).to_string());
            return Err(StorageError::Unavailable(reason));
        };

        fallback.write(blob).await.map_err(|e| {
            tracing::error!("Failed to write to {} backend: {}", fallback.name(), e);
            match failure {
                Some(first) => StorageError::Unavailable(format!("{}; {}", first, e)),
                None => StorageError::Unavailable(e.to_string()),
            }
        })
    }

    /// Deletes the blob from every backend. Succeeds if any backend succeeded.
    pub async fn delete(&self) -> Result<(), StorageError> {
        let mut errors = Vec::new();
        let mut deleted = false;

        let backends = std::iter::once(&self.preferred).chain(self.fallback.iter());
        for backend in backends {
            match backend.delete().await {
                Ok(()) => deleted = true,
                Err(e) => {
                    tracing::warn!("Failed to delete from {} backend: {}", backend.name(), e);
                    errors.push(e.to_string());
                }
            }
        }

        if deleted {
            Ok(())
        } else {
            Err(StorageError::Unavailable(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::ScriptedBackend;
    use crate::storage::KeyValueBackend;

    #[tokio::test]
    async fn test_write_prefers_preferred() {
        let preferred = ScriptedBackend::healthy().shared();
        let fallback = ScriptedBackend::healthy().shared();
        let storage = FallbackStorage::new(preferred.clone(), fallback.clone());

        storage.write("doc").await.unwrap();

        assert_eq!(preferred.peek().await.as_deref(), Some("doc"));
        assert!(fallback.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_write_retries_on_fallback() {
        let preferred = ScriptedBackend::failing_writes().shared();
        let fallback = ScriptedBackend::healthy().shared();
        let storage = FallbackStorage::new(preferred.clone(), fallback.clone());

        storage.write("doc").await.unwrap();

        assert_eq!(preferred.writes(), 1);
        assert_eq!(fallback.peek().await.as_deref(), Some("doc"));
    }

    #[tokio::test]
    async fn test_both_writes_failing_is_unavailable() {
        let storage = FallbackStorage::new(
            ScriptedBackend::failing_writes().shared(),
            ScriptedBackend::failing_writes().shared(),
        );

        let err = storage.write("doc").await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_failed_read_consults_fallback() {
        let preferred = ScriptedBackend::failing_reads().shared();
        let fallback = ScriptedBackend::healthy().shared();
        fallback.seed("from fallback").await;
        let storage = FallbackStorage::new(preferred, fallback);

        let blob = storage.read().await.unwrap();
        assert_eq!(blob.as_deref(), Some("from fallback"));
    }

    #[tokio::test]
    async fn test_nothing_stored_is_not_an_error() {
        let storage = FallbackStorage::new(
            ScriptedBackend::healthy().shared(),
            Arc::new(KeyValueBackend::in_memory()),
        );
        assert!(storage.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_both_reads_failing_is_unavailable() {
        let storage = FallbackStorage::new(
            ScriptedBackend::failing_reads().shared(),
            ScriptedBackend::failing_reads().shared(),
        );

        let err = storage.read().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unavailable_preferred_is_skipped() {
        let preferred = ScriptedBackend::unavailable().shared();
        let fallback = ScriptedBackend::healthy().shared();
        let storage = FallbackStorage::new(preferred.clone(), fallback.clone());

        storage.write("doc").await.unwrap();
        storage.read().await.unwrap();

        assert_eq!(preferred.writes(), 0);
        assert_eq!(preferred.reads(), 0);
        assert_eq!(fallback.peek().await.as_deref(), Some("doc"));
        assert_eq!(storage.active_backend().await, "scripted");
    }

    #[tokio::test]
    async fn test_single_backend_failure_is_unavailable() {
        let storage = FallbackStorage::single(ScriptedBackend::failing_writes().shared());
        assert!(matches!(
            storage.write("doc").await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_clears_both() {
        let preferred = ScriptedBackend::healthy().shared();
        let fallback = ScriptedBackend::healthy().shared();
        preferred.seed("a").await;
        fallback.seed("b").await;
        let storage = FallbackStorage::new(preferred.clone(), fallback.clone());

        storage.delete().await.unwrap();

        assert!(preferred.peek().await.is_none());
        assert!(fallback.peek().await.is_none());
    }
}
