use async_trait::async_trait;

use super::StorageError;

/// A place that can hold exactly one document blob.
///
/// `read` returns `Ok(None)` when nothing has been stored yet; that is not
/// an error. `delete` of a missing blob succeeds.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Capability probe. Called once per store by [`super::FallbackStorage`].
    async fn is_available(&self) -> bool;

    async fn read(&self) -> Result<Option<String>, StorageError>;

    async fn write(&self, blob: &str) -> Result<(), StorageError>;

    async fn delete(&self) -> Result<(), StorageError>;
}
