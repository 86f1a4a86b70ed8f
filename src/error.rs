//! Kernel error taxonomy.
//!
//! Routine outcomes ("not found", "save failed") are reported to callers as
//! `Option`/`bool` by the data manager and store. These errors surface from
//! validation, import/export/merge, and as logged anomalies.

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum PlannerError {
    /// Both the preferred and the fallback backend failed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Malformed import payload or a broken entity invariant.
    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    /// No transform registered for a version step. Logged, never fatal.
    #[error("No migration registered from version {from} to {to}")]
    MigrationGap { from: u32, to: u32 },

    #[error("Failed to write {}: {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for PlannerError {
    fn from(e: StorageError) -> Self {
        PlannerError::StorageUnavailable(e.to_string())
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
