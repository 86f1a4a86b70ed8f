//! Backup export, validated import, and merge of planner documents.

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, DEFAULT_APP_NAME};
use crate::error::PlannerError;
use crate::migration::MigrationEngine;
use crate::models::AppDocument;
use crate::store::{encode, DocumentStore};

/// `<app>-backup-<YYYY-MM-DD>.json`
pub fn backup_file_name(app_name: &str, date: NaiveDate) -> String {
    format!("{}-backup-{}.json", app_name, date.format("%Y-%m-%d"))
}

/// Serializes a document the way backups are written.
pub fn export_document(document: &AppDocument) -> Result<String, PlannerError> {
    encode(document).map_err(PlannerError::from)
}

/// A parsed import payload whose top-level shape has been checked.
///
/// Only [`validate`] constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDocument(Value);

impl ValidatedDocument {
    pub fn version(&self) -> u32 {
        MigrationEngine::version_of(&self.0).unwrap_or_default()
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Checks the payload has the persisted document's top-level shape.
///
/// Entity contents are not inspected here; they are checked when the
/// document is decoded.
pub fn validate(blob: &str) -> Result<ValidatedDocument, PlannerError> {
    let value: Value = serde_json::from_str(blob)
        .map_err(|e| PlannerError::ValidationFailure(format!("not valid JSON: {}", e)))?;

    let Some(root) = value.as_object() else {
        return Err(PlannerError::ValidationFailure(
            "document is not a JSON object".to_string(),
        ));
    };

    for key in ["recipes", "mealPlans", "shoppingLists"] {
        if !root.get(key).is_some_and(Value::is_object) {
            return Err(PlannerError::ValidationFailure(format!(
                "'{}' must be an object",
                key
            )));
        }
    }
    if !root.contains_key("version") || MigrationEngine::version_of(&value).is_none() {
        return Err(PlannerError::ValidationFailure(
            "'version' must be a non-negative integer".to_string(),
        ));
    }
    if !root.get("lastUpdated").is_some_and(Value::is_string) {
        return Err(PlannerError::ValidationFailure(
            "'lastUpdated' must be a string".to_string(),
        ));
    }

    Ok(ValidatedDocument(value))
}

/// Union of two documents. Entries already in `existing` win on id collision.
///
/// Keeps `existing`'s version and stamps `last_updated` with now.
pub fn merge_documents(existing: &AppDocument, imported: &AppDocument) -> AppDocument {
    let mut merged = existing.clone();

    for (id, recipe) in &imported.recipes {
        merged.recipes.entry(*id).or_insert_with(|| recipe.clone());
    }
    for (id, plan) in &imported.meal_plans {
        merged.meal_plans.entry(*id).or_insert_with(|| plan.clone());
    }
    for (id, list) in &imported.shopping_lists {
        merged.shopping_lists.entry(*id).or_insert_with(|| list.clone());
    }

    merged.version = existing.version;
    merged.last_updated = Utc::now();
    merged
}

/// Export, import and merge against a [`DocumentStore`].
pub struct Transfer {
    store: Arc<DocumentStore>,
    app_name: String,
}

impl Transfer {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }

    pub fn from_config(store: Arc<DocumentStore>, config: &Config) -> Self {
        Self {
            store,
            app_name: config.app_name.value.clone(),
        }
    }

    /// The current document as pretty JSON.
    pub async fn export(&self) -> Result<String, PlannerError> {
        export_document(&self.store.load().await)
    }

    /// Writes today's backup file into `dir` and returns its path.
    pub async fn export_to_dir(&self, dir: &Path) -> Result<PathBuf, PlannerError> {
        let blob = self.export().await?;
        let path = dir.join(backup_file_name(
            &self.app_name,
            Utc::now().date_naive(),
        ));

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PlannerError::Io(dir.to_path_buf(), e))?;
        tokio::fs::write(&path, blob)
            .await
            .map_err(|e| PlannerError::Io(path.clone(), e))?;

        tracing::info!("Exported backup to {}", path.display());
        Ok(path)
    }

    /// Replaces the stored document with the payload.
    ///
    /// A rejected payload leaves storage untouched. If the payload decodes
    /// but cannot be persisted, the in-memory document is still replaced and
    /// `StorageUnavailable` is returned.
    pub async fn import(&self, blob: &str) -> Result<AppDocument, PlannerError> {
        let mut document = self.decode(blob)?;

        if !self.store.save(&mut document).await {
            return Err(PlannerError::StorageUnavailable(
                "imported document kept in memory only".to_string(),
            ));
        }
        tracing::info!(
            "Imported document with {} recipes, {} meal plans, {} shopping lists",
            document.recipes.len(),
            document.meal_plans.len(),
            document.shopping_lists.len()
        );
        Ok(document)
    }

    /// Merges `imported` into `existing`, saves and returns the result.
    pub async fn merge(
        &self,
        existing: &AppDocument,
        imported: &AppDocument,
    ) -> Result<AppDocument, PlannerError> {
        let mut merged = merge_documents(existing, imported);
        if !self.store.save(&mut merged).await {
            return Err(PlannerError::StorageUnavailable(
                "merged document kept in memory only".to_string(),
            ));
        }
        tracing::info!(
            "Merged document now has {} recipes, {} meal plans, {} shopping lists",
            merged.recipes.len(),
            merged.meal_plans.len(),
            merged.shopping_lists.len()
        );
        Ok(merged)
    }

    /// Merges the payload into the current document.
    pub async fn import_merge(&self, blob: &str) -> Result<AppDocument, PlannerError> {
        let imported = self.decode(blob)?;
        let existing = self.store.load().await;
        self.merge(&existing, &imported).await
    }

    fn decode(&self, blob: &str) -> Result<AppDocument, PlannerError> {
        let validated = validate(blob).map_err(|e| {
            tracing::warn!("Rejected import: {}", e);
            e
        })?;

        let (document, migrated) = self
            .store
            .decode_value(validated.into_inner())
            .map_err(|e| {
                tracing::warn!("Rejected import: {}", e);
                PlannerError::ValidationFailure(e.to_string())
            })?;
        if migrated {
            tracing::info!("Migrated imported document to version {}", document.version);
        }
        Ok(document)
    }
}
