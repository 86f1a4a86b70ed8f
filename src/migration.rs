//! Schema migrations for the stored document.
//!
//! Migrations run on the raw JSON value so that older shapes can be
//! repaired before typed decoding. The ladder is a fixed table indexed by
//! the version a step migrates *from*; its length is tied to
//! [`CURRENT_VERSION`] by the array type, so adding a version without a
//! table entry does not compile.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PlannerError;

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// Pure transform from version `v` to `v + 1`.
pub type MigrationStep = fn(Value) -> Value;

/// `LADDER[v]` migrates a document from version `v` to `v + 1`.
const LADDER: [Option<MigrationStep>; CURRENT_VERSION as usize] = [Some(migrate_v0_to_v1)];

/// One applied step. Records are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub from_version: u32,
    pub to_version: u32,
    pub migrated_at: DateTime<Utc>,
    /// No transform was registered; the version was force-advanced and the
    /// data passed through unchanged.
    #[serde(default)]
    pub gap: bool,
}

/// Walks a document up the migration ladder and keeps a history of steps.
pub struct MigrationEngine {
    target: u32,
    ladder: &'static [Option<MigrationStep>],
    history: Mutex<Vec<MigrationRecord>>,
}

impl MigrationEngine {
    /// Engine for the built-in ladder up to [`CURRENT_VERSION`].
    pub fn new() -> Self {
        Self::with_ladder(CURRENT_VERSION, &LADDER)
    }

    /// Engine over a custom ladder. Missing entries are treated as gaps.
    pub fn with_ladder(target: u32, ladder: &'static [Option<MigrationStep>]) -> Self {
        Self {
            target,
            ladder,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn target_version(&self) -> u32 {
        self.target
    }

    /// Version field of a raw document.
    ///
    /// A missing field reads as version 0. A field that is present but not
    /// a non-negative integer fitting `u32` has no version.
    pub fn version_of(value: &Value) -> Option<u32> {
        match value.get("version") {
            None => Some(0),
            Some(version) => version.as_u64().and_then(|v| u32::try_from(v).ok()),
        }
    }

    /// Whether the document has a known version older than the target.
    pub fn needs_migration(&self, value: &Value) -> bool {
        Self::version_of(value).is_some_and(|version| version < self.target)
    }

    /// Applies every step from the document's version up to the target.
    pub fn migrate(&self, mut value: Value) -> Value {
        let Some(mut version) = Self::version_of(&value) else {
            tracing::warn!(
                "Document version {} is not a valid version number, leaving as is",
                value.get("version").map(serde_json::Value::to_string).unwrap_or_default()
            );
            return value;
        };

        if version > self.target {
            tracing::warn!(
                "Document version {} is newer than supported version {}, leaving as is",
                version,
                self.target
            );
            return value;
        }

        while version < self.target {
            let next = version + 1;
            let step = self.ladder.get(version as usize).copied().flatten();

            let gap = match step {
                Some(step) => {
                    value = step(value);
                    tracing::info!("Migrated document from version {} to {}", version, next);
                    false
                }
                None => {
                    tracing::warn!(
                        "{}; advancing version without transforming data",
                        PlannerError::MigrationGap {
                            from: version,
                            to: next
                        }
                    );
                    true
                }
            };

            set_version(&mut value, next);
            self.history.lock().push(MigrationRecord {
                from_version: version,
                to_version: next,
                migrated_at: Utc::now(),
                gap,
            });
            version = next;
        }

        value
    }

    /// Copy of every step this engine has applied.
    pub fn history(&self) -> Vec<MigrationRecord> {
        self.history.lock().clone()
    }
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn set_version(value: &mut Value, version: u32) {
    if let Some(obj) = value.as_object_mut() {
        obj.insert("version".to_string(), Value::from(version));
    }
}

/// Keeps only object-typed entity maps, filling in missing ones.
fn migrate_v0_to_v1(value: Value) -> Value {
    let mut old = match value {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };

    let mut take_map = |key: &str| match old.remove(key) {
        Some(Value::Object(entries)) => Value::Object(entries),
        _ => Value::Object(Map::new()),
    };

    let mut migrated = Map::new();
    migrated.insert("recipes".to_string(), take_map("recipes"));
    migrated.insert("mealPlans".to_string(), take_map("mealPlans"));
    migrated.insert("shoppingLists".to_string(), take_map("shoppingLists"));
    migrated.insert("version".to_string(), Value::from(1));
    migrated.insert(
        "lastUpdated".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    Value::Object(migrated)
}
