//! Family Meal Planner
//!
//! Local-first persistence kernel for a household meal planner: recipes,
//! meal plans and shopping lists kept in one versioned JSON document.
//!
//! ```no_run
//! use std::sync::Arc;
//! use family_meal_planner::{Config, DataManager, DocumentStore, NewRecipe};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let store = Arc::new(DocumentStore::from_config(&config));
//! let planner = DataManager::new(store);
//! planner
//!     .add_recipe(NewRecipe::new("Pancakes").with_ingredients(["flour", "eggs", "milk"]))
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod migration;
pub mod models;
pub mod search;
pub mod shopping;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod transfer;

pub use config::{BackendPreference, Config, ConfigError, ConfigSource, ConfigValue};
pub use error::{PlannerError, PlannerResult};
pub use manager::{DataManager, ShoppingListView};
pub use migration::{MigrationEngine, MigrationRecord, CURRENT_VERSION};
pub use models::{
    AppDocument, Meal, MealPlan, MealPlanPatch, NewMealPlan, NewRecipe, NewShoppingList, Recipe,
    RecipePatch, ShoppingItem, ShoppingItemPatch, ShoppingList, ShoppingListPatch,
};
pub use search::{RecipeQuery, SortKey, SortOrder, TagMatch};
pub use shopping::ShoppingListGenerator;
pub use storage::{FallbackStorage, FileBackend, KeyValueBackend, StorageBackend, StorageError};
pub use store::DocumentStore;
pub use transfer::{Transfer, ValidatedDocument};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
