//! The root aggregate persisted as a single JSON blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{MealPlan, Recipe, ShoppingList};
use crate::migration::CURRENT_VERSION;

/// Everything one household has planned, keyed by entity id.
///
/// ```text
/// {
///   "recipes":       { "<id>": Recipe, ... },
///   "mealPlans":     { "<id>": MealPlan, ... },
///   "shoppingLists": { "<id>": ShoppingList, ... },
///   "version":       1,
///   "lastUpdated":   "2025-03-01T12:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppDocument {
    #[serde(default)]
    pub recipes: BTreeMap<Uuid, Recipe>,
    #[serde(default)]
    pub meal_plans: BTreeMap<Uuid, MealPlan>,
    #[serde(default)]
    pub shopping_lists: BTreeMap<Uuid, ShoppingList>,
    /// Schema version. Only the migration engine advances it.
    pub version: u32,
    /// Stamped on every persisted write.
    pub last_updated: DateTime<Utc>,
}

impl AppDocument {
    /// An empty document at the current schema version.
    pub fn new() -> Self {
        Self {
            recipes: BTreeMap::new(),
            meal_plans: BTreeMap::new(),
            shopping_lists: BTreeMap::new(),
            version: CURRENT_VERSION,
            last_updated: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty() && self.meal_plans.is_empty() && self.shopping_lists.is_empty()
    }

    /// Equality ignoring `last_updated`.
    pub fn same_content(&self, other: &AppDocument) -> bool {
        self.recipes == other.recipes
            && self.meal_plans == other.meal_plans
            && self.shopping_lists == other.shopping_lists
            && self.version == other.version
    }

    /// Sets `last_used` on every existing recipe the plan references.
    ///
    /// Missing recipes are skipped. Returns how many recipes were touched.
    pub fn mark_recipes_used(&mut self, plan: &MealPlan, now: DateTime<Utc>) -> usize {
        let mut touched = 0;
        for recipe_id in plan.recipe_ids() {
            if let Some(recipe) = self.recipes.get_mut(&recipe_id) {
                recipe.mark_used(now);
                touched += 1;
            }
        }
        touched
    }
}

impl Default for AppDocument {
    fn default() -> Self {
        Self::new()
    }
}
