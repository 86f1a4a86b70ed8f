//! Shopping lists derived from meal plans.
//!
//! Items copy the ingredient text of the recipe they came from and keep a
//! weak back-reference to it for grouping. Lists are independent once
//! generated: editing a recipe or meal plan never rewrites them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One line on a shopping list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: Uuid,
    pub name: String,
    /// Recipe this item was copied from. May dangle after the recipe is deleted.
    pub recipe_id: Uuid,
    #[serde(default)]
    pub checked: bool,
}

impl ShoppingItem {
    /// Creates an unchecked item for an ingredient line of a recipe.
    pub fn from_ingredient(name: impl Into<String>, recipe_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            recipe_id,
            checked: false,
        }
    }

    pub fn toggle(&mut self) {
        self.checked = !self.checked;
    }
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = if self.checked { "[x]" } else { "[ ]" };
        write!(f, "{} {}", check, self.name)
    }
}

/// A shopping list generated from (or attached to) a meal plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: Uuid,
    /// Plan this list was generated from. May dangle after the plan is deleted.
    pub meal_plan_id: Uuid,
    #[serde(default)]
    pub items: Vec<ShoppingItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingList {
    pub fn new(meal_plan_id: Uuid, items: Vec<ShoppingItem>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            meal_plan_id,
            items,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_draft(draft: NewShoppingList, now: DateTime<Utc>) -> Self {
        Self::new(draft.meal_plan_id, draft.items, now)
    }

    pub fn item(&self, item_id: Uuid) -> Option<&ShoppingItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut ShoppingItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    pub fn checked_count(&self) -> usize {
        self.items.iter().filter(|item| item.checked).count()
    }

    /// Items grouped by source recipe, in order of each recipe's first item.
    pub fn group_by_recipe(&self) -> Vec<(Uuid, Vec<&ShoppingItem>)> {
        let mut groups: Vec<(Uuid, Vec<&ShoppingItem>)> = Vec::new();
        for item in &self.items {
            match groups.iter_mut().find(|(id, _)| *id == item.recipe_id) {
                Some((_, items)) => items.push(item),
                None => groups.push((item.recipe_id, vec![item])),
            }
        }
        groups
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Shopping list ({}/{} checked)",
            self.checked_count(),
            self.items.len()
        )?;
        for item in &self.items {
            writeln!(f, "  {}", item)?;
        }
        Ok(())
    }
}

/// Caller-supplied fields for a hand-built shopping list.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShoppingList {
    pub meal_plan_id: Uuid,
    pub items: Vec<ShoppingItem>,
}

/// Shallow patch over a stored shopping list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShoppingListPatch {
    pub meal_plan_id: Option<Uuid>,
    pub items: Option<Vec<ShoppingItem>>,
}

impl ShoppingListPatch {
    pub fn apply(self, list: &mut ShoppingList, now: DateTime<Utc>) {
        if let Some(meal_plan_id) = self.meal_plan_id {
            list.meal_plan_id = meal_plan_id;
        }
        if let Some(items) = self.items {
            list.items = items;
        }
        list.updated_at = now;
    }
}

/// Patch over one item. The item id and recipe reference are immutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShoppingItemPatch {
    pub name: Option<String>,
    pub checked: Option<bool>,
}

impl ShoppingItemPatch {
    pub fn apply(self, item: &mut ShoppingItem) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(checked) = self.checked {
            item.checked = checked;
        }
    }
}
