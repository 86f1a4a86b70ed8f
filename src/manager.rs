//! CRUD over recipes, meal plans and shopping lists.
//!
//! Every operation reads or mutates the store's document. Missing entities
//! are reported as `None`/`false`; persistence failures are logged by the
//! store and leave the in-memory change in place.

use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::PlannerError;
use crate::models::{
    MealPlan, MealPlanPatch, NewMealPlan, NewRecipe, NewShoppingList, Recipe, RecipePatch,
    ShoppingItemPatch, ShoppingList, ShoppingListPatch,
};
use crate::search;
use crate::shopping::ShoppingListGenerator;
use crate::store::DocumentStore;

/// A shopping list with the recipes and meal plan it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingListView {
    pub list: ShoppingList,
    /// Recipes referenced by the list's items. Deleted recipes are absent.
    pub recipes: BTreeMap<Uuid, Recipe>,
    pub meal_plan: Option<MealPlan>,
}

impl ShoppingListView {
    pub fn recipe_for(&self, item_id: Uuid) -> Option<&Recipe> {
        let item = self.list.item(item_id)?;
        self.recipes.get(&item.recipe_id)
    }
}

/// Entity-level operations over a shared [`DocumentStore`].
#[derive(Clone)]
pub struct DataManager {
    store: Arc<DocumentStore>,
}

impl DataManager {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    // ----- recipes -----

    pub async fn list_recipes(&self) -> Vec<Recipe> {
        self.store.load().await.recipes.into_values().collect()
    }

    pub async fn get_recipe(&self, id: Uuid) -> Option<Recipe> {
        self.store.load().await.recipes.remove(&id)
    }

    pub async fn add_recipe(&self, draft: NewRecipe) -> Recipe {
        let recipe = Recipe::from_draft(draft, Utc::now());
        let stored = recipe.clone();
        self.store
            .mutate(|doc| {
                doc.recipes.insert(stored.id, stored);
                Some(())
            })
            .await;
        tracing::debug!("Added recipe {}", recipe.id);
        recipe
    }

    pub async fn update_recipe(&self, id: Uuid, patch: RecipePatch) -> Option<Recipe> {
        self.store
            .mutate(|doc| {
                let recipe = doc.recipes.get_mut(&id)?;
                patch.apply(recipe, Utc::now());
                Some(recipe.clone())
            })
            .await
    }

    /// Removes a recipe. Shopping items and meals referring to it are kept.
    pub async fn delete_recipe(&self, id: Uuid) -> bool {
        self.store
            .mutate(|doc| doc.recipes.remove(&id))
            .await
            .is_some()
    }

    /// Marks one recipe as used now.
    pub async fn touch_recipe(&self, id: Uuid) -> Option<Recipe> {
        self.store
            .mutate(|doc| {
                let recipe = doc.recipes.get_mut(&id)?;
                recipe.mark_used(Utc::now());
                Some(recipe.clone())
            })
            .await
    }

    /// Recipes matching `term` in title, description, ingredients or tags.
    pub async fn search_recipes(&self, term: &str) -> Vec<Recipe> {
        search::search_recipes(&self.list_recipes().await, term)
    }

    // ----- meal plans -----

    pub async fn list_meal_plans(&self) -> Vec<MealPlan> {
        self.store.load().await.meal_plans.into_values().collect()
    }

    pub async fn get_meal_plan(&self, id: Uuid) -> Option<MealPlan> {
        self.store.load().await.meal_plans.remove(&id)
    }

    /// The plan whose date range contains `today`, if any.
    pub async fn current_meal_plan(&self, today: NaiveDate) -> Option<MealPlan> {
        self.store
            .load()
            .await
            .meal_plans
            .into_values()
            .find(|plan| plan.covers(today))
    }

    /// Stores a new plan and marks every recipe it references as used.
    ///
    /// Fails if a meal falls outside the plan's date range.
    pub async fn add_meal_plan(&self, draft: NewMealPlan) -> Result<MealPlan, PlannerError> {
        let now = Utc::now();
        let plan = MealPlan::from_draft(draft, now);
        plan.validate()?;

        let stored = plan.clone();
        self.store
            .mutate(|doc| {
                let touched = doc.mark_recipes_used(&stored, now);
                tracing::debug!("Meal plan {} touched {} recipes", stored.id, touched);
                doc.meal_plans.insert(stored.id, stored);
                Some(())
            })
            .await;
        Ok(plan)
    }

    /// Patches a plan. A patch carrying meals marks their recipes as used.
    ///
    /// The patched plan is validated before anything changes.
    pub async fn update_meal_plan(
        &self,
        id: Uuid,
        patch: MealPlanPatch,
    ) -> Result<Option<MealPlan>, PlannerError> {
        let Some(mut plan) = self.get_meal_plan(id).await else {
            return Ok(None);
        };
        let now = Utc::now();
        let touches_recipes = patch.changes_meals();
        patch.apply(&mut plan, now);
        plan.validate()?;

        let updated = self
            .store
            .mutate(|doc| {
                let slot = doc.meal_plans.get_mut(&id)?;
                *slot = plan.clone();
                if touches_recipes {
                    doc.mark_recipes_used(&plan, now);
                }
                Some(plan)
            })
            .await;
        Ok(updated)
    }

    /// Removes a plan. Shopping lists generated from it are kept.
    pub async fn delete_meal_plan(&self, id: Uuid) -> bool {
        self.store
            .mutate(|doc| doc.meal_plans.remove(&id))
            .await
            .is_some()
    }

    // ----- shopping lists -----

    pub async fn list_shopping_lists(&self) -> Vec<ShoppingList> {
        self.store.load().await.shopping_lists.into_values().collect()
    }

    pub async fn get_shopping_list(&self, id: Uuid) -> Option<ShoppingList> {
        self.store.load().await.shopping_lists.remove(&id)
    }

    pub async fn add_shopping_list(&self, draft: NewShoppingList) -> ShoppingList {
        let list = ShoppingList::from_draft(draft, Utc::now());
        let stored = list.clone();
        self.store
            .mutate(|doc| {
                doc.shopping_lists.insert(stored.id, stored);
                Some(())
            })
            .await;
        list
    }

    pub async fn update_shopping_list(
        &self,
        id: Uuid,
        patch: ShoppingListPatch,
    ) -> Option<ShoppingList> {
        self.store
            .mutate(|doc| {
                let list = doc.shopping_lists.get_mut(&id)?;
                patch.apply(list, Utc::now());
                Some(list.clone())
            })
            .await
    }

    pub async fn delete_shopping_list(&self, id: Uuid) -> bool {
        self.store
            .mutate(|doc| doc.shopping_lists.remove(&id))
            .await
            .is_some()
    }

    /// Patches one item. `None` if the list or the item is missing.
    pub async fn update_shopping_item(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        patch: ShoppingItemPatch,
    ) -> Option<ShoppingList> {
        self.store
            .mutate(|doc| {
                let list = doc.shopping_lists.get_mut(&list_id)?;
                patch.apply(list.item_mut(item_id)?);
                list.updated_at = Utc::now();
                Some(list.clone())
            })
            .await
    }

    /// Flips the checked state of one item.
    pub async fn toggle_shopping_item(&self, list_id: Uuid, item_id: Uuid) -> Option<ShoppingList> {
        self.store
            .mutate(|doc| {
                let list = doc.shopping_lists.get_mut(&list_id)?;
                list.item_mut(item_id)?.toggle();
                list.updated_at = Utc::now();
                Some(list.clone())
            })
            .await
    }

    /// Builds and stores a new list from a meal plan's recipes.
    pub async fn generate_shopping_list(&self, meal_plan_id: Uuid) -> Option<ShoppingList> {
        ShoppingListGenerator::new(self.store.clone())
            .generate(meal_plan_id)
            .await
    }

    pub async fn shopping_list_with_recipes(&self, id: Uuid) -> Option<ShoppingListView> {
        let doc = self.store.load().await;
        let list = doc.shopping_lists.get(&id)?.clone();
        let recipes = list
            .items
            .iter()
            .filter_map(|item| doc.recipes.get(&item.recipe_id))
            .map(|recipe| (recipe.id, recipe.clone()))
            .collect();
        let meal_plan = doc.meal_plans.get(&list.meal_plan_id).cloned();

        Some(ShoppingListView {
            list,
            recipes,
            meal_plan,
        })
    }
}
