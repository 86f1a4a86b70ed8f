//! Shopping-list derivation from meal plans.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::PlannerError;
use crate::models::{AppDocument, MealPlan, ShoppingItem, ShoppingList};
use crate::store::DocumentStore;

/// One unchecked item per ingredient of every recipe the plan's meals use.
///
/// Items follow meal order, then ingredient order. Meals whose recipe no
/// longer exists contribute nothing. Ingredient text is copied verbatim;
/// duplicates across recipes are kept.
pub fn derive_items(document: &AppDocument, plan: &MealPlan) -> Vec<ShoppingItem> {
    plan.recipe_ids()
        .filter_map(|recipe_id| document.recipes.get(&recipe_id))
        .flat_map(|recipe| {
            recipe
                .ingredients
                .iter()
                .map(|ingredient| ShoppingItem::from_ingredient(ingredient.clone(), recipe.id))
        })
        .collect()
}

/// Builds and stores shopping lists for meal plans.
pub struct ShoppingListGenerator {
    store: Arc<DocumentStore>,
}

impl ShoppingListGenerator {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a new list for the plan. Every call creates a separate list.
    ///
    /// Returns `None` if the plan does not exist.
    pub async fn generate(&self, meal_plan_id: Uuid) -> Option<ShoppingList> {
        let list = self
            .store
            .mutate(|doc| {
                let Some(plan) = doc.meal_plans.get(&meal_plan_id) else {
                    tracing::warn!(
                        "{}",
                        PlannerError::NotFound {
                            kind: "meal plan",
                            id: meal_plan_id.to_string(),
                        }
                    );
                    return None;
                };
                let items = derive_items(doc, plan);
                let list = ShoppingList::new(meal_plan_id, items, Utc::now());
                doc.shopping_lists.insert(list.id, list.clone());
                Some(list)
            })
            .await?;

        tracing::info!(
            "Generated shopping list {} with {} items for meal plan {}",
            list.id,
            list.items.len(),
            meal_plan_id
        );
        Some(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Meal, NewMealPlan, NewRecipe, Recipe};
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn recipe(title: &str, ingredients: &[&str]) -> Recipe {
        Recipe::from_draft(
            NewRecipe::new(title).with_ingredients(ingredients.iter().copied()),
            Utc::now(),
        )
    }

    fn plan(meals: Vec<Meal>) -> MealPlan {
        MealPlan::from_draft(
            NewMealPlan::new("Week", date(1), date(7)).with_meals(meals),
            Utc::now(),
        )
    }

    #[test]
    fn test_items_follow_meal_then_ingredient_order() {
        let mut doc = AppDocument::new();
        let pancakes = recipe("Pancakes", &["flour", "eggs", "milk"]);
        let omelette = recipe("Omelette", &["eggs", "cheese"]);
        doc.recipes.insert(pancakes.id, pancakes.clone());
        doc.recipes.insert(omelette.id, omelette.clone());

        let plan = plan(vec![
            Meal::new(date(2), omelette.id),
            Meal::new(date(1), pancakes.id),
        ]);
        let items = derive_items(&doc, &plan);

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["eggs", "cheese", "flour", "eggs", "milk"]);
        assert_eq!(items[0].recipe_id, omelette.id);
        assert_eq!(items[2].recipe_id, pancakes.id);
        assert!(items.iter().all(|i| !i.checked));
    }

    #[test]
    fn test_missing_recipes_contribute_nothing() {
        let mut doc = AppDocument::new();
        let soup = recipe("Soup", &["onion", "stock"]);
        doc.recipes.insert(soup.id, soup.clone());

        let plan = plan(vec![
            Meal::new(date(1), Uuid::new_v4()),
            Meal::new(date(2), soup.id),
        ]);

        assert_eq!(derive_items(&doc, &plan).len(), 2);
    }

    #[test]
    fn test_item_ids_are_fresh() {
        let mut doc = AppDocument::new();
        let toast = recipe("Toast", &["bread"]);
        doc.recipes.insert(toast.id, toast.clone());
        let plan = plan(vec![Meal::new(date(1), toast.id), Meal::new(date(2), toast.id)]);

        let items = derive_items(&doc, &plan);
        assert_eq!(items.len(), 2);
        assert_ne!(items[0].id, items[1].id);
    }

    #[tokio::test]
    async fn test_generate_stores_independent_lists() {
        let store = Arc::new(DocumentStore::in_memory());
        let mut doc = store.load().await;
        let curry = recipe("Curry", &["rice", "lentils"]);
        let week = plan(vec![Meal::new(date(3), curry.id)]);
        doc.recipes.insert(curry.id, curry);
        doc.meal_plans.insert(week.id, week.clone());
        store.save(&mut doc).await;

        let generator = ShoppingListGenerator::new(store.clone());
        let first = generator.generate(week.id).await.unwrap();
        let second = generator.generate(week.id).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.meal_plan_id, week.id);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(store.load().await.shopping_lists.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_for_missing_plan_is_none() {
        let store = Arc::new(DocumentStore::in_memory());
        let generator = ShoppingListGenerator::new(store.clone());

        assert!(generator.generate(Uuid::new_v4()).await.is_none());
        assert!(store.load().await.shopping_lists.is_empty());
    }
}
