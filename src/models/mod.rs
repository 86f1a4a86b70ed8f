mod document;
mod meal_plan;
mod recipe;
mod shopping_list;

pub use document::AppDocument;
pub use meal_plan::{Meal, MealPlan, MealPlanPatch, NewMealPlan};
pub use recipe::{NewRecipe, Recipe, RecipePatch};
pub use shopping_list::{
    NewShoppingList, ShoppingItem, ShoppingItemPatch, ShoppingList, ShoppingListPatch,
};
