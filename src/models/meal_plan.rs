use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::PlannerError;

/// A single planned meal inside a meal plan.
///
/// Meals reference recipes by id (live lookup). Deleting the recipe leaves
/// the meal in place with a dangling reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: Uuid,
    pub date: NaiveDate,
    pub recipe_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Meal {
    pub fn new(date: NaiveDate, recipe_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            recipe_id,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A named plan covering an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Insertion-ordered; shopping lists follow this order.
    #[serde(default)]
    pub meals: Vec<Meal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MealPlan {
    pub fn from_draft(draft: NewMealPlan, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            start_date: draft.start_date,
            end_date: draft.end_date,
            meals: draft.meals,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `date` falls inside the plan's inclusive range.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Recipe ids in meal order. May contain duplicates.
    pub fn recipe_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.meals.iter().map(|meal| meal.recipe_id)
    }

    /// Checks the range is ordered and every meal falls within it.
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.start_date > self.end_date {
            return Err(PlannerError::ValidationFailure(format!(
                "meal plan '{}' ends ({}) before it starts ({})",
                self.name, self.end_date, self.start_date
            )));
        }

        if let Some(meal) = self.meals.iter().find(|meal| !self.covers(meal.date)) {
            return Err(PlannerError::ValidationFailure(format!(
                "meal {} on {} falls outside {}..={}",
                meal.id, meal.date, self.start_date, self.end_date
            )));
        }

        Ok(())
    }
}

impl fmt::Display for MealPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "Dates: {} to {}", self.start_date, self.end_date)?;

        if !self.meals.is_empty() {
            writeln!(f, "\nMeals: {} meal(s)", self.meals.len())?;
        }

        Ok(())
    }
}

/// Caller-supplied fields for a new meal plan.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMealPlan {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub meals: Vec<Meal>,
}

impl NewMealPlan {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start_date,
            end_date,
            meals: Vec::new(),
        }
    }

    pub fn with_meals(mut self, meals: Vec<Meal>) -> Self {
        self.meals = meals;
        self
    }

    pub fn with_meal(mut self, meal: Meal) -> Self {
        self.meals.push(meal);
        self
    }
}

/// Shallow patch over a stored meal plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealPlanPatch {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Replaces the whole meal list; touches every referenced recipe.
    pub meals: Option<Vec<Meal>>,
}

impl MealPlanPatch {
    pub fn changes_meals(&self) -> bool {
        self.meals.is_some()
    }

    pub fn apply(self, plan: &mut MealPlan, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            plan.name = name;
        }
        if let Some(start_date) = self.start_date {
            plan.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            plan.end_date = end_date;
        }
        if let Some(meals) = self.meals {
            plan.meals = meals;
        }
        plan.updated_at = now;
    }
}
