use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// A household recipe.
///
/// Ingredients are free-form lines ("2 eggs", "a pinch of salt"); they are
/// copied verbatim into shopping lists rather than referenced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Last time a persisted meal plan referenced this recipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Materializes a draft into a stored recipe with a fresh id.
    pub fn from_draft(draft: NewRecipe, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            ingredients: draft.ingredients,
            tags: draft.tags,
            image_url: draft.image_url,
            last_used: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Marks the recipe as referenced by a meal plan.
    pub fn mark_used(&mut self, now: DateTime<Utc>) {
        self.last_used = Some(now);
        self.updated_at = now;
    }

    /// The timestamp used for "most recent" ordering: last use, else creation.
    pub fn recency(&self) -> DateTime<Utc> {
        self.last_used.unwrap_or(self.created_at)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.len()))?;

        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }

        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            writeln!(f, "Tags: {}", tags.join(", "))?;
        }

        if !self.ingredients.is_empty() {
            writeln!(f, "\nIngredients:")?;
            for ingredient in &self.ingredients {
                writeln!(f, "  - {}", ingredient)?;
            }
        }

        Ok(())
    }
}

/// Caller-supplied fields for a new recipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub tags: BTreeSet<String>,
    pub image_url: Option<String>,
}

impl NewRecipe {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Shallow patch over a stored recipe. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub tags: Option<BTreeSet<String>>,
    /// `Some(None)` clears the image.
    pub image_url: Option<Option<String>>,
}

impl RecipePatch {
    pub fn apply(self, recipe: &mut Recipe, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            recipe.title = title;
        }
        if let Some(description) = self.description {
            recipe.description = description;
        }
        if let Some(ingredients) = self.ingredients {
            recipe.ingredients = ingredients;
        }
        if let Some(tags) = self.tags {
            recipe.tags = tags;
        }
        if let Some(image_url) = self.image_url {
            recipe.image_url = image_url;
        }
        recipe.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_draft() {
        let now = Utc::now();
        let recipe = Recipe::from_draft(
            NewRecipe::new("Omelette")
                .with_ingredients(["eggs", "milk"])
                .with_tags(["breakfast", "quick"]),
            now,
        );

        assert_eq!(recipe.title, "Omelette");
        assert_eq!(recipe.ingredients, vec!["eggs", "milk"]);
        assert!(recipe.has_tag("quick"));
        assert_eq!(recipe.created_at, now);
        assert_eq!(recipe.updated_at, now);
        assert!(recipe.last_used.is_none());
    }

    #[test]
    fn test_tags_are_a_set() {
        let draft = NewRecipe::new("Soup").with_tags(["dinner", "dinner", "warm"]);
        assert_eq!(draft.tags.len(), 2);
    }

    #[test]
    fn test_patch_is_shallow() {
        let created = Utc::now();
        let mut recipe = Recipe::from_draft(
            NewRecipe::new("Pasta")
                .with_description("weeknight")
                .with_image_url("pasta.png"),
            created,
        );

        let later = created + chrono::Duration::seconds(5);
        RecipePatch {
            title: Some("Pasta al limone".into()),
            image_url: Some(None),
            ..Default::default()
        }
        .apply(&mut recipe, later);

        assert_eq!(recipe.title, "Pasta al limone");
        assert_eq!(recipe.description, "weeknight");
        assert!(recipe.image_url.is_none());
        assert_eq!(recipe.updated_at, later);
        assert_eq!(recipe.created_at, created);
    }

    #[test]
    fn test_recency_prefers_last_used() {
        let created = Utc::now();
        let mut recipe = Recipe::from_draft(NewRecipe::new("Tacos"), created);
        assert_eq!(recipe.recency(), created);

        let used = created + chrono::Duration::days(1);
        recipe.mark_used(used);
        assert_eq!(recipe.recency(), used);
    }

    #[test]
    fn test_recipe_json_uses_camel_case() {
        let recipe = Recipe::from_draft(NewRecipe::new("Salad"), Utc::now());
        let json = serde_json::to_value(&recipe).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("lastUsed").is_none());

        let parsed: Recipe = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, recipe);
    }

    #[test]
    fn test_recipe_display() {
        let recipe = Recipe::from_draft(
            NewRecipe::new("Test Recipe").with_ingredients(["flour"]),
            Utc::now(),
        );
        let output = format!("{}", recipe);
        assert!(output.contains("Test Recipe"));
        assert!(output.contains("  - flour"));
    }
}
