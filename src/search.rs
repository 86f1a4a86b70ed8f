//! Pure query helpers over recipe collections.

use crate::models::Recipe;

/// How multiple tags combine in [`filter_by_tags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatch {
    /// Recipe must carry every tag.
    #[default]
    All,
    /// Any one tag is enough.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Last use, or creation time for recipes never used.
    #[default]
    LastUsed,
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Case-insensitive substring match over title, description, ingredients
/// and tags. A blank term matches everything.
pub fn search_recipes(recipes: &[Recipe], term: &str) -> Vec<Recipe> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return recipes.to_vec();
    }

    recipes
        .iter()
        .filter(|recipe| matches_term(recipe, &term))
        .cloned()
        .collect()
}

fn matches_term(recipe: &Recipe, term: &str) -> bool {
    recipe.title.to_lowercase().contains(term)
        || recipe.description.to_lowercase().contains(term)
        || recipe
            .ingredients
            .iter()
            .any(|ingredient| ingredient.to_lowercase().contains(term))
        || recipe
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(term))
}

/// Exact tag filter. No tags matches everything.
pub fn filter_by_tags(recipes: &[Recipe], tags: &[String], mode: TagMatch) -> Vec<Recipe> {
    if tags.is_empty() {
        return recipes.to_vec();
    }

    recipes
        .iter()
        .filter(|recipe| match mode {
            TagMatch::All => tags.iter().all(|tag| recipe.has_tag(tag)),
            TagMatch::Any => tags.iter().any(|tag| recipe.has_tag(tag)),
        })
        .cloned()
        .collect()
}

/// Stable sort by the chosen timestamp.
pub fn sort_recipes(recipes: &mut [Recipe], key: SortKey, order: SortOrder) {
    recipes.sort_by(|a, b| {
        let ordering = match key {
            SortKey::LastUsed => a.recency().cmp(&b.recency()),
            SortKey::Created => a.created_at.cmp(&b.created_at),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// The `limit` most recently used (or created) recipes, newest first.
pub fn recent_recipes(recipes: &[Recipe], limit: usize) -> Vec<Recipe> {
    let mut recent = recipes.to_vec();
    sort_recipes(&mut recent, SortKey::LastUsed, SortOrder::Desc);
    recent.truncate(limit);
    recent
}

/// Search, tag filter and sort in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeQuery {
    pub term: String,
    pub tags: Vec<String>,
    pub tag_match: TagMatch,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
}

impl RecipeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I, mode: TagMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self.tag_match = mode;
        self
    }

    pub fn sorted_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort_key = key;
        self.sort_order = order;
        self
    }

    pub fn apply(&self, recipes: &[Recipe]) -> Vec<Recipe> {
        let found = search_recipes(recipes, &self.term);
        let mut filtered = filter_by_tags(&found, &self.tags, self.tag_match);
        sort_recipes(&mut filtered, self.sort_key, self.sort_order);
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecipe;
    use chrono::{Duration, TimeZone, Utc};

    fn sample() -> Vec<Recipe> {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();

        let mut pancakes = Recipe::from_draft(
            NewRecipe::new("Pancakes")
                .with_ingredients(["flour", "eggs", "milk"])
                .with_tags(["breakfast", "sweet"]),
            base,
        );
        pancakes.mark_used(base + Duration::days(10));

        let curry = Recipe::from_draft(
            NewRecipe::new("Chickpea Curry")
                .with_description("Weeknight staple")
                .with_ingredients(["chickpeas", "coconut milk"])
                .with_tags(["dinner", "vegan"]),
            base + Duration::days(1),
        );

        let porridge = Recipe::from_draft(
            NewRecipe::new("Porridge")
                .with_ingredients(["oats"])
                .with_tags(["breakfast"]),
            base + Duration::days(2),
        );

        vec![pancakes, curry, porridge]
    }

    fn titles(recipes: &[Recipe]) -> Vec<&str> {
        recipes.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_search_matches_every_text_field() {
        let recipes = sample();

        assert_eq!(titles(&search_recipes(&recipes, "PANCAKE")), vec!["Pancakes"]);
        assert_eq!(titles(&search_recipes(&recipes, "weeknight")), vec!["Chickpea Curry"]);
        assert_eq!(
            titles(&search_recipes(&recipes, "milk")),
            vec!["Pancakes", "Chickpea Curry"]
        );
        assert_eq!(titles(&search_recipes(&recipes, "vegan")), vec!["Chickpea Curry"]);
        assert_eq!(search_recipes(&recipes, "   ").len(), 3);
    }

    #[test]
    fn test_filter_by_tags() {
        let recipes = sample();
        let tags = vec!["breakfast".to_string(), "sweet".to_string()];

        assert_eq!(
            titles(&filter_by_tags(&recipes, &tags, TagMatch::All)),
            vec!["Pancakes"]
        );
        assert_eq!(
            titles(&filter_by_tags(&recipes, &tags, TagMatch::Any)),
            vec!["Pancakes", "Porridge"]
        );
        assert_eq!(filter_by_tags(&recipes, &[], TagMatch::All).len(), 3);
    }

    #[test]
    fn test_sort_by_last_used_falls_back_to_created() {
        let mut recipes = sample();

        sort_recipes(&mut recipes, SortKey::LastUsed, SortOrder::Desc);
        assert_eq!(titles(&recipes), vec!["Pancakes", "Porridge", "Chickpea Curry"]);

        sort_recipes(&mut recipes, SortKey::Created, SortOrder::Asc);
        assert_eq!(titles(&recipes), vec!["Pancakes", "Chickpea Curry", "Porridge"]);
    }

    #[test]
    fn test_recent_recipes_limit() {
        let recent = recent_recipes(&sample(), 2);
        assert_eq!(titles(&recent), vec!["Pancakes", "Porridge"]);
    }

    #[test]
    fn test_query_combines_steps() {
        let query = RecipeQuery::new()
            .with_term("o")
            .with_tags(["breakfast"], TagMatch::All)
            .sorted_by(SortKey::Created, SortOrder::Desc);

        assert_eq!(titles(&query.apply(&sample())), vec!["Porridge", "Pancakes"]);
    }
}
