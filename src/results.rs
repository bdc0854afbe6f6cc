use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write;

use crate::search::catalog::{Catalog, Recipe};
use crate::search::ranking::ScoredResult;

pub const DEFAULT_PAGE_SIZE: usize = 10;

const VEG_DIETS: &[&str] = &[
    "Diabetic Friendly",
    "Gluten Free",
    "High Protein Vegetarian",
    "No Onion No Garlic (Sattvic)",
    "Sugar Free Diet",
    "Vegan",
    "Vegetarian",
];
const EGG_DIETS: &[&str] = &["Eggetarian"];

/// A user's dietary profile, widening which recipe diets are acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum DietPreference {
    Veg,
    Egg,
    NonVeg,
}

impl DietPreference {
    /// Diet labels the preference admits, or `None` when anything goes.
    pub fn allowed_diets(&self) -> Option<Vec<&'static str>> {
        match self {
            DietPreference::Veg => Some(VEG_DIETS.to_vec()),
            DietPreference::Egg => Some(VEG_DIETS.iter().chain(EGG_DIETS).copied().collect()),
            DietPreference::NonVeg => None,
        }
    }

    pub fn admits(&self, diet: Option<&str>) -> bool {
        match self.allowed_diets() {
            None => true,
            Some(allowed) => diet.is_some_and(|d| allowed.contains(&d)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    pub diet: Option<String>,
    pub cuisine: Option<String>,
    pub course: Option<String>,
    pub diet_preference: Option<DietPreference>,
}

fn category_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual.as_deref() == Some(w.as_str()),
    }
}

impl ResultFilter {
    pub fn matches(&self, recipe: &Recipe) -> bool {
        category_matches(&self.diet, &recipe.diet)
            && category_matches(&self.cuisine, &recipe.cuisine)
            && category_matches(&self.course, &recipe.course)
            && self
                .diet_preference
                .map_or(true, |pref| pref.admits(recipe.diet.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum SortOrder {
    #[default]
    ScoreDesc,
    ScoreAsc,
    CookTimeAsc,
    CookTimeDesc,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeHit<'a> {
    pub recipe: &'a Recipe,
    pub score: f32,
}

impl RecipeHit<'_> {
    pub fn match_percent(&self) -> f32 {
        self.score * 100.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub total_hits: usize,
    pub hits: Vec<RecipeHit<'a>>,
}

/// Ranked results joined with their recipe rows, narrowed and re-sorted for display.
#[derive(Debug, Clone)]
pub struct ResultView<'a> {
    hits: Vec<RecipeHit<'a>>,
}

impl<'a> ResultView<'a> {
    pub fn build(
        results: &[ScoredResult],
        catalog: &'a Catalog,
        filter: &ResultFilter,
        sort: SortOrder,
    ) -> Self {
        let mut hits: Vec<RecipeHit<'a>> = results
            .iter()
            .filter_map(|r| catalog.get(r.id).map(|recipe| RecipeHit { recipe, score: r.score }))
            .filter(|hit| filter.matches(hit.recipe))
            .collect();

        // Stable sorts: ties keep the ranking order.
        match sort {
            SortOrder::ScoreDesc => {
                hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            }
            SortOrder::ScoreAsc => {
                hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal))
            }
            SortOrder::CookTimeAsc => hits.sort_by(|a, b| {
                match (a.recipe.cook_time_mins, b.recipe.cook_time_mins) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
            SortOrder::CookTimeDesc => hits.sort_by(|a, b| {
                match (a.recipe.cook_time_mins, b.recipe.cook_time_mins) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
        }

        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hits(&self) -> &[RecipeHit<'a>] {
        &self.hits
    }

    pub fn page(&self, page: usize, per_page: usize) -> Page<'a> {
        let (page, total_pages, range) = paginate(self.hits.len(), page, per_page);
        Page {
            page,
            total_pages,
            total_hits: self.hits.len(),
            hits: self.hits[range].to_vec(),
        }
    }
}

/// 1-based pagination. Returns the clamped page, the page count (at least 1)
/// and the index range to show.
pub fn paginate(
    total: usize,
    page: usize,
    per_page: usize,
) -> (usize, usize, std::ops::Range<usize>) {
    let per_page = per_page.max(1);
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);
    (page, total_pages, start.min(end)..end)
}

/// Looks up a recipe by catalog position for the detail view.
pub fn find_recipe(recipes: &[Recipe], id: usize) -> Result<&Recipe> {
    recipes.get(id).ok_or_else(|| {
        anyhow::anyhow!(
            "Recipe index {} out of range (catalog has {} recipes)",
            id,
            recipes.len()
        )
    })
}

fn minutes(value: Option<u32>) -> String {
    value.map_or_else(|| "?".to_string(), |m| format!("{} mins", m))
}

/// Renders every stored field of one recipe, ingredients one per line.
pub fn format_recipe_detail(recipe: &Recipe) -> String {
    let mut out = String::new();
    let na = "N/A";
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{} [{}]", recipe.name, recipe.id);
    let _ = writeln!(out, "Diet: {}", recipe.diet.as_deref().unwrap_or(na));
    let _ = writeln!(out, "Cuisine: {}", recipe.cuisine.as_deref().unwrap_or(na));
    let _ = writeln!(out, "Course: {}", recipe.course.as_deref().unwrap_or(na));
    let _ = writeln!(
        out,
        "Prep time: {} | Cook time: {} | Total time: {}",
        minutes(recipe.prep_time_mins),
        minutes(recipe.cook_time_mins),
        minutes(recipe.total_time_mins())
    );
    let _ = writeln!(out, "Image: {}", recipe.image_url.as_deref().unwrap_or(na));
    let _ = writeln!(
        out,
        "Description: {}",
        recipe
            .description
            .as_deref()
            .unwrap_or("No description available.")
    );
    let _ = writeln!(out, "Ingredients:");
    for ingredient in recipe
        .ingredients_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let _ = writeln!(out, "  - {}", ingredient);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::catalog::recipe;

    fn catalog() -> Catalog {
        let mut recipes = vec![
            recipe(0, "rice"),
            recipe(1, "rice, egg"),
            recipe(2, "rice, chicken"),
            recipe(3, "rice, beans"),
        ];
        recipes[0].diet = Some("Vegan".into());
        recipes[0].cook_time_mins = Some(30);
        recipes[1].diet = Some("Eggetarian".into());
        recipes[1].cook_time_mins = Some(10);
        recipes[1].cuisine = Some("Chinese".into());
        recipes[2].diet = Some("Non Vegeterian".into());
        recipes[2].cook_time_mins = Some(20);
        recipes[3].diet = Some("Vegetarian".into());
        let embeddings = vec![vec![1.0]; 4];
        Catalog::new(recipes, embeddings).unwrap()
    }

    fn results() -> Vec<ScoredResult> {
        vec![
            ScoredResult { id: 2, score: 0.9 },
            ScoredResult { id: 0, score: 0.7 },
            ScoredResult { id: 3, score: 0.5 },
            ScoredResult { id: 1, score: 0.3 },
        ]
    }

    fn view_ids(view: &ResultView) -> Vec<usize> {
        view.hits().iter().map(|h| h.recipe.id).collect()
    }

    #[test]
    fn test_default_view_keeps_ranking_order() {
        let catalog = catalog();
        let view = ResultView::build(
            &results(),
            &catalog,
            &ResultFilter::default(),
            SortOrder::default(),
        );
        assert_eq!(view_ids(&view), vec![2, 0, 3, 1]);
    }

    #[test]
    fn test_category_filter() {
        let catalog = catalog();
        let filter = ResultFilter {
            cuisine: Some("Chinese".into()),
            ..ResultFilter::default()
        };
        let view = ResultView::build(&results(), &catalog, &filter, SortOrder::ScoreDesc);
        assert_eq!(view_ids(&view), vec![1]);
    }

    #[test]
    fn test_diet_preference() {
        let catalog = catalog();
        let veg = ResultFilter {
            diet_preference: Some(DietPreference::Veg),
            ..ResultFilter::default()
        };
        let view = ResultView::build(&results(), &catalog, &veg, SortOrder::ScoreDesc);
        assert_eq!(view_ids(&view), vec![0, 3]);

        let egg = ResultFilter {
            diet_preference: Some(DietPreference::Egg),
            ..ResultFilter::default()
        };
        let view = ResultView::build(&results(), &catalog, &egg, SortOrder::ScoreDesc);
        assert_eq!(view_ids(&view), vec![0, 3, 1]);

        assert!(DietPreference::NonVeg.admits(None));
        assert!(!DietPreference::Veg.admits(None));
    }

    #[test]
    fn test_sort_orders() {
        let catalog = catalog();
        let f = ResultFilter::default();
        let asc = ResultView::build(&results(), &catalog, &f, SortOrder::ScoreAsc);
        assert_eq!(view_ids(&asc), vec![1, 3, 0, 2]);

        let quick = ResultView::build(&results(), &catalog, &f, SortOrder::CookTimeAsc);
        assert_eq!(view_ids(&quick), vec![1, 2, 0, 3]);

        let slow = ResultView::build(&results(), &catalog, &f, SortOrder::CookTimeDesc);
        assert_eq!(view_ids(&slow), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let catalog = catalog();
        let view = ResultView::build(
            &[ScoredResult { id: 99, score: 1.0 }],
            &catalog,
            &ResultFilter::default(),
            SortOrder::ScoreDesc,
        );
        assert!(view.is_empty());
    }

    #[test]
    fn test_paginate() {
        assert_eq!(paginate(0, 1, 10), (1, 1, 0..0));
        assert_eq!(paginate(25, 1, 10), (1, 3, 0..10));
        assert_eq!(paginate(25, 3, 10), (3, 3, 20..25));
        assert_eq!(paginate(25, 9, 10), (3, 3, 20..25));
        assert_eq!(paginate(25, 0, 10), (1, 3, 0..10));
        assert_eq!(paginate(3, 1, 0), (1, 3, 0..1));
    }

    #[test]
    fn test_page_of_view() {
        let catalog = catalog();
        let view = ResultView::build(
            &results(),
            &catalog,
            &ResultFilter::default(),
            SortOrder::ScoreDesc,
        );
        let page = view.page(2, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_hits, 4);
        assert_eq!(page.hits.len(), 1);
        assert_eq!(page.hits[0].recipe.id, 1);
        assert!((page.hits[0].match_percent() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_recipe_detail() {
        let catalog = catalog();
        let mut r = find_recipe(catalog.recipes(), 1).unwrap().clone();
        r.prep_time_mins = Some(5);
        r.image_url = Some("http://img/1.jpg".into());
        let text = format_recipe_detail(&r);
        assert!(text.starts_with("Recipe 1 [1]\n"));
        assert!(text.contains("Diet: Eggetarian"));
        assert!(text.contains("Cuisine: Chinese"));
        assert!(text.contains("Course: N/A"));
        assert!(text.contains("Prep time: 5 mins | Cook time: 10 mins | Total time: 15 mins"));
        assert!(text.contains("Image: http://img/1.jpg"));
        assert!(text.contains("Description: No description available."));
        assert!(text.ends_with("Ingredients:\n  - rice\n  - egg\n"));
    }

    #[test]
    fn test_find_recipe_out_of_range() {
        let catalog = catalog();
        let err = find_recipe(catalog.recipes(), 4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Recipe index 4 out of range (catalog has 4 recipes)"
        );
    }
}
