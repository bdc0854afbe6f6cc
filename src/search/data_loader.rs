use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::search::catalog::Recipe;

// Recipe catalog columns
const NAME_COL: &str = "name";
const INGREDIENTS_COL: &str = "listed_translated_ingredients";
const DESCRIPTION_COL: &str = "translated_description";
const FALLBACK_DESCRIPTION_COL: &str = "description";
const IMAGE_URL_COL: &str = "image_url";
const DIET_COL: &str = "diet";
const CUISINE_COL: &str = "cuisine";
const COURSE_COL: &str = "course";
const PREP_TIME_COL: &str = "prep_time (in mins)";
const COOK_TIME_COL: &str = "cook_time (in mins)";

// Ingredient vocabulary column
const VOCABULARY_COL: &str = "Translated";

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn required_column(headers: &StringRecord, name: &str) -> Result<usize> {
    column_index(headers, name).ok_or_else(|| anyhow::anyhow!("Column '{}' not found", name))
}

fn optional_text(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn required_text(record: &StringRecord, idx: usize, column: &str, row: usize) -> Result<String> {
    optional_text(record, Some(idx))
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' at row {}", column, row))
}

fn optional_minutes(
    record: &StringRecord,
    idx: Option<usize>,
    column: &str,
    row: usize,
) -> Result<Option<u32>> {
    let Some(raw) = optional_text(record, idx) else {
        return Ok(None);
    };
    // Exports sometimes write whole minutes as floats ("30.0").
    let minutes = raw
        .parse::<u32>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
                .map(|v| v as u32)
        })
        .ok_or_else(|| anyhow::anyhow!("Invalid '{}' value {:?} at row {}", column, raw, row))?;
    Ok(Some(minutes))
}

/// Loads the recipe catalog rows, assigning ids in file order.
///
/// Rows missing a name or ingredient list, or carrying an unparsable time,
/// fail the whole load instead of being skipped.
pub fn load_recipes(csv_path: &Path) -> Result<Vec<Recipe>> {
    if !csv_path.exists() {
        return Err(anyhow::anyhow!("Recipe CSV file not found at: {:?}", csv_path));
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open recipe CSV file at {:?}", csv_path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();

    let name_idx = required_column(&headers, NAME_COL)?;
    let ingredients_idx = required_column(&headers, INGREDIENTS_COL)?;
    let description_idx = column_index(&headers, DESCRIPTION_COL)
        .or_else(|| column_index(&headers, FALLBACK_DESCRIPTION_COL));
    let image_idx = column_index(&headers, IMAGE_URL_COL);
    let diet_idx = column_index(&headers, DIET_COL);
    let cuisine_idx = column_index(&headers, CUISINE_COL);
    let course_idx = column_index(&headers, COURSE_COL);
    let prep_idx = column_index(&headers, PREP_TIME_COL);
    let cook_idx = column_index(&headers, COOK_TIME_COL);

    let mut recipes = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let row = row_index + 1;
        let record = result.with_context(|| format!("Failed to read record at row {}", row))?;

        let recipe = Recipe {
            id: recipes.len(),
            name: required_text(&record, name_idx, NAME_COL, row)?,
            ingredients_text: required_text(&record, ingredients_idx, INGREDIENTS_COL, row)?,
            description: optional_text(&record, description_idx),
            image_url: optional_text(&record, image_idx),
            diet: optional_text(&record, diet_idx),
            cuisine: optional_text(&record, cuisine_idx),
            course: optional_text(&record, course_idx),
            prep_time_mins: optional_minutes(&record, prep_idx, PREP_TIME_COL, row)?,
            cook_time_mins: optional_minutes(&record, cook_idx, COOK_TIME_COL, row)?,
        };
        recipes.push(recipe);
    }

    info!(count = recipes.len(), path = ?csv_path, "Loaded recipes");
    Ok(recipes)
}

/// Loads the selectable ingredient names, deduplicated in first-seen order.
pub fn load_ingredient_vocabulary(csv_path: &Path) -> Result<Vec<String>> {
    if !csv_path.exists() {
        return Err(anyhow::anyhow!("Ingredient CSV file not found at: {:?}", csv_path));
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open ingredient CSV file at {:?}", csv_path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    let name_idx = required_column(&headers, VOCABULARY_COL)?;

    let mut seen = HashSet::new();
    let mut vocabulary = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("Failed to read record at row {}", row_index + 1))?;
        if let Some(name) = optional_text(&record, Some(name_idx)) {
            if seen.insert(name.clone()) {
                vocabulary.push(name);
            }
        }
    }

    info!(count = vocabulary.len(), path = ?csv_path, "Loaded ingredient vocabulary");
    Ok(vocabulary)
}
