use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::results::DEFAULT_PAGE_SIZE;
use crate::search::embedding_engine::DEFAULT_EMBEDDING_MODEL_ID;
use crate::search::ranking::{MatchMode, RankingOptions};

pub const MODEL_ENV_VAR: &str = "NUTRISENSE_MODEL";
pub const CATALOG_ENV_VAR: &str = "NUTRISENSE_CATALOG";
pub const INGREDIENTS_ENV_VAR: &str = "NUTRISENSE_INGREDIENTS";
pub const PAGE_SIZE_ENV_VAR: &str = "NUTRISENSE_PAGE_SIZE";
pub const ALLOW_UNCONSTRAINED_ENV_VAR: &str = "NUTRISENSE_ALLOW_UNCONSTRAINED";
pub const CASE_INSENSITIVE_ENV_VAR: &str = "NUTRISENSE_CASE_INSENSITIVE";

const DEFAULT_CATALOG_PATH: &str = "recipes.csv";
const DEFAULT_INGREDIENTS_PATH: &str = "ingredients.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_id: String,
    pub catalog_path: PathBuf,
    pub ingredients_path: PathBuf,
    pub page_size: usize,
    pub ranking: RankingOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_EMBEDDING_MODEL_ID.to_string(),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            ingredients_path: PathBuf::from(DEFAULT_INGREDIENTS_PATH),
            page_size: DEFAULT_PAGE_SIZE,
            ranking: RankingOptions::default(),
        }
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow::anyhow!("{} must be a boolean, got {:?}", name, other)),
    }
}

impl Settings {
    /// Reads settings from the process environment after loading `.env`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(model_id) = lookup(MODEL_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            settings.model_id = model_id.trim().to_string();
        }
        if let Some(path) = lookup(CATALOG_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            settings.catalog_path = PathBuf::from(path.trim());
        }
        if let Some(path) = lookup(INGREDIENTS_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            settings.ingredients_path = PathBuf::from(path.trim());
        }
        if let Some(raw) = lookup(PAGE_SIZE_ENV_VAR) {
            let page_size = raw
                .trim()
                .parse::<usize>()
                .with_context(|| {
                    format!(
                        "{} must be a positive integer, got {:?}",
                        PAGE_SIZE_ENV_VAR, raw
                    )
                })?;
            if page_size == 0 {
                return Err(anyhow::anyhow!("{} must be greater than zero", PAGE_SIZE_ENV_VAR));
            }
            settings.page_size = page_size;
        }
        if let Some(raw) = lookup(ALLOW_UNCONSTRAINED_ENV_VAR) {
            settings.ranking.allow_unconstrained = parse_bool(ALLOW_UNCONSTRAINED_ENV_VAR, &raw)?;
        }
        if let Some(raw) = lookup(CASE_INSENSITIVE_ENV_VAR) {
            if parse_bool(CASE_INSENSITIVE_ENV_VAR, &raw)? {
                settings.ranking.match_mode = MatchMode::CaseInsensitive;
            }
        }

        Ok(settings)
    }
}
