use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;
use crate::results::{DietPreference, ResultFilter, SortOrder};
use crate::search::ranking::{MatchMode, Query};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Recommend recipes from ingredient constraints",
    long_about = None
)]
pub struct Cli {
    /// Ingredient every recipe must contain (repeatable, or comma separated)
    #[arg(short, long = "must", value_delimiter = ',')]
    pub must_have: Vec<String>,

    /// Ingredient that should push a recipe up the ranking
    #[arg(short, long = "nice", value_delimiter = ',')]
    pub nice_to_have: Vec<String>,

    /// Ingredient no recipe may contain
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Recipe catalog CSV (overrides NUTRISENSE_CATALOG)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Ingredient vocabulary CSV (overrides NUTRISENSE_INGREDIENTS)
    #[arg(long)]
    pub ingredients: Option<PathBuf>,

    /// Embedding model id or local path (overrides NUTRISENSE_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Print the selectable ingredient names and exit
    #[arg(long)]
    pub list_ingredients: bool,

    /// Print the full details of the recipe with this id and exit
    #[arg(long, value_name = "ID")]
    pub show: Option<usize>,

    /// Only show recipes with this diet label
    #[arg(long)]
    pub diet: Option<String>,

    #[arg(long)]
    pub cuisine: Option<String>,

    #[arg(long)]
    pub course: Option<String>,

    /// Only show recipes compatible with this dietary profile
    #[arg(long, value_enum)]
    pub diet_preference: Option<DietPreference>,

    #[arg(long, value_enum, default_value_t = SortOrder::ScoreDesc)]
    pub sort: SortOrder,

    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Results per page (overrides NUTRISENSE_PAGE_SIZE)
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub per_page: Option<usize>,

    /// Rank the whole catalog when no ingredient is given
    #[arg(long)]
    pub allow_unconstrained: bool,

    /// Ignore letter case when matching ingredient names
    #[arg(long)]
    pub case_insensitive: bool,

    /// Emit the result page as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn query(&self) -> Query {
        Query::new(
            self.must_have.iter().map(|s| s.trim().to_string()),
            self.nice_to_have.iter().map(|s| s.trim().to_string()),
            self.exclude.iter().map(|s| s.trim().to_string()),
        )
    }

    pub fn filter(&self) -> ResultFilter {
        ResultFilter {
            diet: self.diet.clone(),
            cuisine: self.cuisine.clone(),
            course: self.course.clone(),
            diet_preference: self.diet_preference,
        }
    }

    /// Applies command-line overrides on top of environment settings.
    pub fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(catalog) = &self.catalog {
            settings.catalog_path = catalog.clone();
        }
        if let Some(ingredients) = &self.ingredients {
            settings.ingredients_path = ingredients.clone();
        }
        if let Some(model) = &self.model {
            settings.model_id = model.clone();
        }
        if let Some(per_page) = self.per_page {
            settings.page_size = per_page;
        }
        if self.allow_unconstrained {
            settings.ranking.allow_unconstrained = true;
        }
        if self.case_insensitive {
            settings.ranking.match_mode = MatchMode::CaseInsensitive;
        }
        settings
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
