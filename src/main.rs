use anyhow::{Context, Result};
use nutrisense::cli::parse_args;
use nutrisense::config::Settings;
use nutrisense::results::{find_recipe, format_recipe_detail, Page, ResultView};
use nutrisense::search::{
    load_ingredient_vocabulary, load_recipes, Catalog, EmbeddingEngine, Query, RankingEngine,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_page(page: &Page) {
    println!("Page {} of {} ({} recipes)", page.page, page.total_pages, page.total_hits);
    for hit in &page.hits {
        let cook_time = hit
            .recipe
            .cook_time_mins
            .map_or_else(|| "?".to_string(), |m| m.to_string());
        println!(
            "[{}] {} | cooking time: {} mins | match: {:.2}%",
            hit.recipe.id,
            hit.recipe.name,
            cook_time,
            hit.match_percent()
        );
    }
}

/// Reports query terms missing from the ingredient vocabulary. They stay in the query.
fn warn_unknown_terms(query: &Query, settings: &Settings) {
    if query.is_unconstrained() {
        return;
    }
    let names = match load_ingredient_vocabulary(&settings.ingredients_path) {
        Ok(names) => names,
        Err(e) => {
            debug!(path = ?settings.ingredients_path, "Skipping vocabulary check: {:#}", e);
            return;
        }
    };
    let vocabulary: HashSet<String> = names.into_iter().collect();
    for term in query.unknown_terms(&vocabulary) {
        warn!(term, "Ingredient not in the vocabulary, matching it as typed");
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = parse_args();
    let settings = cli.apply_to(Settings::from_env()?);

    if cli.list_ingredients {
        let vocabulary = load_ingredient_vocabulary(&settings.ingredients_path).with_context(|| {
            format!(
                "Failed to load ingredient list from {:?}",
                settings.ingredients_path
            )
        })?;
        for name in vocabulary {
            println!("{}", name);
        }
        return Ok(());
    }

    let query = cli.query();

    if cli.show.is_none() {
        warn_unknown_terms(&query, &settings);
    }

    // One-time initialization: recipes, model, then catalog embeddings.
    let recipes = load_recipes(&settings.catalog_path)
        .with_context(|| format!("Failed to load recipes from {:?}", settings.catalog_path))?;

    if let Some(id) = cli.show {
        print!("{}", format_recipe_detail(find_recipe(&recipes, id)?));
        return Ok(());
    }

    let engine = EmbeddingEngine::new(&settings.model_id)
        .with_context(|| format!("Failed to initialize embedding model '{}'", settings.model_id))?;
    let catalog = Catalog::build(recipes, &engine).context("Failed to build recipe catalog")?;

    let ranking = RankingEngine::new(&engine, settings.ranking);
    let results = ranking.rank(&query, &catalog).context("Ranking failed")?;
    info!(
        model = engine.model_id(),
        candidates = results.len(),
        "Search completed"
    );

    let view = ResultView::build(&results, &catalog, &cli.filter(), cli.sort);
    let page = view.page(cli.page, settings.page_size);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else if page.hits.is_empty() {
        println!("No recipes found.");
    } else {
        print_page(&page);
    }

    Ok(())
}
