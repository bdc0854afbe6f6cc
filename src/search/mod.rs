pub mod catalog;
pub mod data_loader;
pub mod embedding_engine;
pub mod ranking;
pub mod similarity;

pub use catalog::{Catalog, CatalogError, Recipe};
pub use data_loader::{load_ingredient_vocabulary, load_recipes};
pub use embedding_engine::{EmbeddingEngine, EmbeddingError, EmbeddingProvider};
pub use ranking::{MatchMode, Query, RankError, RankingEngine, RankingOptions, ScoredResult};
