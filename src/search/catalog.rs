use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::search::embedding_engine::{EmbeddingError, EmbeddingProvider};
use crate::search::similarity::is_zero_vector;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recipe {
    /// Catalog position. Doubles as the recipe identifier everywhere.
    pub id: usize,
    pub name: String,
    /// Normalized ingredient names as free text; membership is checked by containment.
    pub ingredients_text: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub diet: Option<String>,
    pub cuisine: Option<String>,
    pub course: Option<String>,
    pub prep_time_mins: Option<u32>,
    pub cook_time_mins: Option<u32>,
}

impl Recipe {
    pub fn total_time_mins(&self) -> Option<u32> {
        match (self.prep_time_mins, self.cook_time_mins) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0) + cook.unwrap_or(0)),
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Recipes and embeddings count mismatch: {recipes} vs {embeddings}")]
    LengthMismatch { recipes: usize, embeddings: usize },

    #[error("Recipe at position {position} has id {id}")]
    IdMismatch { position: usize, id: usize },

    #[error("Embedding dimension mismatch for recipe {id}. Expected {expected}, got {actual}.")]
    DimensionMismatch {
        id: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Embedding for recipe {0} contains NaN or Infinity")]
    NonFiniteEmbedding(usize),

    #[error("Failed to embed catalog: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Immutable snapshot of every recipe and its precomputed embedding.
///
/// `embeddings[i]` always belongs to `recipes[i]`, and `recipes[i].id == i`.
#[derive(Debug)]
pub struct Catalog {
    recipes: Vec<Recipe>,
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
}

impl Catalog {
    pub fn new(recipes: Vec<Recipe>, embeddings: Vec<Vec<f32>>) -> Result<Self, CatalogError> {
        if recipes.len() != embeddings.len() {
            return Err(CatalogError::LengthMismatch {
                recipes: recipes.len(),
                embeddings: embeddings.len(),
            });
        }

        if let Some((position, recipe)) = recipes
            .iter()
            .enumerate()
            .find(|(position, recipe)| recipe.id != *position)
        {
            return Err(CatalogError::IdMismatch {
                position,
                id: recipe.id,
            });
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        let mut zero_vectors = 0usize;
        for (id, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(CatalogError::DimensionMismatch {
                    id,
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(CatalogError::NonFiniteEmbedding(id));
            }
            if is_zero_vector(embedding) {
                zero_vectors += 1;
            }
        }
        if zero_vectors > 0 {
            warn!(
                zero_vectors,
                "Catalog contains all-zero embeddings; those recipes score 0 similarity"
            );
        }

        Ok(Self {
            recipes,
            embeddings,
            dimension,
        })
    }

    /// Embeds every recipe's ingredient text once and assembles the catalog.
    pub fn build<P: EmbeddingProvider + ?Sized>(
        recipes: Vec<Recipe>,
        provider: &P,
    ) -> Result<Self, CatalogError> {
        info!(recipes = recipes.len(), "Generating catalog embeddings");
        let texts: Vec<String> = recipes.iter().map(|r| r.ingredients_text.clone()).collect();
        let embeddings = provider.embed_batch(&texts)?;
        let catalog = Self::new(recipes, embeddings)?;
        if !catalog.is_empty() && catalog.dimension != provider.dimension() {
            return Err(CatalogError::DimensionMismatch {
                id: 0,
                expected: provider.dimension(),
                actual: catalog.dimension,
            });
        }
        info!(
            recipes = catalog.len(),
            dimension = catalog.dimension,
            "Catalog ready"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Embedding dimension, 0 for an empty catalog.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn get(&self, id: usize) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    pub fn embedding(&self, id: usize) -> Option<&[f32]> {
        self.embeddings.get(id).map(Vec::as_slice)
    }
}

#[cfg(test)]
pub(crate) fn recipe(id: usize, ingredients_text: &str) -> Recipe {
    Recipe {
        id,
        name: format!("Recipe {}", id),
        ingredients_text: ingredients_text.to_string(),
        description: None,
        image_url: None,
        diet: None,
        cuisine: None,
        course: None,
        prep_time_mins: None,
        cook_time_mins: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = Catalog::new(vec![recipe(0, "rice")], vec![]).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::LengthMismatch {
                recipes: 1,
                embeddings: 0
            }
        ));
    }

    #[test]
    fn test_new_rejects_out_of_order_ids() {
        let err = Catalog::new(
            vec![recipe(0, "rice"), recipe(5, "beans")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::IdMismatch { position: 1, id: 5 }));
    }

    #[test]
    fn test_new_rejects_ragged_embeddings() {
        let err = Catalog::new(
            vec![recipe(0, "rice"), recipe(1, "beans")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0, 0.0]],
        )
        .unwrap_err();
        assert!(err.to_string().contains("Expected 2, got 3"));
    }

    #[test]
    fn test_new_rejects_nan_embedding() {
        let err = Catalog::new(vec![recipe(0, "rice")], vec![vec![f32::NAN, 1.0]]).unwrap_err();
        assert!(matches!(err, CatalogError::NonFiniteEmbedding(0)));
    }

    #[test]
    fn test_zero_vectors_are_accepted() {
        let catalog = Catalog::new(vec![recipe(0, "rice")], vec![vec![0.0, 0.0]]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.dimension(), 2);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new(vec![], vec![]).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.dimension(), 0);
        assert!(catalog.get(0).is_none());
    }

    #[test]
    fn test_accessors_line_up() {
        let catalog = Catalog::new(
            vec![recipe(0, "rice"), recipe(1, "beans")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        assert_eq!(catalog.get(1).unwrap().ingredients_text, "beans");
        assert_eq!(catalog.embedding(1).unwrap(), &[0.0, 1.0]);
        assert_eq!(catalog.recipes().len(), 2);
    }

    #[test]
    fn test_total_time() {
        let mut r = recipe(0, "rice");
        assert_eq!(r.total_time_mins(), None);
        r.cook_time_mins = Some(20);
        assert_eq!(r.total_time_mins(), Some(20));
        r.prep_time_mins = Some(15);
        assert_eq!(r.total_time_mins(), Some(35));
    }
}
