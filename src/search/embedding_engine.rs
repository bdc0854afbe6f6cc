use model2vec_rs::model::StaticModel;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "minishlab/potion-base-32M";

const DIMENSION_SAMPLE_TEXT: &str = "rice, beans, garlic";

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to load embedding model '{model_id}': {reason}")]
    ModelLoad { model_id: String, reason: String },

    #[error("Embedding model returned no vector for input: {0:?}")]
    EmptyOutput(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Embedding for input {0:?} contains NaN or infinite values")]
    NonFinite(String),
}

/// Turns text into fixed-length vectors.
///
/// Implementations are loaded once and only read afterwards, so a single
/// provider can serve concurrent `rank` calls.
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Checks a freshly produced vector before it reaches similarity code.
pub fn validate_embedding(
    text: &str,
    vector: &[f32],
    expected_dimension: usize,
) -> Result<(), EmbeddingError> {
    if vector.len() != expected_dimension {
        return Err(EmbeddingError::Dimension {
            expected: expected_dimension,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::NonFinite(text.to_string()));
    }
    Ok(())
}

pub struct EmbeddingEngine {
    model: StaticModel,
    model_id: String,
    dimension: usize,
}

impl EmbeddingEngine {
    pub fn new(model_id: &str) -> Result<Self, EmbeddingError> {
        info!(model_id, "Loading embedding model");
        let model = StaticModel::from_pretrained(model_id, None, None, None).map_err(|e| {
            EmbeddingError::ModelLoad {
                model_id: model_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        // model2vec does not expose its output size, so measure it once.
        let dimension = model
            .encode(&[DIMENSION_SAMPLE_TEXT.to_string()])
            .into_iter()
            .next()
            .map(|v| v.len())
            .filter(|&len| len > 0)
            .ok_or_else(|| EmbeddingError::EmptyOutput(DIMENSION_SAMPLE_TEXT.to_string()))?;
        info!(model_id, dimension, "Embedding model ready");

        Ok(Self {
            model,
            model_id: model_id.to_string(),
            dimension,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl EmbeddingProvider for EmbeddingEngine {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }
        let vector = self
            .model
            .encode(&[text.to_string()])
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmptyOutput(text.to_string()))?;
        validate_embedding(text, &vector, self.dimension)?;
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(count = texts.len(), "Encoding batch");
        let mut encoded = self.model.encode(texts).into_iter();
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let vector = encoded
                .next()
                .ok_or_else(|| EmbeddingError::EmptyOutput(text.clone()))?;
            // Keep empty text consistent with `embed`.
            if text.is_empty() {
                vectors.push(vec![0.0; self.dimension]);
                continue;
            }
            validate_embedding(text, &vector, self.dimension)?;
            vectors.push(vector);
        }
        Ok(vectors)
    }
}
