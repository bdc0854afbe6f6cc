//! Turns must-have / nice-to-have / exclude ingredient lists into an ordered
//! list of scored recipes.
//!
//! Ranking is two-phase: a hard filter on the raw ingredient text decides
//! which recipes are candidates at all, then semantic similarity between the
//! joined query terms and each candidate's embedding decides the order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::search::catalog::{Catalog, Recipe};
use crate::search::embedding_engine::{validate_embedding, EmbeddingError, EmbeddingProvider};
use crate::search::similarity::cosine_similarity;

/// Weight of the nice-to-have similarity relative to the must-have similarity.
pub const NICE_TO_HAVE_WEIGHT: f32 = 0.5;

const TERM_SEPARATOR: &str = ", ";

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Invalid query: must-have, nice-to-have and exclude lists are all empty")]
    InvalidQuery,

    #[error("Embedding failure: {0}")]
    EmbeddingFailure(#[from] EmbeddingError),
}

/// How ingredient terms are matched against a recipe's ingredient text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// Case-sensitive substring containment, exactly as stored.
    #[default]
    Exact,
    /// Lowercases both sides before the containment check.
    CaseInsensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RankingOptions {
    pub match_mode: MatchMode,
    /// Rank the whole catalog for an all-empty query instead of rejecting it.
    pub allow_unconstrained: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    must_have: Vec<String>,
    nice_to_have: Vec<String>,
    exclude: Vec<String>,
}

fn dedup_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(Into::into)
        .filter(|term| !term.is_empty() && seen.insert(term.clone()))
        .collect()
}

impl Query {
    /// Empty strings are dropped (an empty term would match every recipe) and
    /// duplicates collapse to their first occurrence.
    pub fn new<I, J, K, S>(must_have: I, nice_to_have: J, exclude: K) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            must_have: dedup_terms(must_have),
            nice_to_have: dedup_terms(nice_to_have),
            exclude: dedup_terms(exclude),
        }
    }

    pub fn must_have(&self) -> &[String] {
        &self.must_have
    }

    pub fn nice_to_have(&self) -> &[String] {
        &self.nice_to_have
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn is_unconstrained(&self) -> bool {
        self.must_have.is_empty() && self.nice_to_have.is_empty() && self.exclude.is_empty()
    }

    /// Terms from all three lists that are not in `vocabulary`, in query order.
    /// Such terms still take part in ranking; callers only report them.
    pub fn unknown_terms<'a>(&'a self, vocabulary: &HashSet<String>) -> Vec<&'a str> {
        self.must_have
            .iter()
            .chain(&self.nice_to_have)
            .chain(&self.exclude)
            .filter(|term| !vocabulary.contains(term.as_str()))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: usize,
    pub score: f32,
}

impl ScoredResult {
    /// Score scaled to the percentage shown next to each hit.
    pub fn match_percent(&self) -> f32 {
        self.score * 100.0
    }
}

/// Terms prepared once per query for the chosen match mode.
struct TermMatcher<'q> {
    mode: MatchMode,
    must_have: Vec<Cow<'q, str>>,
    exclude: Vec<Cow<'q, str>>,
}

impl<'q> TermMatcher<'q> {
    fn new(query: &'q Query, mode: MatchMode) -> Self {
        let prepare = |terms: &'q [String]| -> Vec<Cow<'q, str>> {
            terms
                .iter()
                .map(|t| match mode {
                    MatchMode::Exact => Cow::Borrowed(t.as_str()),
                    MatchMode::CaseInsensitive => Cow::Owned(t.to_lowercase()),
                })
                .collect()
        };
        Self {
            mode,
            must_have: prepare(query.must_have.as_slice()),
            exclude: prepare(query.exclude.as_slice()),
        }
    }

    fn is_candidate(&self, recipe: &Recipe) -> bool {
        let folded;
        let text = match self.mode {
            MatchMode::Exact => recipe.ingredients_text.as_str(),
            MatchMode::CaseInsensitive => {
                folded = recipe.ingredients_text.to_lowercase();
                folded.as_str()
            }
        };
        self.must_have.iter().all(|term| text.contains(term.as_ref()))
            && !self.exclude.iter().any(|term| text.contains(term.as_ref()))
    }
}

pub struct RankingEngine<'p, P: EmbeddingProvider + ?Sized> {
    provider: &'p P,
    options: RankingOptions,
}

impl<'p, P: EmbeddingProvider + ?Sized> RankingEngine<'p, P> {
    pub fn new(provider: &'p P, options: RankingOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> RankingOptions {
        self.options
    }

    /// Ranks every candidate recipe in `catalog` for `query`.
    ///
    /// Returns the full candidate list, best first; equal scores keep
    /// ascending id order. Returns an empty list for an empty catalog or when
    /// nothing survives filtering. Provider errors are passed through as-is.
    pub fn rank(&self, query: &Query, catalog: &Catalog) -> Result<Vec<ScoredResult>, RankError> {
        if catalog.is_empty() {
            return Ok(Vec::new());
        }
        if query.is_unconstrained() && !self.options.allow_unconstrained {
            return Err(RankError::InvalidQuery);
        }

        let matcher = TermMatcher::new(query, self.options.match_mode);
        let candidates: Vec<usize> = catalog
            .recipes()
            .iter()
            .filter(|recipe| matcher.is_candidate(recipe))
            .map(|recipe| recipe.id)
            .collect();
        debug!(
            candidates = candidates.len(),
            catalog = catalog.len(),
            "Hard filter applied"
        );
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let must_vec = self.embed_terms(query.must_have(), catalog.dimension())?;
        let nice_vec = if query.nice_to_have().is_empty() {
            None
        } else {
            Some(self.embed_terms(query.nice_to_have(), catalog.dimension())?)
        };

        let mut scored: Vec<ScoredResult> = candidates
            .par_iter()
            .filter_map(|&id| catalog.embedding(id).map(|embedding| (id, embedding)))
            .map(|(id, embedding)| {
                let sim_must = cosine_similarity(&must_vec, embedding);
                let sim_nice = nice_vec
                    .as_deref()
                    .map_or(0.0, |nice| cosine_similarity(nice, embedding));
                ScoredResult {
                    id,
                    score: sim_must + NICE_TO_HAVE_WEIGHT * sim_nice,
                }
            })
            .collect();

        sort_results(&mut scored);
        Ok(scored)
    }

    fn embed_terms(&self, terms: &[String], dimension: usize) -> Result<Vec<f32>, RankError> {
        let text = terms.join(TERM_SEPARATOR);
        let vector = self.provider.embed(&text)?;
        validate_embedding(&text, &vector, dimension)?;
        Ok(vector)
    }
}

/// Score descending, ties broken by ascending id.
pub fn sort_results(results: &mut [ScoredResult]) {
    // Catalog::new and embed_terms reject non-finite vectors, so scores are finite.
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}
