//! Similarity backends: keyword Jaccard and embedding cosine.
//!
//! A scope picks exactly one backend up front. The two metrics are not
//! numerically comparable, so each carries its own threshold and a run
//! never mixes them.

use std::collections::HashSet;

use examlens_core::config::{BackendPreference, ClusteringConfig};
use examlens_core::{BackendKind, QuestionView};
use tracing::debug;

use crate::error::ClusterError;
use crate::keywords::extract_keywords;

/// Jaccard overlap of two keyword sets, in `[0, 1]`.
///
/// Defined as 0 when either set is empty, so degenerate questions never
/// link to anything.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Cosine similarity of two vectors, floored at 0 and capped at 1.
///
/// Both vectors must have the same non-zero length. A zero-norm vector has
/// similarity 0 to everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, ClusterError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(ClusterError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0))
}

/// Per-scope similarity capability over dense question indices.
#[derive(Debug, Clone)]
pub enum SimilarityBackend<'a> {
    Keyword { keywords: Vec<HashSet<String>> },
    Embedding { vectors: Vec<&'a [f32]> },
}

impl<'a> SimilarityBackend<'a> {
    /// Keyword backend over already-normalized texts.
    pub fn keyword<S: AsRef<str>>(normalized: &[S]) -> Self {
        Self::Keyword {
            keywords: normalized
                .iter()
                .map(|t| extract_keywords(t.as_ref()))
                .collect(),
        }
    }

    pub fn embedding(vectors: Vec<&'a [f32]>) -> Self {
        Self::Embedding { vectors }
    }

    /// Choose the backend for a scope.
    ///
    /// Embeddings are used only when every question carries one and all of
    /// them share one valid dimension. Missing embeddings fall back to
    /// keywords for the whole scope, with a warning when only some are
    /// missing. Malformed or mixed-dimension vectors fail the scope instead
    /// of being silently dropped.
    pub fn select<S: AsRef<str>>(
        questions: &'a [QuestionView],
        normalized: &[S],
        config: &ClusteringConfig,
    ) -> Result<(Self, Vec<String>), ClusterError> {
        let mut warnings = Vec::new();

        if config.backend == BackendPreference::Keyword {
            debug!("Keyword backend forced by configuration");
            return Ok((Self::keyword(normalized), warnings));
        }

        let mut dimension: Option<(usize, uuid::Uuid)> = None;
        let mut vectors = Vec::with_capacity(questions.len());
        for q in questions {
            let Some(embedding) = q.embedding.as_deref() else {
                continue;
            };
            if embedding.is_empty() {
                return Err(ClusterError::BackendSelection(format!(
                    "question {} has an empty embedding",
                    q.id
                )));
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(ClusterError::BackendSelection(format!(
                    "question {} has a non-finite embedding component",
                    q.id
                )));
            }
            match dimension {
                None => dimension = Some((embedding.len(), q.id)),
                Some((dim, first)) if dim != embedding.len() => {
                    return Err(ClusterError::BackendSelection(format!(
                        "mixed embedding dimensions: {} (question {}) vs {} (question {})",
                        dim,
                        first,
                        embedding.len(),
                        q.id
                    )));
                }
                Some(_) => {}
            }
            vectors.push(embedding);
        }

        if let (Some((dim, _)), Some(expected)) = (dimension, config.embedding_dim) {
            if dim != expected {
                return Err(ClusterError::BackendSelection(format!(
                    "embeddings have dimension {}, expected {}",
                    dim, expected
                )));
            }
        }

        if vectors.is_empty() {
            return Ok((Self::keyword(normalized), warnings));
        }
        if vectors.len() < questions.len() {
            warnings.push(format!(
                "{} of {} questions lack embeddings; using keyword backend for the whole scope",
                questions.len() - vectors.len(),
                questions.len()
            ));
            return Ok((Self::keyword(normalized), warnings));
        }
        Ok((Self::embedding(vectors), warnings))
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Keyword { .. } => BackendKind::Keyword,
            Self::Embedding { .. } => BackendKind::Embedding,
        }
    }

    /// Number of questions this backend scores.
    pub fn len(&self) -> usize {
        match self {
            Self::Keyword { keywords } => keywords.len(),
            Self::Embedding { vectors } => vectors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The linking threshold configured for this backend.
    pub fn threshold(&self, config: &ClusteringConfig) -> f64 {
        match self {
            Self::Keyword { .. } => config.keyword_threshold,
            Self::Embedding { .. } => config.embedding_threshold,
        }
    }

    /// Similarity of questions `i` and `j`, in `[0, 1]`.
    pub fn similarity(&self, i: usize, j: usize) -> Result<f64, ClusterError> {
        match self {
            Self::Keyword { keywords } => Ok(jaccard_similarity(&keywords[i], &keywords[j])),
            Self::Embedding { vectors } => cosine_similarity(vectors[i], vectors[j]),
        }
    }
}
