//! Offline retrieval-quality evaluation
//!
//! A retrieved chunk counts as relevant when its cosine similarity to any
//! expected answer exceeds a threshold. This judgement embeds both sides and
//! compares them with [`cosine_similarity`], independently
//! of the index's squared-Euclidean ranking metric.
//!
//! Two metrics are reported over a suite of categorised queries:
//! - Recall@k: 1.0 if any of the top-k chunks is relevant, else 0.0
//! - MRR: mean of `1 / rank` of the first relevant chunk (0 when none is)
//!
//! # Suite Format
//!
//! ```toml
//! [[category]]
//! name = "Respiratory"
//!
//! [[category.case]]
//! query = "fever and a dry cough"
//! expected = ["Influenza causes fever, cough and body aches."]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embed::Embedder;
use crate::index::VectorIndex;
use crate::search::SearchEngine;
use crate::{Error, Result};

/// Similarity above which a chunk is judged relevant
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.7;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction; 0.0 when
/// either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// 1-based rank of the first chunk relevant to any of `expected`.
pub fn first_relevant_rank<E: Embedder + ?Sized>(
    embedder: &E,
    chunks: &[&str],
    expected: &[&str],
    threshold: f32,
) -> Result<Option<usize>> {
    if chunks.is_empty() || expected.is_empty() {
        return Ok(None);
    }

    let expected = embedder.embed(expected)?;
    let chunks = embedder.embed(chunks)?;

    Ok(chunks
        .iter()
        .position(|chunk| {
            expected
                .iter()
                .any(|answer| cosine_similarity(answer, chunk) > threshold)
        })
        .map(|i| i + 1))
}

/// Returns `true` if any chunk is relevant to any expected answer.
pub fn is_relevant<E: Embedder + ?Sized>(
    embedder: &E,
    chunks: &[&str],
    expected: &[&str],
    threshold: f32,
) -> Result<bool> {
    Ok(first_relevant_rank(embedder, chunks, expected, threshold)?.is_some())
}

/// Recall@k for one query, given its already retrieved top-k chunks.
pub fn recall_at_k<E: Embedder + ?Sized>(
    embedder: &E,
    chunks: &[&str],
    expected: &[&str],
    threshold: f32,
) -> Result<f32> {
    Ok(if is_relevant(embedder, chunks, expected, threshold)? {
        1.0
    } else {
        0.0
    })
}

/// Reciprocal rank for one query, given its already retrieved top-k chunks.
pub fn reciprocal_rank<E: Embedder + ?Sized>(
    embedder: &E,
    chunks: &[&str],
    expected: &[&str],
    threshold: f32,
) -> Result<f32> {
    Ok(first_relevant_rank(embedder, chunks, expected, threshold)?
        .map_or(0.0, |rank| 1.0 / rank as f32))
}

/// A set of evaluation queries grouped into categories
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvalSuite {
    #[serde(default, rename = "category")]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub name: String,
    #[serde(default, rename = "case")]
    pub cases: Vec<EvalCase>,
}

/// One query and the answers a good retrieval should resemble
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalCase {
    pub query: String,
    pub expected: Vec<String>,
}

impl EvalSuite {
    /// Load a suite from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid eval suite {}: {e}", path.display())))
    }

    /// Total number of queries across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.cases.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scores for a single evaluated query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryScore {
    pub category: String,
    pub query: String,
    pub recall: f32,
    pub reciprocal_rank: f32,
}

/// Outcome of evaluating a suite
#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub k: usize,
    pub scores: Vec<QueryScore>,
}

impl EvalReport {
    /// Recall@k averaged over all queries.
    #[must_use]
    pub fn mean_recall(&self) -> f32 {
        mean(self.scores.iter().map(|s| s.recall))
    }

    /// Mean reciprocal rank over all queries.
    #[must_use]
    pub fn mrr(&self) -> f32 {
        mean(self.scores.iter().map(|s| s.reciprocal_rank))
    }

    /// Mean recall per category, in suite order.
    #[must_use]
    pub fn category_recall(&self) -> Vec<(String, f32)> {
        let mut names: Vec<&str> = Vec::new();
        for score in &self.scores {
            if !names.contains(&score.category.as_str()) {
                names.push(&score.category);
            }
        }

        names
            .into_iter()
            .map(|name| {
                let recall = mean(
                    self.scores
                        .iter()
                        .filter(|s| s.category == name)
                        .map(|s| s.recall),
                );
                (name.to_string(), recall)
            })
            .collect()
    }

    /// Number of queries whose recall falls in each of `bins` equal-width
    /// buckets over [0, 1]; a recall of exactly 1.0 lands in the last bucket.
    #[must_use]
    pub fn recall_histogram(&self, bins: usize) -> Vec<usize> {
        let mut counts = vec![0; bins];
        if bins == 0 {
            return counts;
        }
        for score in &self.scores {
            let bucket = ((score.recall.clamp(0.0, 1.0) * bins as f32) as usize).min(bins - 1);
            counts[bucket] += 1;
        }
        counts
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0f32, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f32 }
}

/// Run every query in `suite` against `engine` and score the top-k results.
pub fn evaluate<E: Embedder, I: VectorIndex>(
    engine: &SearchEngine<E, I>,
    suite: &EvalSuite,
    k: usize,
    threshold: f32,
) -> Result<EvalReport> {
    let mut scores = Vec::with_capacity(suite.len());

    for category in &suite.categories {
        for case in &category.cases {
            let chunks = engine.retrieve_chunks(&case.query, k)?;
            let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let expected: Vec<&str> = case.expected.iter().map(String::as_str).collect();

            let rank = first_relevant_rank(engine.embedder(), &chunks, &expected, threshold)?;
            debug!(query = %case.query, ?rank, "evaluated query");

            scores.push(QueryScore {
                category: category.name.clone(),
                query: case.query.clone(),
                recall: if rank.is_some() { 1.0 } else { 0.0 },
                reciprocal_rank: rank.map_or(0.0, |r| 1.0 / r as f32),
            });
        }
    }

    Ok(EvalReport { k, scores })
}
