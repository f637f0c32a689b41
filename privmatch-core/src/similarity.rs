//! Similarity metrics for ranking candidate entities.
//!
//! Every metric reports a score where higher means more similar, so search
//! results sort descending and a single `min_similarity` floor applies to all
//! of them.

use serde::{Deserialize, Serialize};

/// Supported similarity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Cosine similarity in [-1, 1].
    #[default]
    Cosine,
    /// Raw inner product. Meaningful for pre-normalized embeddings.
    #[serde(alias = "dot")]
    DotProduct,
    /// `1 / (1 + euclidean_distance)`, in (0, 1].
    Euclidean,
}

impl SimilarityMetric {
    /// Scores two vectors with this metric.
    ///
    /// Vectors are expected to have the same dimension; callers validate that
    /// before scoring.
    #[inline]
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::DotProduct => dot_product(a, b),
            SimilarityMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
        }
    }

    /// Parses the short names used on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cosine" => Some(SimilarityMetric::Cosine),
            "dot" | "dotproduct" | "dot_product" => Some(SimilarityMetric::DotProduct),
            "euclidean" | "l2" => Some(SimilarityMetric::Euclidean),
            _ => None,
        }
    }
}

/// Computes cosine similarity.
///
/// Formula: (a · b) / (||a|| * ||b||). A zero vector scores 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let denominator = norm_a * norm_b;
    if denominator == 0.0 {
        return 0.0;
    }

    dot / denominator
}

/// Computes dot product (inner product) between two vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Computes Euclidean (L2) distance between two vectors.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}
