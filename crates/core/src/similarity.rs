//! Similarity measures: embedding cosine similarity and the weighted
//! signature similarity used for scene boundary detection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::signature::{Signature, HISTOGRAM_BUCKETS};
use crate::threshold_validation::validate_unit_range;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Default weight of the class-overlap (Jaccard) term.
pub const DEFAULT_CLASS_WEIGHT: f64 = 0.5;

/// Default weight of the spatial-histogram cosine term.
pub const DEFAULT_SPATIAL_WEIGHT: f64 = 0.3;

/// Default weight of the per-category count term.
pub const DEFAULT_COUNT_WEIGHT: f64 = 0.2;

/// Tolerance used when checking that weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Relative weights of the three signature-similarity terms.
///
/// The defaults were chosen empirically; treat them as tunable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub class: f64,
    pub spatial: f64,
    pub count: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            class: DEFAULT_CLASS_WEIGHT,
            spatial: DEFAULT_SPATIAL_WEIGHT,
            count: DEFAULT_COUNT_WEIGHT,
        }
    }
}

impl SimilarityWeights {
    /// Each weight must lie in `[0, 1]` and together they must sum to 1.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_unit_range(self.class, "class weight")?;
        validate_unit_range(self.spatial, "spatial weight")?;
        validate_unit_range(self.count, "count weight")?;
        let sum = self.class + self.spatial + self.count;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CoreError::Validation(format!(
                "Similarity weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Embedding cosine similarity
// ---------------------------------------------------------------------------

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Returns `0.0` if vectors have different
/// lengths, are empty, or either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();

    let norm_a: f64 = a.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// Signature terms
// ---------------------------------------------------------------------------

/// Jaccard index of two class sets; two empty sets are identical (1.0).
pub fn class_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Cosine similarity of two spatial histograms.
///
/// Two all-zero histograms are identical (1.0); an all-zero histogram
/// against a populated one is undefined and scores 0.0.
pub fn spatial_similarity(a: &[f64; HISTOGRAM_BUCKETS], b: &[f64; HISTOGRAM_BUCKETS]) -> f64 {
    if a == b {
        return 1.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// `1 / (1 + sum |count_a - count_b|)` over the union of categories.
pub fn count_similarity(a: &Signature, b: &Signature) -> f64 {
    let categories: BTreeSet<&String> = a.class_counts.keys().chain(b.class_counts.keys()).collect();
    let diff: u32 = categories
        .into_iter()
        .map(|label| {
            let ca = a.class_counts.get(label).copied().unwrap_or(0);
            let cb = b.class_counts.get(label).copied().unwrap_or(0);
            ca.abs_diff(cb)
        })
        .sum();
    1.0 / (1.0 + f64::from(diff))
}

/// Weighted similarity of two signatures, clamped to `[0, 1]`.
///
/// Identical signatures score exactly 1.0.
pub fn signature_similarity(a: &Signature, b: &Signature, weights: &SimilarityWeights) -> f64 {
    if a == b {
        return 1.0;
    }

    let score = weights.class * class_similarity(&a.classes, &b.classes)
        + weights.spatial * spatial_similarity(&a.spatial_histogram, &b.spatial_histogram)
        + weights.count * count_similarity(a, b);

    score.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
