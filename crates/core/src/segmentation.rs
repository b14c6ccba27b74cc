//! Scene segmentation: boundary detection over signature samples and
//! length normalization of the resulting candidates.
//!
//! Everything here is pure and synchronous. Frame sampling and detector calls
//! live in the pipeline crate, which feeds [`SignatureSample`]s into
//! [`detect_boundaries`] and the resulting timestamps through
//! [`boundaries_to_candidates`] and [`normalize_lengths`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scene::SceneCandidate;
use crate::signature::Signature;
use crate::similarity::{signature_similarity, SimilarityWeights};
use crate::threshold_validation::{validate_non_zero, validate_positive, validate_unit_range};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Process every Nth frame by default.
pub const DEFAULT_SAMPLE_STRIDE: usize = 5;

/// Default change threshold (0-1, lower = more scenes).
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// Default minimum scene length in seconds.
pub const DEFAULT_MIN_SCENE_LEN: f64 = 2.0;

/// Default maximum scene length in seconds.
pub const DEFAULT_MAX_SCENE_LEN: f64 = 10.0;

/// Slack applied to length comparisons so float noise never re-triggers a
/// split or merge on already-normalized output.
const LENGTH_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for one segmentation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Sample every `sample_stride`-th frame.
    pub sample_stride: usize,
    /// Change threshold in `[0, 1]`; lower produces more, shorter scenes.
    pub threshold: f64,
    /// Scenes shorter than this (seconds) are merged into a neighbour.
    pub min_len: f64,
    /// Scenes longer than this (seconds) are subdivided.
    pub max_len: f64,
    #[serde(default)]
    pub weights: SimilarityWeights,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            threshold: DEFAULT_THRESHOLD,
            min_len: DEFAULT_MIN_SCENE_LEN,
            max_len: DEFAULT_MAX_SCENE_LEN,
            weights: SimilarityWeights::default(),
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_non_zero(self.sample_stride, "sample_stride")?;
        validate_unit_range(self.threshold, "threshold")?;
        validate_length_bounds(self.min_len, self.max_len)?;
        self.weights.validate()
    }
}

/// `min_len` may be zero; `max_len` must be positive and at least twice
/// `min_len` so that split chunks never fall below the merge limit.
pub fn validate_length_bounds(min_len: f64, max_len: f64) -> Result<(), CoreError> {
    if !min_len.is_finite() || min_len < 0.0 {
        return Err(CoreError::Validation(format!(
            "min_len must be a non-negative number, got {min_len}"
        )));
    }
    validate_positive(max_len, "max_len")?;
    if max_len < 2.0 * min_len {
        return Err(CoreError::Validation(format!(
            "max_len ({max_len}) must be at least twice min_len ({min_len})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Boundary detection
// ---------------------------------------------------------------------------

/// One sampled frame's signature, positioned on the video timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSample {
    pub timestamp: f64,
    pub signature: Signature,
}

/// Similarity level below which consecutive samples are cut apart.
pub fn cut_level(threshold: f64) -> f64 {
    1.0 - threshold
}

/// Whether a pair with the given similarity marks a scene change.
pub fn is_boundary(similarity: f64, threshold: f64) -> bool {
    similarity < cut_level(threshold)
}

/// Similarity of each adjacent pair of samples, in timeline order.
///
/// Entry `i` compares sample `i` with sample `i + 1`.
pub fn pairwise_similarities(samples: &[SignatureSample], weights: &SimilarityWeights) -> Vec<f64> {
    samples
        .windows(2)
        .map(|pair| signature_similarity(&pair[0].signature, &pair[1].signature, weights))
        .collect()
}

/// Timestamps of the samples that start a new scene.
///
/// A boundary is placed at the later sample of each adjacent pair whose
/// similarity falls below the cut level.
pub fn detect_boundaries(
    samples: &[SignatureSample],
    threshold: f64,
    weights: &SimilarityWeights,
) -> Vec<f64> {
    pairwise_similarities(samples, weights)
        .into_iter()
        .zip(samples.iter().skip(1))
        .filter(|(similarity, _)| is_boundary(*similarity, threshold))
        .map(|(_, sample)| sample.timestamp)
        .collect()
}

/// Turn boundary timestamps into contiguous candidates covering
/// `[0, duration)`.
///
/// Boundaries outside the open interval `(0, duration)` and duplicates are
/// ignored; input order does not matter.
pub fn boundaries_to_candidates(
    boundaries: &[f64],
    duration: f64,
) -> Result<Vec<SceneCandidate>, CoreError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(CoreError::InvalidRange {
            start: 0.0,
            end: duration,
        });
    }

    let mut cuts: Vec<f64> = boundaries
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t > 0.0 && *t < duration)
        .collect();
    cuts.sort_by(f64::total_cmp);
    cuts.dedup();

    let mut edges = Vec::with_capacity(cuts.len() + 2);
    edges.push(0.0);
    edges.extend(cuts);
    edges.push(duration);

    edges
        .windows(2)
        .map(|w| SceneCandidate::new(w[0], w[1]))
        .collect()
}

// ---------------------------------------------------------------------------
// Length normalization
// ---------------------------------------------------------------------------

/// Merge short candidates into their neighbours, then split long ones.
///
/// * A candidate shorter than `min_len` is absorbed by the previous output
///   candidate; with no previous candidate it is held and merged forward.
/// * A candidate longer than `max_len` is cut into `ceil(len / max_len)`
///   equal chunks, each longer than `max_len / 2`.
///
/// The input must be contiguous and ordered. The output covers the same span
/// and running the function on its own output returns it unchanged.
pub fn normalize_lengths(
    candidates: &[SceneCandidate],
    min_len: f64,
    max_len: f64,
) -> Result<Vec<SceneCandidate>, CoreError> {
    validate_length_bounds(min_len, max_len)?;

    let merged = merge_short(candidates, min_len);

    let mut normalized = Vec::with_capacity(merged.len());
    for candidate in merged {
        split_long(candidate, max_len, &mut normalized)?;
    }
    Ok(normalized)
}

fn merge_short(candidates: &[SceneCandidate], min_len: f64) -> Vec<SceneCandidate> {
    let mut output: Vec<SceneCandidate> = Vec::with_capacity(candidates.len());
    let mut held_start: Option<f64> = None;

    for candidate in candidates {
        let start = held_start.unwrap_or(candidate.start_time);
        let length = candidate.end_time - start;

        if length < min_len - LENGTH_EPSILON {
            match output.last_mut() {
                Some(previous) => previous.end_time = candidate.end_time,
                None => held_start = Some(start),
            }
            continue;
        }

        output.push(SceneCandidate {
            start_time: start,
            end_time: candidate.end_time,
        });
        held_start = None;
    }

    // Everything was shorter than min_len: keep the whole span as one scene.
    if let (Some(start), Some(last)) = (held_start, candidates.last()) {
        output.push(SceneCandidate {
            start_time: start,
            end_time: last.end_time,
        });
    }

    output
}

fn split_long(
    candidate: SceneCandidate,
    max_len: f64,
    out: &mut Vec<SceneCandidate>,
) -> Result<(), CoreError> {
    let length = candidate.duration();
    if length <= max_len + LENGTH_EPSILON {
        out.push(candidate);
        return Ok(());
    }

    let chunks = (length / max_len).ceil() as usize;
    let chunk_len = length / chunks as f64;
    let mut start = candidate.start_time;
    for i in 1..=chunks {
        let end = if i == chunks {
            candidate.end_time
        } else {
            candidate.start_time + chunk_len * i as f64
        };
        out.push(SceneCandidate::new(start, end)?);
        start = end;
    }
    Ok(())
}

/// Whether `candidates` tile `[0, duration)` exactly: first starts at zero,
/// last ends at `duration`, each starts where the previous ended.
pub fn covers_timeline(candidates: &[SceneCandidate], duration: f64) -> bool {
    let (Some(first), Some(last)) = (candidates.first(), candidates.last()) else {
        return false;
    };
    first.start_time == 0.0
        && last.end_time == duration
        && candidates
            .windows(2)
            .all(|w| w[0].end_time == w[1].start_time && w[0].start_time < w[0].end_time)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
