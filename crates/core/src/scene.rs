//! Scene candidates and summary statistics over a candidate list.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A contiguous time range, in seconds, proposed as one coherent visual unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneCandidate {
    pub start_time: f64,
    pub end_time: f64,
}

impl SceneCandidate {
    /// Construct a candidate, rejecting empty, inverted, or non-finite ranges.
    pub fn new(start_time: f64, end_time: f64) -> Result<Self, CoreError> {
        if !start_time.is_finite() || !end_time.is_finite() || start_time >= end_time {
            return Err(CoreError::InvalidRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Aggregate duration statistics for a list of scenes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneStats {
    pub count: usize,
    pub total_duration: f64,
    pub avg_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
}

/// Compute [`SceneStats`]; an empty list yields all zeros.
pub fn scene_stats(scenes: &[SceneCandidate]) -> SceneStats {
    if scenes.is_empty() {
        return SceneStats::default();
    }

    let durations = scenes.iter().map(SceneCandidate::duration);
    let total: f64 = durations.clone().sum();
    let min = durations.clone().fold(f64::INFINITY, f64::min);
    let max = durations.fold(f64::NEG_INFINITY, f64::max);

    SceneStats {
        count: scenes.len(),
        total_duration: total,
        avg_duration: total / scenes.len() as f64,
        min_duration: min,
        max_duration: max,
    }
}
