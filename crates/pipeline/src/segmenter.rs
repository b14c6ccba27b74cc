//! Segmentation engine: samples frames, asks the detector for each sample,
//! and turns the signature stream into normalized scene candidates.
//!
//! Detection for each sample runs concurrently through a [`TaskGroup`];
//! boundary assembly happens afterwards, in timeline order. A sample whose
//! frame or detection fails gets an empty signature and a
//! [`Degradation::DetectionFailed`] entry instead of failing the run.

use std::sync::Arc;

use serde::Serialize;
use takeone_capabilities::{Detector, RetryPolicy};
use takeone_core::degradation::Degradation;
use takeone_core::error::CoreError;
use takeone_core::scene::{scene_stats, SceneCandidate, SceneStats};
use takeone_core::search::DEFAULT_FANOUT_CONCURRENCY;
use takeone_core::segmentation::{
    boundaries_to_candidates, detect_boundaries, normalize_lengths, SegmentationConfig,
    SignatureSample,
};
use takeone_core::signature::{extract, Signature};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::frame_source::FrameSource;
use crate::task_group::TaskGroup;

/// Result of one segmentation run.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationOutcome {
    pub scenes: Vec<SceneCandidate>,
    pub stats: SceneStats,
    /// Video length in seconds.
    pub duration: f64,
    /// Number of frames that were sampled.
    pub samples: usize,
    /// Raw boundary timestamps, before length normalization.
    pub boundaries: Vec<f64>,
    pub degradations: Vec<Degradation>,
}

pub struct SegmentationEngine {
    detector: Arc<dyn Detector>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl SegmentationEngine {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self {
            detector,
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Maximum number of frames decoded and detected at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Segment `source` into scene candidates covering its whole timeline.
    ///
    /// Returns [`PipelineError::Cancelled`] as soon as `cancel` fires; any
    /// in-flight detection is aborted and partial results are discarded.
    pub async fn segment(
        &self,
        source: Arc<dyn FrameSource>,
        config: &SegmentationConfig,
        cancel: &CancellationToken,
    ) -> Result<SegmentationOutcome, PipelineError> {
        config.validate()?;

        let fps = source.fps();
        if !fps.is_finite() || fps <= 0.0 {
            return Err(CoreError::Validation(format!("frame rate must be positive, got {fps}")).into());
        }
        if source.frame_count() == 0 {
            return Err(CoreError::Validation("video has no frames".to_string()).into());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Segmentation cancelled");
                Err(PipelineError::Cancelled)
            }
            outcome = self.run(source, config) => outcome,
        }
    }

    async fn run(
        &self,
        source: Arc<dyn FrameSource>,
        config: &SegmentationConfig,
    ) -> Result<SegmentationOutcome, PipelineError> {
        let started = std::time::Instant::now();
        let duration = source.duration();
        let frame_count = source.frame_count();

        let indices: Vec<u64> = (0..frame_count).step_by(config.sample_stride).collect();
        tracing::info!(
            frame_count,
            fps = source.fps(),
            samples = indices.len(),
            stride = config.sample_stride,
            "Sampling frames for segmentation",
        );

        let mut group = TaskGroup::new(self.concurrency);
        for &index in &indices {
            let source = Arc::clone(&source);
            let detector = Arc::clone(&self.detector);
            let retry = self.retry;
            group.spawn(async move { sample_frame(source.as_ref(), detector.as_ref(), retry, index).await });
        }

        let mut samples = Vec::with_capacity(indices.len());
        let mut degradations = Vec::new();
        for (index, joined) in indices.iter().copied().zip(group.join_all().await) {
            let timestamp = source.timestamp(index);
            let (signature, failure) = match joined {
                Ok(Ok(signature)) => (signature, None),
                Ok(Err(reason)) => (Signature::empty(), Some(reason)),
                Err(panicked) => (Signature::empty(), Some(panicked.to_string())),
            };
            if let Some(reason) = failure {
                tracing::warn!(frame = index, timestamp, reason = %reason, "Detection failed, using empty signature");
                degradations.push(Degradation::DetectionFailed {
                    timestamp_ms: (timestamp * 1000.0).round() as u64,
                    reason,
                });
            }
            samples.push(SignatureSample {
                timestamp,
                signature,
            });
        }

        let boundaries = detect_boundaries(&samples, config.threshold, &config.weights);
        let candidates = boundaries_to_candidates(&boundaries, duration)?;
        let scenes = normalize_lengths(&candidates, config.min_len, config.max_len)?;
        let stats = scene_stats(&scenes);

        tracing::info!(
            scenes = scenes.len(),
            boundaries = boundaries.len(),
            failed_samples = degradations.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Segmentation complete",
        );

        Ok(SegmentationOutcome {
            scenes,
            stats,
            duration,
            samples: samples.len(),
            boundaries,
            degradations,
        })
    }
}

/// Fetch one frame and build its signature. Errors are returned as text so
/// the caller can record them and carry on.
async fn sample_frame(
    source: &dyn FrameSource,
    detector: &dyn Detector,
    retry: RetryPolicy,
    index: u64,
) -> Result<Signature, String> {
    let frame = source.frame(index).await.map_err(|e| e.to_string())?;
    let detections = retry
        .run("detect", || detector.detect(&frame))
        .await
        .map_err(|e| e.to_string())?;
    tracing::debug!(frame = index, detections = detections.len(), "Sampled frame");
    Ok(extract(frame.dimensions, &detections))
}
