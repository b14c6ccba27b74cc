//! Handlers for segmentation and the segment index.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use takeone_core::error::CoreError;
use takeone_core::metadata::SegmentMetadata;
use takeone_core::segmentation::SegmentationConfig;
use takeone_core::similarity::SimilarityWeights;
use takeone_db::SegmentRecord;
use takeone_pipeline::{DetectionTrack, ImageSequenceSource, IndexRequest};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Per-request overrides of the service's default segmentation settings.
#[derive(Debug, Default, Deserialize)]
pub struct SegmentationOverrides {
    pub sample_stride: Option<usize>,
    pub threshold: Option<f64>,
    pub min_len: Option<f64>,
    pub max_len: Option<f64>,
    pub weights: Option<SimilarityWeights>,
}

impl SegmentationOverrides {
    pub fn apply(self, base: SegmentationConfig) -> SegmentationConfig {
        SegmentationConfig {
            sample_stride: self.sample_stride.unwrap_or(base.sample_stride),
            threshold: self.threshold.unwrap_or(base.threshold),
            min_len: self.min_len.unwrap_or(base.min_len),
            max_len: self.max_len.unwrap_or(base.max_len),
            weights: self.weights.unwrap_or(base.weights),
        }
    }
}

/// Body of `POST /segment`: exactly one of `track` (pre-computed
/// detections) or `frames_dir` + `fps` (decoded frames for the configured
/// detector).
#[derive(Debug, Deserialize)]
pub struct SegmentRequest {
    #[serde(default)]
    pub track: Option<DetectionTrack>,
    #[serde(default)]
    pub frames_dir: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub config: Option<SegmentationOverrides>,
}

#[derive(Debug, Serialize)]
pub struct IndexedSegment {
    pub segment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchIndexBody {
    pub scenes: Vec<IndexRequest>,
}

/// A stored segment without its embedding.
#[derive(Debug, Serialize)]
pub struct SegmentView {
    pub id: String,
    pub metadata: SegmentMetadata,
    pub search_text: String,
    pub dimension: usize,
}

impl From<SegmentRecord> for SegmentView {
    fn from(record: SegmentRecord) -> Self {
        Self {
            dimension: record.embedding.len(),
            id: record.id,
            metadata: record.metadata,
            search_text: record.search_text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedSource {
    pub source_id: String,
    pub deleted: u64,
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// POST /api/v1/segment
///
/// Split a video into scene candidates. The run is cancelled when the
/// server shuts down.
pub async fn segment_video(
    State(state): State<AppState>,
    Json(body): Json<SegmentRequest>,
) -> AppResult<impl IntoResponse> {
    let config = body
        .config
        .map(|overrides| overrides.apply(state.service.settings().segmentation));
    let cancel = state.shutdown.child_token();

    let outcome = match (body.track, body.frames_dir) {
        (Some(track), None) => {
            state
                .service
                .segment_track(track, config, &cancel)
                .await?
        }
        (None, Some(dir)) => {
            let root = state.config.frames_root.as_deref().ok_or_else(|| {
                AppError::BadRequest(
                    "frames_dir is disabled on this server; send a detection track instead"
                        .to_string(),
                )
            })?;
            let dir = resolve_frames_dir(root, &dir).await?;
            if !state.service.has_detector() {
                return Err(CoreError::Validation(
                    "no object detector is configured; send a detection track instead".to_string(),
                )
                .into());
            }
            let fps = body.fps.ok_or_else(|| {
                AppError::BadRequest("fps is required together with frames_dir".to_string())
            })?;
            let source = ImageSequenceSource::open(&dir, fps).await?;
            state
                .service
                .segment(Arc::new(source), config, &cancel)
                .await?
        }
        _ => {
            return Err(AppError::BadRequest(
                "provide exactly one of track or frames_dir".to_string(),
            ))
        }
    };

    tracing::info!(
        scenes = outcome.scenes.len(),
        duration = outcome.duration,
        degradations = outcome.degradations.len(),
        "Video segmented",
    );

    Ok(Json(DataResponse { data: outcome }))
}

/// Resolve `requested` against the frames root, rejecting anything that
/// lands outside it once symlinks and `..` are resolved.
async fn resolve_frames_dir(root: &FsPath, requested: &str) -> AppResult<PathBuf> {
    let root = tokio::fs::canonicalize(root).await.map_err(|e| {
        AppError::InternalError(format!("frames root {} is unusable: {e}", root.display()))
    })?;
    let resolved = tokio::fs::canonicalize(root.join(requested))
        .await
        .map_err(|_| AppError::BadRequest(format!("frames_dir {requested:?} does not exist")))?;

    if !resolved.starts_with(&root) {
        tracing::warn!(requested, "Rejected frames_dir outside the frames root");
        return Err(AppError::BadRequest(
            "frames_dir must be inside the frames root".to_string(),
        ));
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// POST /api/v1/segments
///
/// Embed and store one described scene. Re-indexing the same source and
/// clip replaces the earlier entry.
pub async fn index_segment(
    State(state): State<AppState>,
    Json(body): Json<IndexRequest>,
) -> AppResult<impl IntoResponse> {
    let segment_id = state.service.index(body.metadata, &body.scene).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: IndexedSegment { segment_id },
        }),
    ))
}

/// POST /api/v1/segments/batch
pub async fn index_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchIndexBody>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.service.index_batch(body.scenes).await?;

    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/v1/segments/{id}
pub async fn get_segment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state.service.get_segment(&id).await?;

    Ok(Json(DataResponse {
        data: SegmentView::from(record),
    }))
}

/// DELETE /api/v1/sources/{source_id}
pub async fn delete_source(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.service.delete_source(&source_id).await?;

    Ok(Json(DataResponse {
        data: DeletedSource { source_id, deleted },
    }))
}

/// GET /api/v1/stats
pub async fn index_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = state.service.stats().await?;

    Ok(Json(DataResponse { data: stats }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_fields() {
        let overrides = SegmentationOverrides {
            max_len: Some(12.0),
            ..Default::default()
        };
        let config = overrides.apply(SegmentationConfig::default());

        assert_eq!(config.max_len, 12.0);
        assert_eq!(config.min_len, SegmentationConfig::default().min_len);
        assert_eq!(config.threshold, SegmentationConfig::default().threshold);
    }
}
