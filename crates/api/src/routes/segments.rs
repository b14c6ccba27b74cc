use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::segments;
use crate::state::AppState;

/// Segmentation and index routes.
///
/// ```text
/// POST   /segment               -> segment_video
/// POST   /segments              -> index_segment
/// POST   /segments/batch        -> index_batch
/// GET    /segments/{id}         -> get_segment
/// DELETE /sources/{source_id}   -> delete_source
/// GET    /stats                 -> index_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/segment", post(segments::segment_video))
        .route("/segments", post(segments::index_segment))
        .route("/segments/batch", post(segments::index_batch))
        .route("/segments/{id}", get(segments::get_segment))
        .route("/sources/{source_id}", delete(segments::delete_source))
        .route("/stats", get(segments::index_stats))
}
