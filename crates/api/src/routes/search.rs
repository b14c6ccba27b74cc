use axum::routing::post;
use axum::Router;

use crate::handlers::search;
use crate::state::AppState;

/// Query routes.
///
/// ```text
/// POST   /search                  -> search
/// POST   /script-search           -> script_search
/// POST   /script-search/export    -> export_script
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", post(search::search))
        .route("/script-search", post(search::script_search))
        .route("/script-search/export", post(search::export_script))
}
