pub mod health;
pub mod search;
pub mod segments;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes.
///
/// ```text
/// /segment                      segment a video into scene candidates (POST)
///
/// /segments                     index one scene (POST)
/// /segments/batch               index many scenes (POST)
/// /segments/{id}                get (GET)
/// /sources/{source_id}          delete every segment of a source (DELETE)
/// /stats                        corpus counts (GET)
///
/// /search                       multilingual semantic search (POST)
/// /script-search                search per script action (POST)
/// /script-search/export         edit list export (POST, ?format=text|csv|json)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(segments::router())
        .merge(search::router())
}
