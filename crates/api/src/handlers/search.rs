//! Handlers for semantic search and script search.

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use takeone_core::error::CoreError;
use takeone_core::metadata::SearchFilters;
use takeone_core::script::{export_edit_sequence, ExportFormat};
use takeone_core::search::{clamp_limit, DEFAULT_RESULTS_PER_ACTION, DEFAULT_TOP_K, MAX_TOP_K};
use takeone_pipeline::SearchOptions;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

fn default_true() -> bool {
    true
}

/// Body of `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Clamped to `[1, 100]`; defaults to 10.
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default = "default_true")]
    pub translate: bool,
    #[serde(default = "default_true")]
    pub expand: bool,
}

/// Body of `POST /script-search` and `POST /script-search/export`.
#[derive(Debug, Deserialize)]
pub struct ScriptSearchRequest {
    pub script: String,
    /// Clamped to `[1, 100]`; defaults to 3.
    #[serde(default)]
    pub results_per_action: Option<usize>,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default = "default_true")]
    pub translate: bool,
    #[serde(default = "default_true")]
    pub expand: bool,
}

impl ScriptSearchRequest {
    fn options(&self) -> SearchOptions {
        SearchOptions {
            translate: self.translate,
            expand: self.expand,
        }
    }

    fn results_per_action(&self) -> usize {
        clamp_limit(self.results_per_action, DEFAULT_RESULTS_PER_ACTION, MAX_TOP_K)
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    /// `text` (default), `csv` or `json`.
    pub format: Option<String>,
}

impl ExportParams {
    fn format(&self) -> Result<ExportFormat, CoreError> {
        self.format
            .as_deref()
            .map_or(Ok(ExportFormat::default()), str::parse)
    }
}

/// POST /api/v1/search
///
/// Translate, expand and fan out the query; returns merged hits plus the
/// translation, the expansion set and any degradations.
pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> AppResult<impl IntoResponse> {
    let top_k = clamp_limit(body.top_k, DEFAULT_TOP_K, MAX_TOP_K);
    let options = SearchOptions {
        translate: body.translate,
        expand: body.expand,
    };

    let response = state
        .service
        .search(&body.query, top_k, &body.filters, options)
        .await?;

    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/script-search
pub async fn script_search(
    State(state): State<AppState>,
    Json(body): Json<ScriptSearchRequest>,
) -> AppResult<impl IntoResponse> {
    let result = state
        .service
        .search_script(
            &body.script,
            body.results_per_action(),
            &body.filters,
            body.options(),
        )
        .await?;

    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/script-search/export?format=text|csv|json
///
/// Same search as `/script-search`, rendered as an edit list. The body is
/// the raw document, not the `data` envelope.
pub async fn export_script(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
    Json(body): Json<ScriptSearchRequest>,
) -> AppResult<impl IntoResponse> {
    let format = params.format()?;
    let result = state
        .service
        .search_script(
            &body.script,
            body.results_per_action(),
            &body.filters,
            body.options(),
        )
        .await?;
    let document = export_edit_sequence(&result, format)?;

    Ok(([(CONTENT_TYPE, format.content_type())], document))
}
