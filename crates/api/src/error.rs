use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use takeone_core::error::CoreError;
use takeone_db::StoreError;
use takeone_pipeline::PipelineError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`PipelineError`] and [`CoreError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure reported by the scene search service.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A domain-level error from `takeone_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Pipeline(err) => classify_pipeline_error(err),
            AppError::Core(core) => classify_core_error(core),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InvalidRange { .. } => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
        }
        CoreError::Internal(msg) => internal(msg),
    }
}

/// Map a service failure to an HTTP status, error code, and message.
///
/// - Contract violations are 400s and lookups 404s.
/// - An unreachable vector store is 503; other store failures are 500.
/// - Embedding failures come from an upstream model service and map to 502.
fn classify_pipeline_error(err: &PipelineError) -> ErrorParts {
    match err {
        PipelineError::Core(core) => classify_core_error(core),
        PipelineError::Store(StoreError::Core(core)) => classify_core_error(core),
        PipelineError::Store(store) if store.is_unavailable() => {
            tracing::error!(error = %store, "Vector store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "The segment store is unavailable".to_string(),
            )
        }
        PipelineError::Store(store) => internal(&store.to_string()),
        PipelineError::Embedding(capability) => {
            tracing::error!(error = %capability, "Embedding failed");
            (
                StatusCode::BAD_GATEWAY,
                "CAPABILITY_ERROR",
                "The embedding service failed".to_string(),
            )
        }
        PipelineError::FrameSource(msg) => {
            (StatusCode::BAD_REQUEST, "FRAME_SOURCE_ERROR", msg.clone())
        }
        PipelineError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "CANCELLED",
            "The operation was cancelled".to_string(),
        ),
    }
}

fn internal(msg: &str) -> ErrorParts {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
