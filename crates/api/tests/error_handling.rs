//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use takeone_api::error::AppError;
use takeone_capabilities::CapabilityError;
use takeone_core::error::CoreError;
use takeone_db::StoreError;
use takeone_pipeline::PipelineError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::NotFound maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Segment",
        id: "reel_scene_0007".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Segment with id reel_scene_0007 not found");
}

// ---------------------------------------------------------------------------
// Test: validation failures inside the pipeline map to 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pipeline_validation_error_returns_400() {
    let err = AppError::Pipeline(PipelineError::Core(CoreError::Validation(
        "query must not be empty".into(),
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "query must not be empty");
}

#[tokio::test]
async fn invalid_range_returns_400() {
    let err = AppError::Core(CoreError::InvalidRange {
        start: 5.0,
        end: 2.0,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: an unreachable store maps to 503 without leaking details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unavailable_store_returns_503() {
    let err = AppError::Pipeline(PipelineError::Store(StoreError::Unavailable(
        "connection refused at 10.0.0.5:5432".into(),
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "STORE_UNAVAILABLE");
    assert!(!json["error"].as_str().unwrap().contains("10.0.0.5"));
}

#[tokio::test]
async fn other_store_errors_are_sanitized_500s() {
    let err = AppError::Pipeline(PipelineError::Store(StoreError::Database(
        sqlx::Error::RowNotFound,
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: embedding failures map to 502
// ---------------------------------------------------------------------------

#[tokio::test]
async fn embedding_failure_returns_502() {
    let err = AppError::Pipeline(PipelineError::Embedding(CapabilityError::Unavailable(
        "rate limited".into(),
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "CAPABILITY_ERROR");
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("provide exactly one of track or frames_dir".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "provide exactly one of track or frames_dir");
}

// ---------------------------------------------------------------------------
// Test: AppError::InternalError maps to 500 and sanitizes the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_is_sanitized() {
    let err = AppError::InternalError("secret stack trace".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn cancelled_returns_503() {
    let (status, json) = error_to_response(AppError::Pipeline(PipelineError::Cancelled)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "CANCELLED");
}
