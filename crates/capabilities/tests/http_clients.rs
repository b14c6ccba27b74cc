mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use takeone_capabilities::{
    CapabilityError, Detector, Embedder, Expander, Frame, HttpDetector, OpenAiChat, OpenAiConfig,
    OpenAiEmbedder, ScriptParser, Translator,
};
use takeone_core::signature::FrameDimensions;

fn config(base_url: &str) -> OpenAiConfig {
    OpenAiConfig::new("test-key").with_base_url(base_url)
}

fn chat_reply(content: &str) -> Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

async fn chat_server(content: &'static str) -> String {
    let app = Router::new().route(
        "/chat/completions",
        post(move || async move { Json(chat_reply(content)) }),
    );
    common::spawn_server(app).await
}

// -- embeddings --------------------------------------------------------------

#[tokio::test]
async fn embeddings_are_returned_in_input_order() {
    let app = Router::new().route(
        "/embeddings",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["dimensions"], 2);
            Json(json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            }))
        }),
    );
    let base = common::spawn_server(app).await;
    let embedder = OpenAiEmbedder::new(&config(&base), 2).unwrap();

    let vectors = embedder
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn wrong_width_is_a_dimension_mismatch() {
    let app = Router::new().route(
        "/embeddings",
        post(|| async { Json(json!({ "data": [{ "index": 0, "embedding": [1.0, 2.0, 3.0] }] })) }),
    );
    let base = common::spawn_server(app).await;
    let embedder = OpenAiEmbedder::new(&config(&base), 4).unwrap();

    assert_matches!(
        embedder.embed("hello").await,
        Err(CapabilityError::DimensionMismatch { expected: 4, actual: 3 })
    );
}

#[tokio::test]
async fn server_errors_are_transient_api_errors() {
    let app = Router::new().route(
        "/embeddings",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
    );
    let base = common::spawn_server(app).await;
    let embedder = OpenAiEmbedder::new(&config(&base), 4).unwrap();

    let err = embedder.embed("hello").await.unwrap_err();
    assert_matches!(err, CapabilityError::Api { status: 503, .. });
    assert!(err.is_transient());
}

#[test]
fn missing_api_key_is_unavailable() {
    let config = OpenAiConfig::new("  ");
    assert_matches!(
        OpenAiEmbedder::new(&config, 8),
        Err(CapabilityError::Unavailable(_))
    );
    assert_matches!(OpenAiChat::new(&config), Err(CapabilityError::Unavailable(_)));
}

// -- chat --------------------------------------------------------------------

#[tokio::test]
async fn translation_returns_trimmed_reply() {
    let base = chat_server("  A man walks into the kitchen.\n").await;
    let chat = OpenAiChat::new(&config(&base)).unwrap();

    let translated = chat.translate("Un hombre entra en la cocina.", "en").await.unwrap();
    assert_eq!(translated, "A man walks into the kitchen.");
}

#[tokio::test]
async fn expansion_reply_is_cleaned() {
    let base = chat_server("1. espresso shot\n2. hot drink\n3. ok\n- barista pouring coffee").await;
    let chat = OpenAiChat::new(&config(&base)).unwrap();

    let alternatives = chat.expand("coffee", 4).await.unwrap();
    assert_eq!(alternatives, vec!["espresso shot", "hot drink", "barista pouring coffee"]);
}

#[tokio::test]
async fn script_reply_in_code_fence_is_parsed() {
    let base = chat_server(
        "```json\n[{\"sequence\": 1, \"action\": \"man opens door\"}, {\"sequence\": 2, \"action\": \"man sits at table\"}]\n```",
    )
    .await;
    let chat = OpenAiChat::new(&config(&base)).unwrap();

    let actions = chat.parse("He opens the door. He sits.").await.unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[1].action_text, "man sits at table");
}

#[tokio::test]
async fn unparseable_script_reply_is_malformed() {
    let base = chat_server("Sure! Here are the actions you asked for.").await;
    let chat = OpenAiChat::new(&config(&base)).unwrap();

    let err = chat.parse("He opens the door.").await.unwrap_err();
    assert_matches!(err, CapabilityError::Malformed(_));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn empty_choices_are_malformed() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({ "choices": [] })) }),
    );
    let base = common::spawn_server(app).await;
    let chat = OpenAiChat::new(&config(&base)).unwrap();

    assert_matches!(chat.translate("hola", "en").await, Err(CapabilityError::Malformed(_)));
}

// -- detector ----------------------------------------------------------------

fn frame(encoded: Vec<u8>) -> Frame {
    Frame {
        index: 10,
        timestamp: 0.4,
        dimensions: FrameDimensions::new(640, 360),
        encoded,
    }
}

#[tokio::test]
async fn detector_drops_low_confidence_boxes() {
    let app = Router::new().route(
        "/detect",
        post(|body: Bytes| async move {
            assert_eq!(&body[..], b"png-bytes");
            Json(json!({
                "detections": [
                    { "label": "person", "confidence": 0.91, "bbox": { "x1": 10.0, "y1": 20.0, "x2": 110.0, "y2": 300.0 } },
                    { "label": "cup", "confidence": 0.05, "bbox": { "x1": 0.0, "y1": 0.0, "x2": 5.0, "y2": 5.0 } }
                ]
            }))
        }),
    );
    let base = common::spawn_server(app).await;
    let detector = HttpDetector::new(format!("{base}/detect")).unwrap();

    let detections = detector.detect(&frame(b"png-bytes".to_vec())).await.unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "person");
}

#[tokio::test]
async fn hung_detector_times_out() {
    let app = Router::new().route(
        "/detect",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "detections": [] }))
        }),
    );
    let base = common::spawn_server(app).await;
    let detector =
        HttpDetector::with_timeout(format!("{base}/detect"), Duration::from_millis(100)).unwrap();

    let err = detector.detect(&frame(b"png-bytes".to_vec())).await.unwrap_err();
    assert_matches!(&err, CapabilityError::Request(e) if e.is_timeout());
    assert!(err.is_transient());
}

#[tokio::test]
async fn detector_rejects_frames_without_pixels() {
    let detector = HttpDetector::new("http://127.0.0.1:9/detect".to_string()).unwrap();
    assert_matches!(
        detector.detect(&frame(Vec::new())).await,
        Err(CapabilityError::Unavailable(_))
    );
}
