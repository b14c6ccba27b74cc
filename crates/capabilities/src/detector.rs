//! Object detector capability and its HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use takeone_core::signature::{Detection, FrameDimensions};

use crate::error::CapabilityError;
use crate::http::parse_response;

/// Default minimum confidence for detections kept from the HTTP detector.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.25;

/// Default per-request timeout for the HTTP detector.
pub const DEFAULT_DETECTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// One decoded (or pre-analysed) video frame handed to a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero-based frame number in the source video.
    pub index: u64,
    /// Position on the timeline, in seconds.
    pub timestamp: f64,
    pub dimensions: FrameDimensions,
    /// PNG-encoded pixels. Empty for sources whose detections are known
    /// up front.
    pub encoded: Vec<u8>,
}

/// Given a frame, return labelled bounding boxes with confidence.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, CapabilityError>;
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
}

/// Client for an object-detection service that accepts a PNG body and
/// answers `{"detections": [{"label", "confidence", "bbox": {x1,y1,x2,y2}}]}`.
#[derive(Debug)]
pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
    min_confidence: f64,
}

impl HttpDetector {
    pub fn new(url: String) -> Result<Self, CapabilityError> {
        Self::with_timeout(url, DEFAULT_DETECTOR_TIMEOUT)
    }

    /// Create a detector whose requests give up after `timeout`.
    pub fn with_timeout(url: String, timeout: Duration) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url))
    }

    /// Create a detector reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, url: String) -> Self {
        Self {
            client,
            url,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, CapabilityError> {
        if frame.encoded.is_empty() {
            return Err(CapabilityError::Unavailable(format!(
                "frame {} carries no image data",
                frame.index
            )));
        }

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(frame.encoded.clone())
            .send()
            .await?;

        let parsed: DetectResponse = parse_response(response).await?;
        Ok(parsed
            .detections
            .into_iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .collect())
    }
}
