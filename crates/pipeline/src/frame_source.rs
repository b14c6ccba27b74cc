//! Where segmentation gets its frames from.
//!
//! Two sources ship with the crate:
//!
//! * [`DetectionTrack`]: detections already known per frame (replayed from a
//!   previous analysis, or hand-written in tests). It is its own
//!   [`Detector`].
//! * [`ImageSequenceSource`]: a directory of extracted frame images played
//!   back at a fixed frame rate, decoded with the `image` crate.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use takeone_capabilities::{CapabilityError, Detector, Frame};
use takeone_core::signature::{Detection, FrameDimensions};
use takeone_core::threshold_validation::validate_positive;

use crate::error::PipelineError;

/// File extensions accepted as frames, compared case-insensitively.
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// A decodable video: frame rate, length, and random access to frames.
#[async_trait]
pub trait FrameSource: Send + Sync {
    fn fps(&self) -> f64;

    fn frame_count(&self) -> u64;

    fn dimensions(&self) -> FrameDimensions;

    /// Length of the video in seconds.
    fn duration(&self) -> f64 {
        let fps = self.fps();
        if fps > 0.0 {
            self.frame_count() as f64 / fps
        } else {
            0.0
        }
    }

    /// Timeline position of a frame, in seconds.
    fn timestamp(&self, index: u64) -> f64 {
        index as f64 / self.fps()
    }

    async fn frame(&self, index: u64) -> Result<Frame, PipelineError>;
}

// ---------------------------------------------------------------------------
// DetectionTrack
// ---------------------------------------------------------------------------

/// Per-frame detections for a whole video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionTrack {
    pub fps: f64,
    pub dimensions: FrameDimensions,
    /// Entry `i` holds the detections of frame `i`.
    pub frames: Vec<Vec<Detection>>,
}

impl DetectionTrack {
    pub fn new(fps: f64, dimensions: FrameDimensions, frames: Vec<Vec<Detection>>) -> Self {
        Self {
            fps,
            dimensions,
            frames,
        }
    }

    /// `frame_count` frames that all show the same detections.
    pub fn constant(
        fps: f64,
        dimensions: FrameDimensions,
        frame_count: usize,
        detections: Vec<Detection>,
    ) -> Self {
        Self::new(fps, dimensions, vec![detections; frame_count])
    }

    /// Append `frame_count` frames showing `detections`.
    pub fn extend_with(mut self, frame_count: usize, detections: Vec<Detection>) -> Self {
        self.frames
            .extend(std::iter::repeat(detections).take(frame_count));
        self
    }
}

#[async_trait]
impl FrameSource for DetectionTrack {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    async fn frame(&self, index: u64) -> Result<Frame, PipelineError> {
        if index >= self.frame_count() {
            return Err(PipelineError::FrameSource(format!(
                "frame {index} is past the end of a {}-frame track",
                self.frames.len()
            )));
        }
        Ok(Frame {
            index,
            timestamp: self.timestamp(index),
            dimensions: self.dimensions,
            encoded: Vec::new(),
        })
    }
}

#[async_trait]
impl Detector for DetectionTrack {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, CapabilityError> {
        usize::try_from(frame.index)
            .ok()
            .and_then(|i| self.frames.get(i))
            .cloned()
            .ok_or_else(|| {
                CapabilityError::Unavailable(format!("no detections recorded for frame {}", frame.index))
            })
    }
}

// ---------------------------------------------------------------------------
// ImageSequenceSource
// ---------------------------------------------------------------------------

/// A directory of frame images, ordered by file name, played at `fps`.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    fps: f64,
    dimensions: FrameDimensions,
}

impl ImageSequenceSource {
    /// Scan `dir` for frame images. The first frame's size is taken as the
    /// size of the whole sequence.
    pub async fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self, PipelineError> {
        validate_positive(fps, "fps")?;
        let dir = dir.as_ref().to_path_buf();

        let paths = tokio::task::spawn_blocking(move || list_frames(&dir))
            .await
            .map_err(|e| PipelineError::FrameSource(format!("frame scan failed: {e}")))??;

        let first = paths
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::FrameSource("directory contains no frame images".to_string()))?;
        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(&first))
            .await
            .map_err(|e| PipelineError::FrameSource(format!("frame probe failed: {e}")))?
            .map_err(|e| PipelineError::FrameSource(format!("unreadable first frame: {e}")))?;

        tracing::debug!(frames = paths.len(), fps, width, height, "Opened image sequence");
        Ok(Self {
            paths,
            fps,
            dimensions: FrameDimensions::new(width, height),
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        PipelineError::FrameSource(format!("cannot read {}: {e}", dir.display()))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_frame_file(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.iter().any(|f| ext.eq_ignore_ascii_case(f)))
        .unwrap_or(false)
}

/// Decode one image and re-encode it as PNG for the detector.
fn load_png(path: &Path) -> Result<(Vec<u8>, FrameDimensions), PipelineError> {
    let decoded = image::open(path)
        .map_err(|e| PipelineError::FrameSource(format!("cannot decode {}: {e}", path.display())))?;

    let mut buffer = Cursor::new(Vec::new());
    decoded
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| PipelineError::FrameSource(format!("cannot encode {}: {e}", path.display())))?;

    Ok((
        buffer.into_inner(),
        FrameDimensions::new(decoded.width(), decoded.height()),
    ))
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> u64 {
        self.paths.len() as u64
    }

    fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    async fn frame(&self, index: u64) -> Result<Frame, PipelineError> {
        let path = usize::try_from(index)
            .ok()
            .and_then(|i| self.paths.get(i))
            .cloned()
            .ok_or_else(|| {
                PipelineError::FrameSource(format!(
                    "frame {index} is past the end of a {}-frame sequence",
                    self.paths.len()
                ))
            })?;

        let (encoded, dimensions) = tokio::task::spawn_blocking(move || load_png(&path))
            .await
            .map_err(|e| PipelineError::FrameSource(format!("frame decode failed: {e}")))??;

        Ok(Frame {
            index,
            timestamp: self.timestamp(index),
            dimensions,
            encoded,
        })
    }
}
