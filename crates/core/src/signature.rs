//! Object-signature extraction (per sampled frame).
//!
//! A [`Signature`] summarizes what a detector saw in one frame: which
//! categories are present, how many of each, and where their box centres fall
//! on a 3x3 grid. Detector confidence is deliberately absent so that
//! signature comparison does not depend on the detector's cut-off.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Cells per side of the spatial grid.
pub const GRID_SIZE: usize = 3;

/// Number of buckets in the spatial histogram (`GRID_SIZE * GRID_SIZE`).
pub const HISTOGRAM_BUCKETS: usize = GRID_SIZE * GRID_SIZE;

// ---------------------------------------------------------------------------
// Detector output
// ---------------------------------------------------------------------------

/// Axis-aligned box in the frame's pixel coordinate space, `(x1, y1)` top-left.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Centre point of the box.
    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// One labelled detection as returned by the detector capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Structured semantic summary of one frame's detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Distinct category labels present in the frame.
    pub classes: BTreeSet<String>,
    /// Detection count per category.
    pub class_counts: BTreeMap<String, u32>,
    /// Share of detections whose centre falls in each grid cell, row-major.
    pub spatial_histogram: [f64; HISTOGRAM_BUCKETS],
}

impl Signature {
    /// The signature of a frame with no detections.
    pub fn empty() -> Self {
        Self {
            classes: BTreeSet::new(),
            class_counts: BTreeMap::new(),
            spatial_histogram: [0.0; HISTOGRAM_BUCKETS],
        }
    }

    /// Total number of detections summarized by this signature.
    pub fn total_detections(&self) -> u32 {
        self.class_counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Map a coordinate to its grid cell along one axis.
///
/// Out-of-frame centres are clamped to the nearest edge cell; a degenerate
/// (zero) extent maps everything to the first cell.
fn grid_cell(coord: f64, extent: u32) -> usize {
    if extent == 0 || !coord.is_finite() {
        return 0;
    }
    let scaled = (coord / f64::from(extent) * GRID_SIZE as f64).floor();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as usize).min(GRID_SIZE - 1)
    }
}

/// Build the signature for one frame from its detections.
///
/// An empty detection list yields [`Signature::empty`]. The histogram sums to
/// 1.0 whenever at least one detection is present.
pub fn extract(frame: FrameDimensions, detections: &[Detection]) -> Signature {
    if detections.is_empty() {
        return Signature::empty();
    }

    let mut signature = Signature::empty();
    let mut cells = [0u32; HISTOGRAM_BUCKETS];

    for detection in detections {
        signature.classes.insert(detection.label.clone());
        *signature
            .class_counts
            .entry(detection.label.clone())
            .or_insert(0) += 1;

        let (cx, cy) = detection.bbox.center();
        let idx = grid_cell(cy, frame.height) * GRID_SIZE + grid_cell(cx, frame.width);
        cells[idx] += 1;
    }

    let total = detections.len() as f64;
    for (bucket, count) in signature.spatial_histogram.iter_mut().zip(cells) {
        *bucket = f64::from(count) / total;
    }

    signature
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
