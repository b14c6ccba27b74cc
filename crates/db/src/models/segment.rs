//! Indexed segment records and the row shape of the `segments` table.
//!
//! The `embedding` column is pgvector `vector` in the database. Because we
//! use runtime queries, vectors are passed as text literals
//! (`'[0.1,0.2,...]'::vector`) and read back with `embedding::text`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use takeone_core::error::CoreError;
use takeone_core::metadata::SegmentMetadata;

/// One indexed segment: id, embedding, metadata and the embedded text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: SegmentMetadata,
    /// The text the embedding was generated from.
    pub search_text: String,
}

/// Corpus-level counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_segments: u64,
    pub unique_sources: u64,
}

/// Columns shared by every `segments` select (the vector is selected
/// separately, as text, where needed).
pub const SEGMENT_COLUMNS: &str = "id, source_id, clip_index, start_time, end_time, \
     scene_type, mood, tags, clip_path, thumbnail_path, description, search_text";

/// A row from the `segments` table, without the vector.
#[derive(Debug, Clone, FromRow)]
pub struct SegmentRow {
    pub id: String,
    pub source_id: String,
    pub clip_index: i32,
    pub start_time: f64,
    pub end_time: f64,
    pub scene_type: Option<String>,
    pub mood: Option<String>,
    pub tags: Vec<String>,
    pub clip_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub description: String,
    pub search_text: String,
}

impl SegmentRow {
    pub fn into_metadata(self) -> Result<(String, SegmentMetadata, String), CoreError> {
        let clip_index = u32::try_from(self.clip_index).map_err(|_| {
            CoreError::Internal(format!(
                "segment {} has negative clip_index {}",
                self.id, self.clip_index
            ))
        })?;
        let metadata = SegmentMetadata {
            source_id: self.source_id,
            clip_index,
            start_time: self.start_time,
            end_time: self.end_time,
            scene_type: self.scene_type,
            mood: self.mood,
            tags: self.tags,
            clip_path: self.clip_path,
            thumbnail_path: self.thumbnail_path,
            description: self.description,
        };
        Ok((self.id, metadata, self.search_text))
    }
}

/// Render a vector as a pgvector text literal, e.g. `[0.1,0.2]`.
pub fn to_vector_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Parse a pgvector text literal back into components.
pub fn parse_vector_literal(literal: &str) -> Result<Vec<f32>, CoreError> {
    let inner = literal
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| CoreError::Internal(format!("not a vector literal: {literal}")))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| CoreError::Internal(format!("bad vector component '{part}': {e}")))
        })
        .collect()
}
