//! Typed metadata carried alongside every indexed segment, the filters that
//! select on it, and the structured scene description whose text is embedded.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Longest description (in characters) stored in segment metadata.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Separator between the parts of a scene's search text.
pub const SEARCH_TEXT_SEPARATOR: &str = " | ";

/// Build the corpus-unique id of a segment: `{source_id}_scene_{clip_index:04}`.
pub fn segment_id(source_id: &str, clip_index: u32) -> String {
    format!("{source_id}_scene_{clip_index:04}")
}

// ---------------------------------------------------------------------------
// SegmentMetadata
// ---------------------------------------------------------------------------

/// Metadata stored with each segment's embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub source_id: String,
    pub clip_index: u32,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub scene_type: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub clip_path: Option<String>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    /// Free-form description, truncated to [`DESCRIPTION_MAX_CHARS`].
    #[serde(default)]
    pub description: String,
}

impl SegmentMetadata {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Reject records that could not have come from segmentation.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.source_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "source_id must not be empty".to_string(),
            ));
        }
        if !self.start_time.is_finite()
            || !self.end_time.is_finite()
            || self.start_time < 0.0
            || self.start_time >= self.end_time
        {
            return Err(CoreError::InvalidRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }

    /// The id this record is indexed under.
    pub fn segment_id(&self) -> String {
        segment_id(&self.source_id, self.clip_index)
    }

    /// Copy scene type, mood, tags and the (truncated) description from an
    /// analysed scene into this record.
    pub fn with_description(mut self, scene: &SceneDescription) -> Self {
        self.scene_type = non_empty(&scene.scene_type);
        self.mood = non_empty(&scene.mood);
        self.tags = scene.tags.clone();
        self.description = truncate_chars(&scene.description, DESCRIPTION_MAX_CHARS);
        self
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// SearchFilters
// ---------------------------------------------------------------------------

/// Exact-match filters over segment metadata. Set fields are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub scene_type: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    /// Matches when the segment's tag list contains this tag.
    #[serde(default)]
    pub tag: Option<String>,
}

impl SearchFilters {
    pub fn by_source(source_id: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_id.is_none()
            && self.scene_type.is_none()
            && self.mood.is_none()
            && self.tag.is_none()
    }

    pub fn matches(&self, metadata: &SegmentMetadata) -> bool {
        fn field_matches(filter: &Option<String>, value: Option<&str>) -> bool {
            match filter {
                Some(expected) => value == Some(expected.as_str()),
                None => true,
            }
        }

        field_matches(&self.source_id, Some(&metadata.source_id))
            && field_matches(&self.scene_type, metadata.scene_type.as_deref())
            && field_matches(&self.mood, metadata.mood.as_deref())
            && self
                .tag
                .as_ref()
                .map_or(true, |tag| metadata.tags.iter().any(|t| t == tag))
    }
}

// ---------------------------------------------------------------------------
// SceneDescription
// ---------------------------------------------------------------------------

/// Structured attributes produced by the external analysis step for one scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub description: String,
    pub detailed_description: Option<String>,
    pub scene_type: Option<String>,
    pub mood: Option<String>,
    pub secondary_moods: Vec<String>,
    pub people: Vec<String>,
    pub locations: Vec<String>,
    pub objects: Vec<String>,
    pub actions: Vec<String>,
    pub colors: Vec<String>,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
}

impl SceneDescription {
    /// The text that gets embedded for this scene.
    ///
    /// Deterministic: the same description always yields the same string, so
    /// re-indexing reproduces the same vector. Empty fields are skipped.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        push_text(&mut parts, None, Some(&self.description));
        push_text(&mut parts, None, self.detailed_description.as_ref());
        push_text(&mut parts, Some("Scene type"), self.scene_type.as_ref());
        push_text(&mut parts, Some("Mood"), self.mood.as_ref());
        push_list(&mut parts, "Secondary moods", &self.secondary_moods);
        push_list(&mut parts, "People", &self.people);
        push_list(&mut parts, "Locations", &self.locations);
        push_list(&mut parts, "Objects", &self.objects);
        push_list(&mut parts, "Actions", &self.actions);
        push_list(&mut parts, "Colors", &self.colors);
        push_list(&mut parts, "Keywords", &self.keywords);
        push_list(&mut parts, "Tags", &self.tags);

        parts.join(SEARCH_TEXT_SEPARATOR)
    }
}

fn push_text(parts: &mut Vec<String>, label: Option<&str>, value: Option<&String>) {
    let Some(value) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return;
    };
    match label {
        Some(label) => parts.push(format!("{label}: {value}")),
        None => parts.push(value.to_string()),
    }
}

fn push_list(parts: &mut Vec<String>, label: &str, values: &[String]) {
    let values: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if !values.is_empty() {
        parts.push(format!("{label}: {}", values.join(", ")));
    }
}
