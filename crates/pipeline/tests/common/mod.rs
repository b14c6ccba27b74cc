#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use takeone_capabilities::{CapabilityError, Embedder, Expander, ScriptParser, Translator};
use takeone_core::metadata::{SceneDescription, SearchFilters, SegmentMetadata};
use takeone_core::script::ScriptAction;
use takeone_core::search::SearchHit;
use takeone_db::{IndexStats, MemoryVectorStore, SegmentRecord, StoreError, VectorStore};
use takeone_pipeline::{Capabilities, SceneSearchService, ServiceSettings};

/// Words the bag-of-words embedder knows; each gets its own dimension.
pub const VOCABULARY: &[&str] = &[
    "coffee", "espresso", "pouring", "tea", "ceremony", "hot", "drink", "street", "night",
    "rain", "window", "dog", "running", "park", "person", "walking", "car", "chase", "door",
    "opens", "milk", "kitchen",
];

/// Deterministic embedder: one dimension per vocabulary word, value 1.0
/// when the word occurs. Texts containing `fail_on` are rejected.
pub struct BagOfWordsEmbedder {
    fail_on: Option<String>,
}

impl BagOfWordsEmbedder {
    pub fn new() -> Self {
        Self { fail_on: None }
    }

    pub fn failing_on(word: &str) -> Self {
        Self {
            fail_on: Some(word.to_string()),
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        VOCABULARY
            .iter()
            .map(|word| if tokens.contains(word) { 1.0 } else { 0.0 })
            .collect()
    }
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        if let Some(word) = &self.fail_on {
            if text.contains(word.as_str()) {
                return Err(CapabilityError::Malformed(format!("cannot embed '{text}'")));
            }
        }
        Ok(Self::vector(text))
    }
}

/// Translator answering from a fixed table; unknown text passes through.
/// Counts calls.
#[derive(Default)]
pub struct ScriptedTranslator {
    table: HashMap<String, String>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl ScriptedTranslator {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            table: pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CapabilityError::Unavailable("translator offline".to_string()));
        }
        Ok(self.table.get(text).cloned().unwrap_or_else(|| text.to_string()))
    }
}

/// Expander answering from a fixed table keyed by query; unknown queries
/// get no alternatives.
#[derive(Default)]
pub struct ScriptedExpander {
    table: HashMap<String, Vec<String>>,
    fail: bool,
}

impl ScriptedExpander {
    pub fn with(query: &str, alternatives: &[&str]) -> Self {
        Self::default().and(query, alternatives)
    }

    pub fn and(mut self, query: &str, alternatives: &[&str]) -> Self {
        self.table.insert(
            query.to_string(),
            alternatives.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Expander for ScriptedExpander {
    async fn expand(
        &self,
        query: &str,
        _max_alternatives: usize,
    ) -> Result<Vec<String>, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Api {
                status: 400,
                body: "bad request".to_string(),
            });
        }
        Ok(self.table.get(query).cloned().unwrap_or_default())
    }
}

/// Script parser returning a fixed reply.
pub struct ScriptedParser {
    reply: Result<Vec<ScriptAction>, String>,
}

impl ScriptedParser {
    pub fn returning(actions: &[(u32, &str)]) -> Self {
        Self {
            reply: Ok(actions
                .iter()
                .map(|(sequence_index, text)| ScriptAction {
                    sequence_index: *sequence_index,
                    action_text: text.to_string(),
                    description: None,
                })
                .collect()),
        }
    }

    pub fn malformed() -> Self {
        Self {
            reply: Err("not a JSON array".to_string()),
        }
    }
}

#[async_trait]
impl ScriptParser for ScriptedParser {
    async fn parse(&self, _script: &str) -> Result<Vec<ScriptAction>, CapabilityError> {
        self.reply.clone().map_err(CapabilityError::Malformed)
    }
}

/// Store whose every operation reports the backend as unreachable.
pub struct UnavailableStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl VectorStore for UnavailableStore {
    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    async fn upsert(&self, _record: SegmentRecord) -> Result<(), StoreError> {
        Err(down())
    }

    async fn query(
        &self,
        _embedding: &[f32],
        _top_k: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, StoreError> {
        Err(down())
    }

    async fn get(&self, _id: &str) -> Result<Option<SegmentRecord>, StoreError> {
        Err(down())
    }

    async fn delete(&self, _id: &str) -> Result<bool, StoreError> {
        Err(down())
    }

    async fn delete_by_source(&self, _source_id: &str) -> Result<u64, StoreError> {
        Err(down())
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        Err(down())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(down())
    }
}

pub fn memory_store() -> Arc<MemoryVectorStore> {
    Arc::new(MemoryVectorStore::new(VOCABULARY.len()))
}

pub fn metadata(source: &str, clip: u32) -> SegmentMetadata {
    SegmentMetadata {
        source_id: source.to_string(),
        clip_index: clip,
        start_time: f64::from(clip) * 5.0,
        end_time: f64::from(clip) * 5.0 + 5.0,
        scene_type: None,
        mood: None,
        tags: Vec::new(),
        clip_path: Some(format!("clips/{source}_{clip}.mp4")),
        thumbnail_path: None,
        description: String::new(),
    }
}

pub fn scene(description: &str) -> SceneDescription {
    SceneDescription {
        description: description.to_string(),
        ..Default::default()
    }
}

/// Settings with retries disabled so failing fakes fail fast.
pub fn settings() -> ServiceSettings {
    let mut settings = ServiceSettings::default();
    settings.retry.max_attempts = 1;
    settings
}

/// A service over `capabilities`, with the given scenes indexed under
/// source `film`, clip indices in order.
pub async fn service_with(capabilities: Capabilities, scenes: &[&str]) -> SceneSearchService {
    let service = SceneSearchService::new(capabilities, settings()).unwrap();
    for (clip, description) in scenes.iter().enumerate() {
        service
            .index(metadata("film", clip as u32), &scene(description))
            .await
            .unwrap();
    }
    service
}

pub fn capabilities(store: Arc<dyn VectorStore>) -> Capabilities {
    Capabilities::new(Arc::new(BagOfWordsEmbedder::new()), store)
}
