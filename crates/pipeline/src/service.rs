//! The scene search service: one explicitly constructed value owning every
//! capability, exposing segmentation, indexing, search, script search and
//! source deletion.

use std::sync::Arc;

use takeone_capabilities::{Detector, Embedder, Expander, ScriptParser, Translator};
use takeone_core::error::CoreError;
use takeone_core::metadata::{SceneDescription, SearchFilters, SegmentMetadata};
use takeone_core::script::{export_edit_sequence, ExportFormat, ScriptSearchResult};
use takeone_core::segmentation::SegmentationConfig;
use takeone_db::{IndexStats, SegmentRecord, VectorStore};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::frame_source::{DetectionTrack, FrameSource};
use crate::index::{BatchIndexOutcome, EmbeddingIndex, IndexRequest};
use crate::query::{QueryPipeline, SearchOptions, SearchResponse};
use crate::script::ScriptSequencer;
use crate::segmenter::{SegmentationEngine, SegmentationOutcome};
use crate::settings::ServiceSettings;

/// External capabilities injected into the service.
///
/// The embedder and store are required. Without a translator or expander
/// the corresponding query step is skipped; without a script parser
/// scripts are split by line; without a detector only detection tracks can
/// be segmented.
#[derive(Clone)]
pub struct Capabilities {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub detector: Option<Arc<dyn Detector>>,
    pub translator: Option<Arc<dyn Translator>>,
    pub expander: Option<Arc<dyn Expander>>,
    pub script_parser: Option<Arc<dyn ScriptParser>>,
}

impl Capabilities {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            detector: None,
            translator: None,
            expander: None,
            script_parser: None,
        }
    }
}

pub struct SceneSearchService {
    settings: ServiceSettings,
    detector: Option<Arc<dyn Detector>>,
    store: Arc<dyn VectorStore>,
    index: EmbeddingIndex,
    query: Arc<QueryPipeline>,
    sequencer: ScriptSequencer,
}

impl std::fmt::Debug for SceneSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneSearchService").finish_non_exhaustive()
    }
}

impl SceneSearchService {
    pub fn new(capabilities: Capabilities, settings: ServiceSettings) -> Result<Self, PipelineError> {
        settings.validate()?;

        let index = EmbeddingIndex::new(
            Arc::clone(&capabilities.embedder),
            Arc::clone(&capabilities.store),
            settings.retry,
        )?;

        let mut query = QueryPipeline::new(
            Arc::clone(&capabilities.embedder),
            Arc::clone(&capabilities.store),
            settings.query.clone(),
        )?
        .with_retry(settings.retry);
        if let Some(translator) = capabilities.translator {
            query = query.with_translator(translator);
        }
        if let Some(expander) = capabilities.expander {
            query = query.with_expander(expander);
        }
        let query = Arc::new(query);

        let mut sequencer = ScriptSequencer::new(Arc::clone(&query));
        if let Some(parser) = capabilities.script_parser {
            sequencer = sequencer.with_parser(parser);
        }

        tracing::info!(
            dimension = capabilities.store.dimension(),
            detector = capabilities.detector.is_some(),
            "Scene search service ready",
        );

        Ok(Self {
            settings,
            detector: capabilities.detector,
            store: capabilities.store,
            index,
            query,
            sequencer,
        })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    // -- segmentation --------------------------------------------------------

    /// Segment a video with the configured detector.
    ///
    /// `config` overrides the service's default segmentation settings.
    pub async fn segment(
        &self,
        source: Arc<dyn FrameSource>,
        config: Option<SegmentationConfig>,
        cancel: &CancellationToken,
    ) -> Result<SegmentationOutcome, PipelineError> {
        let detector = self.detector.clone().ok_or_else(|| {
            CoreError::Validation("no object detector is configured".to_string())
        })?;
        self.segment_with(detector, source, config, cancel).await
    }

    /// Segment a detection track, using its recorded detections.
    pub async fn segment_track(
        &self,
        track: DetectionTrack,
        config: Option<SegmentationConfig>,
        cancel: &CancellationToken,
    ) -> Result<SegmentationOutcome, PipelineError> {
        let track = Arc::new(track);
        let detector: Arc<dyn Detector> = track.clone();
        self.segment_with(detector, track, config, cancel).await
    }

    async fn segment_with(
        &self,
        detector: Arc<dyn Detector>,
        source: Arc<dyn FrameSource>,
        config: Option<SegmentationConfig>,
        cancel: &CancellationToken,
    ) -> Result<SegmentationOutcome, PipelineError> {
        let config = config.unwrap_or(self.settings.segmentation);
        SegmentationEngine::new(detector)
            .with_retry(self.settings.retry)
            .with_concurrency(self.settings.query.fanout_concurrency)
            .segment(source, &config, cancel)
            .await
    }

    // -- indexing ------------------------------------------------------------

    pub async fn index(
        &self,
        metadata: SegmentMetadata,
        scene: &SceneDescription,
    ) -> Result<String, PipelineError> {
        self.index.index(metadata, scene).await
    }

    pub async fn index_batch(
        &self,
        requests: Vec<IndexRequest>,
    ) -> Result<BatchIndexOutcome, PipelineError> {
        self.index.index_batch(requests).await
    }

    pub async fn get_segment(&self, id: &str) -> Result<SegmentRecord, PipelineError> {
        self.index.get(id).await
    }

    pub async fn delete_source(&self, source_id: &str) -> Result<u64, PipelineError> {
        self.index.delete_source(source_id).await
    }

    pub async fn stats(&self) -> Result<IndexStats, PipelineError> {
        self.index.stats().await
    }

    /// Whether the vector store answers.
    pub async fn ping(&self) -> Result<(), PipelineError> {
        Ok(self.store.ping().await?)
    }

    // -- search --------------------------------------------------------------

    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
        options: SearchOptions,
    ) -> Result<SearchResponse, PipelineError> {
        self.query.search_with(query, top_k, filters, options).await
    }

    pub async fn search_script(
        &self,
        script: &str,
        results_per_action: usize,
        filters: &SearchFilters,
        options: SearchOptions,
    ) -> Result<ScriptSearchResult, PipelineError> {
        self.sequencer
            .search_script(script, results_per_action, filters, options)
            .await
    }

    /// Run a script search and render it as an edit list.
    pub async fn export_script(
        &self,
        script: &str,
        results_per_action: usize,
        filters: &SearchFilters,
        format: ExportFormat,
    ) -> Result<String, PipelineError> {
        let result = self
            .search_script(script, results_per_action, filters, SearchOptions::default())
            .await?;
        Ok(export_edit_sequence(&result, format)?)
    }
}
