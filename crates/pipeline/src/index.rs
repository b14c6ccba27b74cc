//! Embedding index: turns analysed scenes into stored vectors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use takeone_capabilities::{Embedder, RetryPolicy};
use takeone_core::error::CoreError;
use takeone_core::metadata::{SceneDescription, SegmentMetadata};
use takeone_db::{IndexStats, SegmentRecord, VectorStore};

use crate::error::PipelineError;

/// One analysed scene ready to be indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub metadata: SegmentMetadata,
    pub scene: SceneDescription,
}

/// Outcome of [`EmbeddingIndex::index_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchIndexOutcome {
    /// Ids that were written, in request order.
    pub indexed: Vec<String>,
    /// Requests that were skipped because they failed.
    pub failed: usize,
}

pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex").finish_non_exhaustive()
    }
}

impl EmbeddingIndex {
    /// Fails if the embedder and store disagree on vector width.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        retry: RetryPolicy,
    ) -> Result<Self, PipelineError> {
        if embedder.dimension() != store.dimension() {
            return Err(CoreError::Validation(format!(
                "embedder produces {}-d vectors but the store holds {}-d vectors",
                embedder.dimension(),
                store.dimension()
            ))
            .into());
        }
        Ok(Self {
            embedder,
            store,
            retry,
        })
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embed `scene` and store it under the id derived from `metadata`,
    /// replacing any previous entry with that id. Returns the segment id.
    pub async fn index(
        &self,
        metadata: SegmentMetadata,
        scene: &SceneDescription,
    ) -> Result<String, PipelineError> {
        let metadata = metadata.with_description(scene);
        metadata.validate()?;

        let search_text = scene.search_text();
        if search_text.is_empty() {
            return Err(CoreError::Validation(format!(
                "scene {} has no text attributes to index",
                metadata.segment_id()
            ))
            .into());
        }

        let embedding = self
            .retry
            .run("embed_scene", || self.embedder.embed(&search_text))
            .await
            .map_err(PipelineError::Embedding)?;

        let id = metadata.segment_id();
        self.store
            .upsert(SegmentRecord {
                id: id.clone(),
                embedding,
                metadata,
                search_text,
            })
            .await?;

        tracing::debug!(segment_id = %id, "Indexed segment");
        Ok(id)
    }

    /// Index each request in turn.
    ///
    /// A request that fails validation or embedding is logged, counted and
    /// skipped. An unreachable store ends the batch with an error.
    pub async fn index_batch(
        &self,
        requests: Vec<IndexRequest>,
    ) -> Result<BatchIndexOutcome, PipelineError> {
        let total = requests.len();
        let mut outcome = BatchIndexOutcome::default();

        for request in requests {
            let id = request.metadata.segment_id();
            match self.index(request.metadata, &request.scene).await {
                Ok(id) => outcome.indexed.push(id),
                Err(PipelineError::Store(e)) if e.is_unavailable() => {
                    tracing::error!(segment_id = %id, error = %e, "Vector store unavailable, aborting batch");
                    return Err(PipelineError::Store(e));
                }
                Err(e) => {
                    tracing::warn!(segment_id = %id, error = %e, "Failed to index segment");
                    outcome.failed += 1;
                }
            }
        }

        tracing::info!(indexed = outcome.indexed.len(), total, "Batch indexing complete");
        Ok(outcome)
    }

    pub async fn get(&self, id: &str) -> Result<SegmentRecord, PipelineError> {
        self.store.get(id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "Segment",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Remove every segment of `source_id`. Returns how many were removed.
    pub async fn delete_source(&self, source_id: &str) -> Result<u64, PipelineError> {
        let deleted = self.store.delete_by_source(source_id).await?;
        tracing::info!(source_id, deleted, "Deleted source segments");
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<IndexStats, PipelineError> {
        Ok(self.store.stats().await?)
    }
}
