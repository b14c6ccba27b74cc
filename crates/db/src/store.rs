use async_trait::async_trait;
use takeone_core::error::CoreError;
use takeone_core::metadata::SearchFilters;
use takeone_core::search::SearchHit;

use crate::error::StoreError;
use crate::models::segment::{IndexStats, SegmentRecord};

/// Storage and nearest-neighbour lookup for indexed segments.
///
/// Inserts replace by id. Queries return hits sorted by descending cosine
/// similarity and reflect the state of the store when the call began.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Width every stored and queried vector must have.
    fn dimension(&self) -> usize;

    /// Insert or replace one segment.
    async fn upsert(&self, record: SegmentRecord) -> Result<(), StoreError>;

    /// The `top_k` segments most similar to `embedding` that match `filters`.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<SegmentRecord>, StoreError>;

    /// Delete one segment. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Delete every segment of a source. Returns how many were removed.
    async fn delete_by_source(&self, source_id: &str) -> Result<u64, StoreError>;

    async fn stats(&self) -> Result<IndexStats, StoreError>;

    /// Backend liveness check.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Reject vectors whose width differs from the store's.
pub fn check_dimension(embedding: &[f32], expected: usize) -> Result<(), StoreError> {
    if embedding.len() != expected {
        return Err(CoreError::Validation(format!(
            "embedding has {} components, store expects {expected}",
            embedding.len()
        ))
        .into());
    }
    Ok(())
}
