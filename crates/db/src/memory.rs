//! In-process vector store.
//!
//! The segment map sits behind an `Arc` that writers replace copy-on-write.
//! A query clones the `Arc` under a brief read lock and then scores without
//! holding any lock, so it sees the store exactly as it was when the call
//! began and never blocks (or is blocked by) a concurrent insert or delete.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use takeone_core::metadata::SearchFilters;
use takeone_core::search::SearchHit;
use takeone_core::similarity::cosine_similarity;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::segment::{IndexStats, SegmentRecord};
use crate::store::{check_dimension, VectorStore};

type SegmentMap = IndexMap<String, SegmentRecord>;

pub struct MemoryVectorStore {
    dimension: usize,
    segments: RwLock<Arc<SegmentMap>>,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            segments: RwLock::new(Arc::new(SegmentMap::new())),
        }
    }

    async fn snapshot(&self) -> Arc<SegmentMap> {
        Arc::clone(&*self.segments.read().await)
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, record: SegmentRecord) -> Result<(), StoreError> {
        check_dimension(&record.embedding, self.dimension)?;
        record.metadata.validate()?;

        let mut guard = self.segments.write().await;
        Arc::make_mut(&mut *guard).insert(record.id.clone(), record);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, StoreError> {
        check_dimension(embedding, self.dimension)?;
        let snapshot = self.snapshot().await;

        let mut hits: Vec<SearchHit> = snapshot
            .values()
            .filter(|record| filters.matches(&record.metadata))
            .map(|record| SearchHit {
                segment_id: record.id.clone(),
                score: cosine_similarity(embedding, &record.embedding),
                metadata: record.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn get(&self, id: &str) -> Result<Option<SegmentRecord>, StoreError> {
        Ok(self.snapshot().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.segments.write().await;
        if !guard.contains_key(id) {
            return Ok(false);
        }
        Ok(Arc::make_mut(&mut *guard).shift_remove(id).is_some())
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<u64, StoreError> {
        let mut guard = self.segments.write().await;
        let before = guard.len();
        if guard.values().all(|r| r.metadata.source_id != source_id) {
            return Ok(0);
        }
        Arc::make_mut(&mut *guard).retain(|_, record| record.metadata.source_id != source_id);
        Ok((before - guard.len()) as u64)
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        let snapshot = self.snapshot().await;
        let sources: HashSet<&str> = snapshot
            .values()
            .map(|r| r.metadata.source_id.as_str())
            .collect();
        Ok(IndexStats {
            total_segments: snapshot.len() as u64,
            unique_sources: sources.len() as u64,
        })
    }
}
