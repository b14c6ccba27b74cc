//! [`VectorStore`] backed by Postgres + pgvector.

use async_trait::async_trait;
use takeone_core::metadata::SearchFilters;
use takeone_core::search::SearchHit;

use crate::error::StoreError;
use crate::models::segment::{parse_vector_literal, IndexStats, SegmentRecord};
use crate::repositories::SegmentRepo;
use crate::store::{check_dimension, VectorStore};
use crate::DbPool;

pub struct PgVectorStore {
    pool: DbPool,
    dimension: usize,
}

impl PgVectorStore {
    pub fn new(pool: DbPool, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Fold connection-level failures into [`StoreError::Unavailable`].
fn classify(e: sqlx::Error) -> StoreError {
    let err = StoreError::Database(e);
    if err.is_unavailable() {
        StoreError::Unavailable(err.to_string())
    } else {
        err
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, record: SegmentRecord) -> Result<(), StoreError> {
        check_dimension(&record.embedding, self.dimension)?;
        record.metadata.validate()?;
        SegmentRepo::upsert(&self.pool, &record).await.map_err(classify)
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, StoreError> {
        check_dimension(embedding, self.dimension)?;
        let limit = i64::try_from(top_k).unwrap_or(i64::MAX);

        let rows = SegmentRepo::nearest(&self.pool, embedding, limit, filters)
            .await
            .map_err(classify)?;

        rows.into_iter()
            .map(|scored| -> Result<SearchHit, StoreError> {
                let (segment_id, metadata, _) = scored.row.into_metadata()?;
                Ok(SearchHit {
                    segment_id,
                    score: scored.score,
                    metadata,
                })
            })
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<SegmentRecord>, StoreError> {
        let Some(found) = SegmentRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify)?
        else {
            return Ok(None);
        };
        let embedding = parse_vector_literal(&found.embedding)?;
        let (id, metadata, search_text) = found.row.into_metadata()?;
        Ok(Some(SegmentRecord {
            id,
            embedding,
            metadata,
            search_text,
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        SegmentRepo::delete(&self.pool, id).await.map_err(classify)
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<u64, StoreError> {
        let removed = SegmentRepo::delete_by_source(&self.pool, source_id)
            .await
            .map_err(classify)?;
        tracing::info!(source_id, removed, "Deleted segments for source");
        Ok(removed)
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        let (total, sources) = SegmentRepo::counts(&self.pool).await.map_err(classify)?;
        Ok(IndexStats {
            total_segments: total.max(0) as u64,
            unique_sources: sources.max(0) as u64,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(classify)
    }
}
