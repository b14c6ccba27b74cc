//! Repository for the `segments` table.
//!
//! The `embedding` column uses pgvector's `vector` type. Because we use
//! runtime queries (no compile-time sqlx macros), embeddings are passed as
//! text (e.g. `'[0.1, 0.2, ...]'::vector`) and cast in SQL. Scores are
//! `1 - cosine distance`, i.e. cosine similarity.

use sqlx::PgPool;
use takeone_core::metadata::SearchFilters;

use crate::models::segment::{to_vector_literal, SegmentRecord, SegmentRow, SEGMENT_COLUMNS};

/// A [`SegmentRow`] plus its similarity to the query vector.
#[derive(Debug, sqlx::FromRow)]
pub struct ScoredSegmentRow {
    #[sqlx(flatten)]
    pub row: SegmentRow,
    pub score: f64,
}

/// A [`SegmentRow`] plus its vector rendered as text.
#[derive(Debug, sqlx::FromRow)]
pub struct SegmentRowWithVector {
    #[sqlx(flatten)]
    pub row: SegmentRow,
    pub embedding: String,
}

/// Provides segment CRUD and nearest-neighbour lookup.
pub struct SegmentRepo;

impl SegmentRepo {
    /// Insert a segment, replacing any existing row with the same id.
    pub async fn upsert(pool: &PgPool, record: &SegmentRecord) -> Result<(), sqlx::Error> {
        let meta = &record.metadata;
        // Validated by the caller; saturate rather than wrap on absurd values.
        let clip_index = i32::try_from(meta.clip_index).unwrap_or(i32::MAX);

        sqlx::query(
            "INSERT INTO segments (id, source_id, clip_index, start_time, end_time, \
                 scene_type, mood, tags, clip_path, thumbnail_path, description, \
                 search_text, embedding) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13::vector) \
             ON CONFLICT (id) DO UPDATE SET \
                 source_id = EXCLUDED.source_id, \
                 clip_index = EXCLUDED.clip_index, \
                 start_time = EXCLUDED.start_time, \
                 end_time = EXCLUDED.end_time, \
                 scene_type = EXCLUDED.scene_type, \
                 mood = EXCLUDED.mood, \
                 tags = EXCLUDED.tags, \
                 clip_path = EXCLUDED.clip_path, \
                 thumbnail_path = EXCLUDED.thumbnail_path, \
                 description = EXCLUDED.description, \
                 search_text = EXCLUDED.search_text, \
                 embedding = EXCLUDED.embedding",
        )
        .bind(&record.id)
        .bind(&meta.source_id)
        .bind(clip_index)
        .bind(meta.start_time)
        .bind(meta.end_time)
        .bind(&meta.scene_type)
        .bind(&meta.mood)
        .bind(&meta.tags)
        .bind(&meta.clip_path)
        .bind(&meta.thumbnail_path)
        .bind(&meta.description)
        .bind(&record.search_text)
        .bind(to_vector_literal(&record.embedding))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// The `limit` segments closest to `embedding` that match `filters`.
    ///
    /// Unset filter fields are passed as NULL and match everything.
    pub async fn nearest(
        pool: &PgPool,
        embedding: &[f32],
        limit: i64,
        filters: &SearchFilters,
    ) -> Result<Vec<ScoredSegmentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SEGMENT_COLUMNS}, \
                    (1.0 - (embedding <=> $1::vector))::DOUBLE PRECISION AS score \
             FROM segments \
             WHERE ($2::TEXT IS NULL OR source_id = $2) \
               AND ($3::TEXT IS NULL OR scene_type = $3) \
               AND ($4::TEXT IS NULL OR mood = $4) \
               AND ($5::TEXT IS NULL OR $5 = ANY(tags)) \
             ORDER BY embedding <=> $1::vector, id \
             LIMIT $6"
        );
        sqlx::query_as::<_, ScoredSegmentRow>(&query)
            .bind(to_vector_literal(embedding))
            .bind(&filters.source_id)
            .bind(&filters.scene_type)
            .bind(&filters.mood)
            .bind(&filters.tag)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Find a segment by id, with its vector.
    pub async fn find_by_id(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<SegmentRowWithVector>, sqlx::Error> {
        let query = format!(
            "SELECT {SEGMENT_COLUMNS}, embedding::TEXT AS embedding \
             FROM segments WHERE id = $1"
        );
        sqlx::query_as::<_, SegmentRowWithVector>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete one segment. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM segments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every segment of a source. Returns the number removed.
    pub async fn delete_by_source(pool: &PgPool, source_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM segments WHERE source_id = $1")
            .bind(source_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Total segment count and distinct source count.
    pub async fn counts(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*)::BIGINT, COUNT(DISTINCT source_id)::BIGINT FROM segments",
        )
        .fetch_one(pool)
        .await
    }
}
