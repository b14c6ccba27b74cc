//! Segment storage: the [`VectorStore`] contract and its two backends.
//!
//! - [`MemoryVectorStore`]: process-local, snapshot-at-call reads.
//! - [`PgVectorStore`]: Postgres + pgvector via runtime `sqlx` queries.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod models;
pub mod pgvector;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryVectorStore;
pub use models::segment::{IndexStats, SegmentRecord};
pub use pgvector::PgVectorStore;
pub use store::VectorStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
