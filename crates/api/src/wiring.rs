//! Builds the service's [`Capabilities`] from a [`BackendConfig`].

use std::sync::Arc;

use takeone_capabilities::{
    CapabilityError, HashingEmbedder, HttpDetector, OpenAiChat, OpenAiConfig, OpenAiEmbedder,
};
use takeone_db::{MemoryVectorStore, PgVectorStore, VectorStore};
use takeone_pipeline::Capabilities;

use crate::config::BackendConfig;

/// Failures while connecting the service to its backends at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
}

/// Connect every backend named by `config`.
///
/// With a `DATABASE_URL` the pgvector store is used after a health check and
/// migrations; with an `OPENAI_API_KEY` one chat client serves translation,
/// expansion and script parsing.
pub async fn build_capabilities(config: &BackendConfig) -> Result<Capabilities, StartupError> {
    let dimension = config.embedding_dimension;

    let store: Arc<dyn VectorStore> = match &config.database_url {
        Some(url) => {
            let pool = takeone_db::create_pool(url).await?;
            tracing::info!("Database connection pool created");
            takeone_db::health_check(&pool).await?;
            takeone_db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");
            Arc::new(PgVectorStore::new(pool, dimension))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, segments are kept in memory only");
            Arc::new(MemoryVectorStore::new(dimension))
        }
    };

    let mut capabilities = match &config.openai_api_key {
        Some(key) => {
            let openai = openai_config(config, key);
            let embedder = OpenAiEmbedder::new(&openai, dimension)?;
            let chat = Arc::new(OpenAiChat::new(&openai)?);
            tracing::info!(
                base_url = %openai.base_url,
                embedding_model = %openai.embedding_model,
                chat_model = %openai.chat_model,
                "OpenAI capabilities configured",
            );

            let mut capabilities = Capabilities::new(Arc::new(embedder), store);
            capabilities.translator = Some(chat.clone());
            capabilities.expander = Some(chat.clone());
            capabilities.script_parser = Some(chat);
            capabilities
        }
        None => {
            tracing::warn!(
                "OPENAI_API_KEY not set, using the hashing embedder without translation or expansion"
            );
            Capabilities::new(Arc::new(HashingEmbedder::new(dimension)), store)
        }
    };

    if let Some(url) = &config.detector_url {
        tracing::info!(%url, "Object detector configured");
        capabilities.detector = Some(Arc::new(HttpDetector::new(url.clone())?));
    }

    Ok(capabilities)
}

fn openai_config(config: &BackendConfig, api_key: &str) -> OpenAiConfig {
    let mut openai = OpenAiConfig::new(api_key);
    if let Some(base_url) = &config.openai_base_url {
        openai = openai.with_base_url(base_url.clone());
    }
    if let Some(model) = &config.embedding_model {
        openai.embedding_model = model.clone();
    }
    if let Some(model) = &config.chat_model {
        openai.chat_model = model.clone();
    }
    openai
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use takeone_capabilities::Embedder;

    use super::*;

    #[tokio::test]
    async fn local_config_needs_no_network() {
        let capabilities = build_capabilities(&BackendConfig::local(32)).await.unwrap();
        assert_eq!(capabilities.embedder.dimension(), 32);
        assert_eq!(capabilities.store.dimension(), 32);
        assert!(capabilities.detector.is_none());
        assert!(capabilities.translator.is_none());
    }

    #[tokio::test]
    async fn blank_api_key_fails_startup() {
        let mut config = BackendConfig::local(32);
        config.openai_api_key = Some("  ".into());

        let result = build_capabilities(&config).await;
        assert_matches!(
            result.err(),
            Some(StartupError::Capability(CapabilityError::Unavailable(_)))
        );
    }

    #[test]
    fn openai_overrides_are_applied() {
        let mut config = BackendConfig::local(64);
        config.openai_base_url = Some("http://localhost:8080/v1/".into());
        config.chat_model = Some("local-chat".into());

        let openai = openai_config(&config, "key");
        assert_eq!(openai.base_url, "http://localhost:8080/v1");
        assert_eq!(openai.chat_model, "local-chat");
        assert_eq!(openai.embedding_model, "text-embedding-3-small");
    }
}
