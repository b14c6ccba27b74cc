//! Query pipeline: language normalization, expansion, concurrent retrieval
//! per expansion member, and max-score merging.
//!
//! Translation and expansion are optional capabilities. When one is missing
//! the step is skipped; when one fails the step falls back (original text,
//! single-member expansion set) and the fallback is reported as a
//! [`Degradation`]. Retrieval units run through a [`TaskGroup`] and fail
//! independently; a store failure ends the call.

use std::sync::Arc;

use serde::Serialize;
use takeone_capabilities::{Embedder, Expander, RetryPolicy, Translator};
use takeone_core::degradation::Degradation;
use takeone_core::error::CoreError;
use takeone_core::metadata::SearchFilters;
use takeone_core::search::{
    merge_hits, validate_query, ExpansionSet, QueryConfig, SearchHit, MAX_TOP_K,
};
use takeone_core::threshold_validation::validate_non_zero;
use takeone_db::VectorStore;

use crate::error::PipelineError;
use crate::task_group::TaskGroup;

/// Per-call switches for the optional query stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub translate: bool,
    pub expand: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            translate: true,
            expand: true,
        }
    }
}

/// Ranked hits plus a trace of how the query was processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Present only when translation changed the query.
    pub translated_query: Option<String>,
    /// The expansion set that was searched, original query first.
    pub expansions: Vec<String>,
    pub hits: Vec<SearchHit>,
    pub degradations: Vec<Degradation>,
}

pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    translator: Option<Arc<dyn Translator>>,
    expander: Option<Arc<dyn Expander>>,
    retry: RetryPolicy,
    config: QueryConfig,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: QueryConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
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
            translator: None,
            expander: None,
            retry: RetryPolicy::default(),
            config,
        })
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_expander(mut self, expander: Arc<dyn Expander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub(crate) fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Search with translation and expansion enabled.
    pub async fn search(
        &self,
        raw_query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<SearchResponse, PipelineError> {
        self.search_with(raw_query, top_k, filters, SearchOptions::default())
            .await
    }

    pub async fn search_with(
        &self,
        raw_query: &str,
        top_k: usize,
        filters: &SearchFilters,
        options: SearchOptions,
    ) -> Result<SearchResponse, PipelineError> {
        let query = validate_query(raw_query)?;
        validate_non_zero(top_k, "top_k")?;
        let top_k = top_k.min(MAX_TOP_K);
        let started = std::time::Instant::now();

        let mut degradations = Vec::new();
        let translated_query = if options.translate {
            self.translate(query, &mut degradations).await
        } else {
            None
        };
        let text = translated_query.as_deref().unwrap_or(query);

        let expansions = if options.expand {
            self.expand(text, &mut degradations).await
        } else {
            ExpansionSet::single(text)
        };

        let lists = self
            .fan_out(expansions.members(), top_k, filters, &mut degradations)
            .await?;
        let hits = merge_hits(lists, top_k);

        tracing::info!(
            members = expansions.len(),
            hits = hits.len(),
            degradations = degradations.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Search complete",
        );

        Ok(SearchResponse {
            query: query.to_string(),
            translated_query,
            expansions: expansions.into_members(),
            hits,
            degradations,
        })
    }

    /// Translate `text` into the canonical language.
    ///
    /// Returns the translation only when it differs from the input. Failure
    /// or an empty reply records a degradation and returns `None`.
    pub(crate) async fn translate(
        &self,
        text: &str,
        degradations: &mut Vec<Degradation>,
    ) -> Option<String> {
        let translator = self.translator.as_ref()?;
        let language = self.config.canonical_language.as_str();

        let reason = match self
            .retry
            .run("translate", || translator.translate(text, language))
            .await
        {
            Ok(translated) => {
                let translated = translated.trim();
                if translated.is_empty() {
                    "translator returned empty text".to_string()
                } else if translated.eq_ignore_ascii_case(text.trim()) {
                    return None;
                } else {
                    tracing::debug!(language, "Translated input to canonical language");
                    return Some(translated.to_string());
                }
            }
            Err(e) => e.to_string(),
        };

        tracing::warn!(reason = %reason, "Translation failed, using original text");
        degradations.push(Degradation::TranslationFailed { reason });
        None
    }

    async fn expand(&self, text: &str, degradations: &mut Vec<Degradation>) -> ExpansionSet {
        let max = self.config.max_expansions;
        let Some(expander) = self.expander.as_ref() else {
            return ExpansionSet::single(text);
        };
        if max <= 1 {
            return ExpansionSet::single(text);
        }

        let reason = match self
            .retry
            .run("expand", || expander.expand(text, max - 1))
            .await
        {
            Ok(alternatives) => {
                let set = ExpansionSet::build(text, &alternatives, max);
                if set.len() > 1 {
                    tracing::debug!(members = set.len(), "Expanded query");
                    return set;
                }
                "expander returned no usable alternatives".to_string()
            }
            Err(e) => e.to_string(),
        };

        tracing::warn!(reason = %reason, "Query expansion failed, searching original query only");
        degradations.push(Degradation::ExpansionFailed { reason });
        ExpansionSet::single(text)
    }

    /// Embed and retrieve every member concurrently.
    ///
    /// A member whose embedding fails is dropped with a degradation. A store
    /// error ends the call, as does every member failing.
    async fn fan_out(
        &self,
        members: &[String],
        top_k: usize,
        filters: &SearchFilters,
        degradations: &mut Vec<Degradation>,
    ) -> Result<Vec<Vec<SearchHit>>, PipelineError> {
        let mut group = TaskGroup::new(self.config.fanout_concurrency);
        for member in members {
            let embedder = Arc::clone(&self.embedder);
            let store = Arc::clone(&self.store);
            let retry = self.retry;
            let member = member.clone();
            let filters = filters.clone();
            group.spawn(async move {
                retrieve(embedder.as_ref(), store.as_ref(), retry, &member, top_k, &filters).await
            });
        }

        let mut lists = Vec::with_capacity(members.len());
        let mut first_error = None;
        for (member, joined) in members.iter().zip(group.join_all().await) {
            let result = joined.unwrap_or_else(|panicked| {
                Err(CoreError::Internal(panicked.to_string()).into())
            });
            match result {
                Ok(hits) => {
                    tracing::debug!(member = %member, hits = hits.len(), "Retrieved member");
                    lists.push(hits);
                }
                Err(e) if e.is_store() => {
                    tracing::error!(member = %member, error = %e, "Vector store query failed");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(member = %member, error = %e, "Retrieval failed for expansion member");
                    degradations.push(Degradation::MemberFailed {
                        member: member.clone(),
                        reason: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if lists.is_empty() => Err(e),
            _ => Ok(lists),
        }
    }
}

async fn retrieve(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    retry: RetryPolicy,
    member: &str,
    top_k: usize,
    filters: &SearchFilters,
) -> Result<Vec<SearchHit>, PipelineError> {
    let embedding = retry
        .run("embed_query", || embedder.embed(member))
        .await
        .map_err(PipelineError::Embedding)?;
    Ok(store.query(&embedding, top_k, filters).await?)
}
