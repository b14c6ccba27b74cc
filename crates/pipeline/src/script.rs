//! Script sequencer: splits a narrative into ordered visual actions and
//! finds footage for each one.

use std::sync::Arc;

use takeone_capabilities::ScriptParser;
use takeone_core::degradation::Degradation;
use takeone_core::error::CoreError;
use takeone_core::metadata::SearchFilters;
use takeone_core::script::{
    fallback_actions, validate_actions, ActionResult, ScriptAction, ScriptSearchResult,
};
use takeone_core::search::validate_query;
use takeone_core::threshold_validation::validate_non_zero;

use crate::error::PipelineError;
use crate::query::{QueryPipeline, SearchOptions};
use crate::task_group::TaskGroup;

pub struct ScriptSequencer {
    query: Arc<QueryPipeline>,
    parser: Option<Arc<dyn ScriptParser>>,
}

impl ScriptSequencer {
    pub fn new(query: Arc<QueryPipeline>) -> Self {
        Self {
            query,
            parser: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ScriptParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Find up to `results_per_action` matches for every action of
    /// `raw_script`, in sequence order.
    ///
    /// The script is translated once as a whole; the per-action searches do
    /// not translate again. `options.expand` applies to every action.
    pub async fn search_script(
        &self,
        raw_script: &str,
        results_per_action: usize,
        filters: &SearchFilters,
        options: SearchOptions,
    ) -> Result<ScriptSearchResult, PipelineError> {
        let script = validate_query(raw_script)
            .map_err(|_| CoreError::Validation("Script must not be empty".to_string()))?;
        validate_non_zero(results_per_action, "results_per_action")?;
        let started = std::time::Instant::now();

        let mut degradations = Vec::new();
        let translated_script = if options.translate {
            self.query.translate(script, &mut degradations).await
        } else {
            None
        };
        let text = translated_script.as_deref().unwrap_or(script);

        let actions = self.parse(text, &mut degradations).await;
        tracing::info!(actions = actions.len(), "Parsed script into actions");

        let per_action = SearchOptions {
            translate: false,
            expand: options.expand,
        };
        let mut group = TaskGroup::new(self.query.config().fanout_concurrency);
        for action in &actions {
            let query = Arc::clone(&self.query);
            let action_text = action.action_text.clone();
            let filters = filters.clone();
            group.spawn(async move {
                query
                    .search_with(&action_text, results_per_action, &filters, per_action)
                    .await
            });
        }

        let mut results = Vec::with_capacity(actions.len());
        for (action, joined) in actions.into_iter().zip(group.join_all().await) {
            let outcome = joined.unwrap_or_else(|panicked| {
                Err(CoreError::Internal(panicked.to_string()).into())
            });
            let matches = match outcome {
                Ok(response) => {
                    degradations.extend(response.degradations);
                    response.hits
                }
                Err(e) if e.is_store() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        sequence_index = action.sequence_index,
                        error = %e,
                        "Search failed for script action",
                    );
                    degradations.push(Degradation::ActionFailed {
                        sequence_index: action.sequence_index,
                        reason: e.to_string(),
                    });
                    Vec::new()
                }
            };
            results.push(ActionResult {
                sequence_index: action.sequence_index,
                action_text: action.action_text,
                description: action.description,
                matches,
            });
        }

        let result = ScriptSearchResult {
            original_script: raw_script.to_string(),
            translated_script,
            results,
            degradations,
        };
        tracing::info!(
            actions = result.total_actions(),
            matches = result.total_matches(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Script search complete",
        );
        Ok(result)
    }

    /// Parse with the capability if one is configured, else split by line.
    async fn parse(&self, script: &str, degradations: &mut Vec<Degradation>) -> Vec<ScriptAction> {
        let Some(parser) = self.parser.as_ref() else {
            return fallback_actions(script);
        };

        let reason = match self
            .query
            .retry()
            .run("parse_script", || parser.parse(script))
            .await
        {
            Ok(actions) => match validate_actions(actions) {
                Ok(actions) => return actions,
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!(reason = %reason, "Script parsing failed, falling back to one action per line");
        degradations.push(Degradation::ScriptParseFailed { reason });
        fallback_actions(script)
    }
}
