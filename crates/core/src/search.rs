//! Retrieval constants and the pure pieces of the query pipeline:
//! expansion-set construction, expander output cleaning, and the
//! max-score merge of per-paraphrase hit lists.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::metadata::SegmentMetadata;
use crate::threshold_validation::validate_non_zero;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Default number of hits returned by a search.
pub const DEFAULT_TOP_K: usize = 10;

/// Maximum number of hits a caller may request.
pub const MAX_TOP_K: usize = 100;

/// Default number of hits returned per script action.
pub const DEFAULT_RESULTS_PER_ACTION: usize = 3;

/// Default bound on the size of an expansion set (original included).
pub const DEFAULT_MAX_EXPANSIONS: usize = 10;

/// Default number of retrieval units in flight at once.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 4;

/// Default canonical search language (ISO 639-1).
pub const DEFAULT_CANONICAL_LANGUAGE: &str = "en";

/// Expander lines this short (in characters) are noise, not paraphrases.
pub const MIN_EXPANSION_CHARS: usize = 4;

/// Clamp a user-provided result count to `[1, max]`.
pub fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max)
}

// ---------------------------------------------------------------------------
// QueryConfig
// ---------------------------------------------------------------------------

/// Settings for the text-query path shared by search and script search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Language queries are translated into before embedding.
    pub canonical_language: String,
    /// Upper bound on the expansion set, original query included.
    pub max_expansions: usize,
    /// Upper bound on concurrently running retrieval units.
    pub fanout_concurrency: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            canonical_language: DEFAULT_CANONICAL_LANGUAGE.to_string(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.canonical_language.trim().is_empty() {
            return Err(CoreError::Validation(
                "canonical_language must not be empty".to_string(),
            ));
        }
        validate_non_zero(self.max_expansions, "max_expansions")?;
        validate_non_zero(self.fanout_concurrency, "fanout_concurrency")
    }
}

/// Reject blank queries before any capability is called.
pub fn validate_query(query: &str) -> Result<&str, CoreError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Query must not be empty".to_string()));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// SearchHit
// ---------------------------------------------------------------------------

/// One ranked result: a segment, its similarity score, and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub segment_id: String,
    pub score: f64,
    pub metadata: SegmentMetadata,
}

// ---------------------------------------------------------------------------
// Expansion set
// ---------------------------------------------------------------------------

/// Ordered, deduplicated, bounded list of paraphrases of one query.
///
/// The original query is always the first member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionSet {
    members: Vec<String>,
}

impl ExpansionSet {
    /// A set holding only the original query.
    pub fn single(original: &str) -> Self {
        Self {
            members: vec![original.trim().to_string()],
        }
    }

    /// Build a set from the original query plus candidate paraphrases.
    ///
    /// Members are trimmed; blanks and case-insensitive duplicates are
    /// dropped; the result is truncated to `max` (at least one member).
    pub fn build<I, S>(original: &str, alternatives: I, max: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::single(original);
        let mut seen: Vec<String> = vec![set.members[0].to_lowercase()];
        let max = max.max(1);

        for alt in alternatives {
            if set.members.len() >= max {
                break;
            }
            let alt = alt.as_ref().trim();
            if alt.is_empty() {
                continue;
            }
            let key = alt.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            set.members.push(alt.to_string());
        }
        set
    }

    pub fn original(&self) -> &str {
        &self.members[0]
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: a set holds at least the original query.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<String> {
        self.members
    }
}

/// List markers an LLM tends to put in front of each line.
static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:\d+\s*[.):]|[-*•]|\(\d+\))\s*"#).expect("valid regex")
});

/// Turn a free-form expander completion into candidate paraphrases.
///
/// One candidate per line; list markers and wrapping quotes are stripped and
/// fragments shorter than [`MIN_EXPANSION_CHARS`] are dropped.
pub fn clean_expansion_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| LIST_MARKER_RE.replace(line, ""))
        .map(|line| line.trim().trim_matches('"').trim().to_string())
        .filter(|line| line.chars().count() >= MIN_EXPANSION_CHARS)
        .collect()
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Union hit lists by segment id, keeping the highest score per segment.
///
/// Hits are ordered by descending score; ties keep the order in which the
/// segments were first discovered. The result is truncated to `top_k`.
pub fn merge_hits<I>(lists: I, top_k: usize) -> Vec<SearchHit>
where
    I: IntoIterator<Item = Vec<SearchHit>>,
{
    let mut best: IndexMap<String, SearchHit> = IndexMap::new();

    for hit in lists.into_iter().flatten() {
        match best.get_mut(&hit.segment_id) {
            Some(existing) => {
                if hit.score > existing.score {
                    existing.score = hit.score;
                }
            }
            None => {
                best.insert(hit.segment_id.clone(), hit);
            }
        }
    }

    let mut merged: Vec<SearchHit> = best.into_values().collect();
    // `sort_by` is stable, so equal scores keep discovery order.
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(top_k);
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
