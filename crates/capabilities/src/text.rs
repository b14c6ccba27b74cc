//! LLM-backed text capabilities.

use async_trait::async_trait;
use takeone_core::script::ScriptAction;

use crate::error::CapabilityError;

/// Translate text into a target language, passing it through unchanged
/// when it is already in that language.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, CapabilityError>;
}

/// Produce alternative phrasings of a search query.
///
/// Implementations return candidates only; the caller puts the original
/// query first, deduplicates and bounds the set.
#[async_trait]
pub trait Expander: Send + Sync {
    async fn expand(&self, query: &str, max_alternatives: usize)
        -> Result<Vec<String>, CapabilityError>;
}

/// Split a narrative script into ordered, atomic visual actions.
///
/// Output that cannot be parsed is reported as
/// [`CapabilityError::Malformed`].
#[async_trait]
pub trait ScriptParser: Send + Sync {
    async fn parse(&self, script: &str) -> Result<Vec<ScriptAction>, CapabilityError>;
}
