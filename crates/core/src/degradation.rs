//! Named fallbacks taken when an external capability fails or returns
//! unusable output. Each one is logged where it happens and returned to the
//! caller alongside the (still valid) result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Translation failed; the original text was used.
    TranslationFailed { reason: String },
    /// Expansion failed or produced nothing; only the original query was used.
    ExpansionFailed { reason: String },
    /// One expansion member could not be embedded or retrieved.
    MemberFailed { member: String, reason: String },
    /// The script parser failed or returned malformed output; lines were used.
    ScriptParseFailed { reason: String },
    /// Retrieval for one script action failed; its match list is empty.
    ActionFailed { sequence_index: u32, reason: String },
    /// Detection failed for one sampled frame; it got an empty signature.
    DetectionFailed { timestamp_ms: u64, reason: String },
}

impl Degradation {
    /// Short stable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TranslationFailed { .. } => "translation_failed",
            Self::ExpansionFailed { .. } => "expansion_failed",
            Self::MemberFailed { .. } => "member_failed",
            Self::ScriptParseFailed { .. } => "script_parse_failed",
            Self::ActionFailed { .. } => "action_failed",
            Self::DetectionFailed { .. } => "detection_failed",
        }
    }
}
