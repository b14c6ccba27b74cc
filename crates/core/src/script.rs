//! Script actions: parsing a narrative into ordered visual actions, the
//! line-split fallback, and edit-sequence export of per-action results.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::degradation::Degradation;
use crate::error::CoreError;
use crate::search::SearchHit;

// ---------------------------------------------------------------------------
// ScriptAction
// ---------------------------------------------------------------------------

/// One atomic, visually searchable step of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptAction {
    pub sequence_index: u32,
    pub action_text: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One action per non-blank line, numbered from 1 in line order.
pub fn fallback_actions(script: &str) -> Vec<ScriptAction> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .zip(1u32..)
        .map(|(line, sequence_index)| ScriptAction {
            sequence_index,
            action_text: line.to_string(),
            description: None,
        })
        .collect()
}

/// Remove a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Shape of one entry in the parser's JSON output.
#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(alias = "sequence_index")]
    sequence: u32,
    #[serde(alias = "action_text")]
    action: String,
    #[serde(default)]
    description: Option<String>,
}

/// Parse the script parser's JSON array into validated actions.
///
/// Malformed JSON is a validation error, as is anything
/// [`validate_actions`] rejects.
pub fn parse_actions_json(raw: &str) -> Result<Vec<ScriptAction>, CoreError> {
    let body = strip_code_fences(raw);
    let parsed: Vec<RawAction> = serde_json::from_str(body)
        .map_err(|e| CoreError::Validation(format!("Malformed action list: {e}")))?;

    validate_actions(
        parsed
            .into_iter()
            .map(|raw| ScriptAction {
                sequence_index: raw.sequence,
                action_text: raw.action,
                description: raw.description,
            })
            .collect(),
    )
}

/// Check a parser's action list and trim its text.
///
/// The list must be non-empty, every action needs non-blank text, and
/// sequence numbers must strictly increase. Blank descriptions become `None`.
pub fn validate_actions(actions: Vec<ScriptAction>) -> Result<Vec<ScriptAction>, CoreError> {
    if actions.is_empty() {
        return Err(CoreError::Validation("Action list is empty".to_string()));
    }

    let mut validated = Vec::with_capacity(actions.len());
    let mut previous: Option<u32> = None;
    for action in actions {
        let action_text = action.action_text.trim();
        if action_text.is_empty() {
            return Err(CoreError::Validation(format!(
                "Action {} has no text",
                action.sequence_index
            )));
        }
        if let Some(prev) = previous.filter(|&p| action.sequence_index <= p) {
            return Err(CoreError::Validation(format!(
                "Action sequence numbers must increase, got {} after {prev}",
                action.sequence_index
            )));
        }
        previous = Some(action.sequence_index);
        validated.push(ScriptAction {
            sequence_index: action.sequence_index,
            action_text: action_text.to_string(),
            description: action
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        });
    }
    Ok(validated)
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Matches found for one script action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub sequence_index: u32,
    pub action_text: String,
    pub description: Option<String>,
    pub matches: Vec<SearchHit>,
}

/// Outcome of a script search, in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSearchResult {
    pub original_script: String,
    /// Present only when translation changed the script.
    pub translated_script: Option<String>,
    pub results: Vec<ActionResult>,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

impl ScriptSearchResult {
    pub fn total_actions(&self) -> usize {
        self.results.len()
    }

    pub fn total_matches(&self) -> usize {
        self.results.iter().map(|r| r.matches.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Edit-sequence export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(CoreError::Validation(format!(
                "Unknown export format '{other}', expected text, csv or json"
            ))),
        }
    }
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

const CSV_HEADER: &str = "Sequence,Action,Clip Path,Score,Duration,Description";
const RULE_WIDTH: usize = 80;

/// Render a script search result as an edit list for video editors.
pub fn export_edit_sequence(
    result: &ScriptSearchResult,
    format: ExportFormat,
) -> Result<String, CoreError> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(result)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize edit sequence: {e}"))),
        ExportFormat::Csv => Ok(export_csv(result)),
        ExportFormat::Text => Ok(export_text(result)),
    }
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn export_csv(result: &ScriptSearchResult) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    for action in &result.results {
        for hit in &action.matches {
            lines.push(format!(
                "{},{},{},{:.3},{:.1},{}",
                action.sequence_index,
                csv_field(&action.action_text),
                csv_field(hit.metadata.clip_path.as_deref().unwrap_or_default()),
                hit.score,
                hit.metadata.duration(),
                csv_field(&hit.metadata.description),
            ));
        }
    }
    lines.join("\n")
}

fn export_text(result: &ScriptSearchResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "SCRIPT-TO-SEQUENCE EDIT LIST");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total Actions: {}", result.total_actions());
    let _ = writeln!(out, "Total Matches: {}", result.total_matches());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out);

    for action in &result.results {
        let _ = writeln!(out, "[{}] {}", action.sequence_index, action.action_text);
        let _ = writeln!(
            out,
            "    Description: {}",
            action.description.as_deref().unwrap_or("N/A")
        );
        let _ = writeln!(out, "    Matches: {}", action.matches.len());
        let _ = writeln!(out);

        for (i, hit) in action.matches.iter().enumerate() {
            let _ = writeln!(out, "    Option {}:", i + 1);
            let _ = writeln!(
                out,
                "      File: {}",
                hit.metadata.clip_path.as_deref().unwrap_or(&hit.segment_id)
            );
            let _ = writeln!(out, "      Score: {:.1}%", hit.score * 100.0);
            let _ = writeln!(out, "      Duration: {:.1}s", hit.metadata.duration());
            if !hit.metadata.description.is_empty() {
                let _ = writeln!(out, "      Description: {}", hit.metadata.description);
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "{thin}");
        let _ = writeln!(out);
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
