/// Domain-level errors shared by every crate in the workspace.
///
/// These represent caller contract violations and lookups that cannot be
/// recovered internally. Capability failures never surface here; they are
/// degraded to documented fallbacks by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidRange { start: f64, end: f64 },

    #[error("Internal error: {0}")]
    Internal(String),
}
