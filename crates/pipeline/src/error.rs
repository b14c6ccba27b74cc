use takeone_capabilities::CapabilityError;
use takeone_core::error::CoreError;
use takeone_db::StoreError;

/// Errors that end a pipeline call, named by the stage that failed.
///
/// Capability failures with a documented fallback never show up here; they
/// are reported as [`Degradation`](takeone_core::degradation::Degradation)s
/// next to the result instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Embedding failed: {0}")]
    Embedding(#[source] CapabilityError),

    #[error("Frame source error: {0}")]
    FrameSource(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether the failure came from the vector store.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
