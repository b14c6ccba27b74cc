//! Orchestration on top of the pure domain crate: frame sampling and scene
//! segmentation, embedding indexing, multilingual query fan-out and script
//! sequencing, tied together by [`SceneSearchService`].

pub mod error;
pub mod frame_source;
pub mod index;
pub mod query;
pub mod script;
pub mod segmenter;
pub mod service;
pub mod settings;
pub mod task_group;

pub use error::PipelineError;
pub use frame_source::{DetectionTrack, FrameSource, ImageSequenceSource};
pub use index::{BatchIndexOutcome, EmbeddingIndex, IndexRequest};
pub use query::{QueryPipeline, SearchOptions, SearchResponse};
pub use script::ScriptSequencer;
pub use segmenter::{SegmentationEngine, SegmentationOutcome};
pub use service::{Capabilities, SceneSearchService};
pub use settings::ServiceSettings;
pub use task_group::{TaskGroup, TaskPanicked};
