//! Pure domain logic for semantic scene segmentation and retrieval.
//!
//! No IO lives here: object signatures and their similarity, boundary
//! detection and length normalization, segment metadata and filters,
//! expansion sets and hit merging, script actions and edit-list export.
//! The capabilities, db, pipeline and api crates build on these types.

pub mod degradation;
pub mod error;
pub mod metadata;
pub mod scene;
pub mod script;
pub mod search;
pub mod segmentation;
pub mod signature;
pub mod similarity;
pub mod threshold_validation;
