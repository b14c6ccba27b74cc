//! External capabilities consumed by the scene search pipeline.
//!
//! Each capability is a trait used as a trait object so the pipeline can be
//! wired with HTTP clients in production and scripted fakes in tests:
//!
//! - [`Detector`]: frame -> labelled bounding boxes.
//! - [`Embedder`]: text -> fixed-width vector.
//! - [`Translator`], [`Expander`], [`ScriptParser`]: LLM-backed text helpers.
//!
//! Calls are wrapped in a [`RetryPolicy`] by the caller; only transient
//! [`CapabilityError`]s are retried.

pub mod detector;
pub mod embedder;
pub mod error;
pub mod hashing;
mod http;
pub mod openai;
pub mod retry;
pub mod text;

pub use detector::{Detector, Frame, HttpDetector, DEFAULT_DETECTOR_TIMEOUT};
pub use embedder::Embedder;
pub use error::CapabilityError;
pub use hashing::HashingEmbedder;
pub use openai::{OpenAiChat, OpenAiConfig, OpenAiEmbedder};
pub use retry::RetryPolicy;
pub use text::{Expander, ScriptParser, Translator};
