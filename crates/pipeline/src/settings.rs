//! Tunable settings for a [`SceneSearchService`](crate::SceneSearchService).

use std::time::Duration;

use takeone_capabilities::RetryPolicy;
use takeone_core::error::CoreError;
use takeone_core::search::QueryConfig;
use takeone_core::segmentation::SegmentationConfig;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceSettings {
    /// Defaults for segmentation calls that do not bring their own config.
    pub segmentation: SegmentationConfig,
    pub query: QueryConfig,
    pub retry: RetryPolicy,
}

impl ServiceSettings {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// | Env Var              | Default |
    /// |----------------------|---------|
    /// | `CANONICAL_LANGUAGE` | `en`    |
    /// | `MAX_EXPANSIONS`     | `10`    |
    /// | `FANOUT_CONCURRENCY` | `4`     |
    /// | `SEGMENT_THRESHOLD`  | `0.4`   |
    /// | `SEGMENT_MIN_LEN`    | `2.0`   |
    /// | `SEGMENT_MAX_LEN`    | `10.0`  |
    /// | `SEGMENT_STRIDE`     | `5`     |
    /// | `RETRY_MAX_ATTEMPTS` | `3`     |
    /// | `RETRY_INITIAL_DELAY_MS` | `250` |
    ///
    /// Panics on values that do not parse, so misconfiguration fails at
    /// startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let segmentation = SegmentationConfig {
            threshold: env_or("SEGMENT_THRESHOLD", defaults.segmentation.threshold),
            min_len: env_or("SEGMENT_MIN_LEN", defaults.segmentation.min_len),
            max_len: env_or("SEGMENT_MAX_LEN", defaults.segmentation.max_len),
            sample_stride: env_or("SEGMENT_STRIDE", defaults.segmentation.sample_stride),
            weights: defaults.segmentation.weights,
        };

        let query = QueryConfig {
            canonical_language: std::env::var("CANONICAL_LANGUAGE")
                .unwrap_or(defaults.query.canonical_language),
            max_expansions: env_or("MAX_EXPANSIONS", defaults.query.max_expansions),
            fanout_concurrency: env_or("FANOUT_CONCURRENCY", defaults.query.fanout_concurrency),
        };

        let retry = RetryPolicy {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts),
            initial_delay: Duration::from_millis(env_or(
                "RETRY_INITIAL_DELAY_MS",
                defaults.retry.initial_delay.as_millis() as u64,
            )),
            ..defaults.retry
        };

        Self {
            segmentation,
            query,
            retry,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.segmentation.validate()?;
        self.query.validate()?;
        self.retry.validate()
    }
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value, got '{raw}': {e}")),
        Err(_) => default,
    }
}
