/// Errors from the external capabilities (detector, embedder, LLM).
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Capability API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service answered, but not with something we can use.
    #[error("Malformed capability output: {0}")]
    Malformed(String),

    /// The capability is not configured or refused to serve.
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    /// The embedder returned a vector of the wrong width.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl CapabilityError {
    /// Whether retrying the same call may succeed.
    ///
    /// Network-level failures, rate limiting (429) and server errors (5xx)
    /// are transient. Client errors, malformed output and configuration
    /// problems are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::Unavailable(_) | Self::DimensionMismatch { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        for status in [429, 500, 502, 503] {
            let err = CapabilityError::Api {
                status,
                body: String::new(),
            };
            assert!(err.is_transient(), "{status} should be transient");
        }
    }

    #[test]
    fn client_errors_and_bad_output_are_permanent() {
        let err = CapabilityError::Api {
            status: 400,
            body: "bad request".into(),
        };
        assert!(!err.is_transient());
        assert!(!CapabilityError::Malformed("x".into()).is_transient());
        assert!(!CapabilityError::Unavailable("x".into()).is_transient());
        assert!(!CapabilityError::DimensionMismatch {
            expected: 3,
            actual: 4
        }
        .is_transient());
    }
}
