//! Failure taxonomy for text generation.

use crate::models::Backend;
use thiserror::Error;

/// Every way a generation request can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// AI disabled, or a required credential is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connection failure or timeout.
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable { backend: Backend, reason: String },

    /// The backend answered with a non-success status.
    #[error("{backend} backend returned HTTP {status}: {body}")]
    BackendError {
        backend: Backend,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected {backend} response: {reason}")]
    Parse { backend: Backend, reason: String },

    #[error("no AI backend available: start Ollama (ollama serve) or set ANTHROPIC_API_KEY")]
    NoBackendAvailable,
}

impl GatewayError {
    /// Classify a transport error from `reqwest`.
    pub(crate) fn from_transport(backend: Backend, err: reqwest::Error, timeout_secs: u64) -> Self {
        let reason = if err.is_timeout() {
            format!("request timed out after {}s", timeout_secs)
        } else if err.is_connect() {
            "connection refused".to_string()
        } else {
            err.to_string()
        };
        GatewayError::BackendUnavailable { backend, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GatewayError::BackendError {
            backend: Backend::Cloud,
            status: 529,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "cloud backend returned HTTP 529: overloaded");

        let err = GatewayError::BackendUnavailable {
            backend: Backend::Local,
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "local backend unavailable: connection refused");
    }
}
