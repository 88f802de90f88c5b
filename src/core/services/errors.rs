//! Service Error Types
//!
//! Typed failures from the external generation collaborators. All of
//! these are phase-fatal: the orchestrator maps them to a pipeline
//! error and the run transitions to its error state.

use thiserror::Error;

/// Failure of an external service call.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("Service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The call exceeded its configured timeout.
    #[error("Service call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The response body could not be decoded.
    #[error("Failed to decode service response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport-level failure (connection refused, DNS, TLS).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ServiceError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Service errors abort the current phase and the run.
    pub fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::http(503, "overloaded");
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));

        let err = ServiceError::Timeout { timeout_secs: 90 };
        assert!(err.to_string().contains("90"));
    }

    #[test]
    fn test_not_recoverable() {
        assert!(!ServiceError::http(500, "x").is_recoverable());
    }
}
