//! Character Matching Error Types
//!
//! Matching never aborts a run: every error here is recoverable and is
//! reported through the match outcome for the scoring engine to
//! surface.

use thiserror::Error;

/// Errors raised while resolving requirements against the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Placeholder does not match the `{{UPPER_SNAKE}}` format.
    #[error("Malformed placeholder '{placeholder}', expected {{{{UPPER_SNAKE}}}} format")]
    InvalidPlaceholder { placeholder: String },

    /// Hard constraints removed every candidate.
    #[error("No candidate satisfies constraints for '{placeholder}': {reason}")]
    ConstraintViolation { placeholder: String, reason: String },
}

impl MatchError {
    pub fn invalid_placeholder(placeholder: impl Into<String>) -> Self {
        Self::InvalidPlaceholder {
            placeholder: placeholder.into(),
        }
    }

    pub fn constraint_violation(
        placeholder: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConstraintViolation {
            placeholder: placeholder.into(),
            reason: reason.into(),
        }
    }

    /// All matching errors degrade output quality without stopping the
    /// pipeline.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}
