//! Pipeline Error Types

use thiserror::Error;

use crate::core::services::ServiceError;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a story generation run.
///
/// Recoverable conditions (unmatched requirements, skipped trait
/// changes, missing logs) never surface here; they degrade the output
/// and are reported through match outcomes and scoring issues instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An external generation service failed or timed out.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The generation service returned text no JSON could be read from.
    #[error("Unparseable generation response for {phase}: {detail}")]
    MalformedResponse { phase: String, detail: String },

    #[error("Invalid state transition: cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },
}

impl PipelineError {
    pub fn malformed_response(phase: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            phase: phase.into(),
            detail: detail.into(),
        }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}
