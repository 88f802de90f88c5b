//! Avatar Memories
//!
//! Immutable append-only records of which content changed which
//! traits. The natural key (avatar, content, content type) prevents
//! the same content's effects from being applied twice, and the
//! recorded applied deltas make deletion an exact reversal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::types::AppliedChange;

// ============================================================================
// Content Types
// ============================================================================

/// The kind of content that produced a trait change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Story,
    Doku,
    Quiz,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Doku => "doku",
            Self::Quiz => "quiz",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "story" => Some(Self::Story),
            "doku" => Some(Self::Doku),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Memory Record
// ============================================================================

/// One recorded trait-change application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarMemory {
    /// Unique identifier.
    pub id: String,
    /// Owning avatar.
    pub avatar_id: String,
    /// The content that produced the change.
    pub content_id: String,
    /// Kind of content.
    pub content_type: ContentType,
    /// Realized deltas, as recorded at application time.
    pub applied: Vec<AppliedChange>,
    /// When the memory was recorded.
    pub created_at: DateTime<Utc>,
}

impl AvatarMemory {
    pub fn new(
        avatar_id: impl Into<String>,
        content_id: impl Into<String>,
        content_type: ContentType,
        applied: Vec<AppliedChange>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            avatar_id: avatar_id.into(),
            content_id: content_id.into(),
            content_type,
            applied,
            created_at: Utc::now(),
        }
    }

    /// Natural key preventing double-application of one content's
    /// effects.
    pub fn natural_key(&self) -> String {
        format!("{}:{}:{}", self.avatar_id, self.content_id, self.content_type)
    }
}
