//! Story Run Context
//!
//! The request that starts a run and the state accumulated as phases
//! complete. Each phase reads the context its predecessors filled in.

use serde::{Deserialize, Serialize};

use crate::core::characters::matching::MatchOutcome;
use crate::core::characters::types::AvatarSnapshot;

use super::skeleton::{FairyTaleSelection, FinalStory, ImageManifest, StorySkeleton};

// ============================================================================
// Request Types
// ============================================================================

/// Requested story length, which fixes the expected chapter band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl StoryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    /// Chapter count band expected for this length.
    pub fn expected_chapters(&self) -> std::ops::RangeInclusive<u32> {
        match self {
            Self::Short => 3..=4,
            Self::Medium => 5..=6,
            Self::Long => 7..=8,
        }
    }
}

/// The child the story is personalized for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
    pub name: String,
    pub age_years: u8,
}

/// Per-run story configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryConfig {
    /// Story genre ("adventure", "friendship", ...).
    pub genre: String,
    /// Story setting ("forest", "castle", ...); drives canon filtering.
    pub setting: String,
    #[serde(default)]
    pub length: StoryLength,
    /// Whether phase 0 runs at all.
    #[serde(default)]
    pub use_fairy_tale_template: bool,
}

/// Everything needed to start a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    pub avatar: AvatarSnapshot,
    pub child: ChildProfile,
    pub config: StoryConfig,
}

// ============================================================================
// Accumulated Context
// ============================================================================

/// State carried forward across phases of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fairy_tale: Option<FairyTaleSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<StorySkeleton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_outcome: Option<MatchOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_story: Option<FinalStory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageManifest>,
}
