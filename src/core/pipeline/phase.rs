//! Pipeline Phase State Machine
//!
//! The five generation phases run strictly forward. `Error` is
//! terminal and reachable from every phase; phase 0 may be skipped by
//! configuration, which is a normal forward transition.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one story generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    /// Phase 0: pick a fairy tale template to remix.
    FairyTaleSelection,
    /// Phase 1: generate the story skeleton.
    SkeletonGeneration,
    /// Phase 2: resolve character requirements.
    CharacterMatching,
    /// Phase 3: finalize prose per chapter and evolve the avatar.
    StoryFinalization,
    /// Phase 4: generate cover and chapter images.
    ImageGeneration,
    /// Terminal success state.
    Complete,
    /// Terminal failure state.
    Error,
}

impl GenerationPhase {
    /// The five scoreable phases, in order.
    pub const PIPELINE: [GenerationPhase; 5] = [
        Self::FairyTaleSelection,
        Self::SkeletonGeneration,
        Self::CharacterMatching,
        Self::StoryFinalization,
        Self::ImageGeneration,
    ];

    /// Stable key used in phase logs and score reports
    /// ("phase0".."phase4"); terminal states have no key.
    pub fn log_key(&self) -> Option<&'static str> {
        match self {
            Self::FairyTaleSelection => Some("phase0"),
            Self::SkeletonGeneration => Some("phase1"),
            Self::CharacterMatching => Some("phase2"),
            Self::StoryFinalization => Some("phase3"),
            Self::ImageGeneration => Some("phase4"),
            Self::Complete | Self::Error => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FairyTaleSelection => "Fairy Tale Selection",
            Self::SkeletonGeneration => "Skeleton Generation",
            Self::CharacterMatching => "Character Matching",
            Self::StoryFinalization => "Story Finalization",
            Self::ImageGeneration => "Image Generation",
            Self::Complete => "Complete",
            Self::Error => "Error",
        }
    }

    /// The phase that follows in the success path.
    pub fn next(&self) -> Option<GenerationPhase> {
        match self {
            Self::FairyTaleSelection => Some(Self::SkeletonGeneration),
            Self::SkeletonGeneration => Some(Self::CharacterMatching),
            Self::CharacterMatching => Some(Self::StoryFinalization),
            Self::StoryFinalization => Some(Self::ImageGeneration),
            Self::ImageGeneration => Some(Self::Complete),
            Self::Complete | Self::Error => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Check if a transition is valid: strictly forward along the
    /// pipeline, or into `Error` from any non-terminal phase.
    pub fn can_transition_to(&self, target: GenerationPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == Self::Error {
            return true;
        }
        self.next() == Some(target)
    }
}

impl std::fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
