//! Phase Result Types
//!
//! Typed results each phase produces: the selected fairy tale, the
//! story skeleton, the finalized story, and the image manifest. These
//! are the shapes the generation service's JSON responses are parsed
//! into, and what the phase logs snapshot.

use serde::{Deserialize, Serialize};

use crate::core::characters::requirements::CharacterRequirement;
use crate::core::personality::types::TraitChange;

// ============================================================================
// Phase 0: Fairy Tale Selection
// ============================================================================

/// The fairy tale template chosen as the remix basis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairyTaleSelection {
    pub fairy_tale_id: String,
    pub title: String,
    /// How well the template fits the request, 0.0-1.0.
    pub match_score: f64,
    /// Why this template was picked.
    pub match_reason: String,
    /// Age band the template suits.
    pub age_min: u8,
    pub age_max: u8,
    /// Genre the template belongs to.
    pub genre: String,
}

impl FairyTaleSelection {
    /// Whether the template suits a child of the given age.
    pub fn fits_age(&self, age_years: u8) -> bool {
        age_years >= self.age_min && age_years <= self.age_max
    }
}

// ============================================================================
// Phase 1: Story Skeleton
// ============================================================================

/// Outline of a single chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterOutline {
    pub index: u32,
    pub title: String,
    pub synopsis: String,
    /// Placeholder tokens appearing in this chapter.
    #[serde(default)]
    pub placeholders: Vec<String>,
}

/// The generated story skeleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySkeleton {
    pub title: String,
    pub summary: String,
    /// Placeholder the avatar fills (the hero slot).
    pub hero_placeholder: String,
    /// Requirements for supporting characters.
    #[serde(default)]
    pub supporting_character_requirements: Vec<CharacterRequirement>,
    pub chapters: Vec<ChapterOutline>,
}

impl StorySkeleton {
    /// Total requirement count including the hero slot.
    pub fn requirement_count(&self) -> usize {
        self.supporting_character_requirements.len() + 1
    }
}

// ============================================================================
// Phase 3: Final Story
// ============================================================================

/// One finished chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalChapter {
    pub index: u32,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// The finalized story with the avatar's development record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalStory {
    pub title: String,
    pub chapters: Vec<FinalChapter>,
    /// Trait changes the story grants the avatar.
    #[serde(default)]
    pub avatar_development: Vec<TraitChange>,
    /// Title of the remixed fairy tale, when one was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fairy_tale_title: Option<String>,
    /// Short description of how the remix departs from the original.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twist_summary: Option<String>,
}

// ============================================================================
// Phase 4: Image Manifest
// ============================================================================

/// Outcome of one chapter illustration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterImage {
    pub chapter_index: u32,
    /// The prompt sent to the image service.
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// All images produced for one story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_prompt: Option<String>,
    #[serde(default)]
    pub chapter_images: Vec<ChapterImage>,
}

impl ImageManifest {
    pub fn total_images(&self) -> usize {
        self.chapter_images.len()
    }

    pub fn successful_images(&self) -> usize {
        self.chapter_images.iter().filter(|i| i.url.is_some()).count()
    }
}
