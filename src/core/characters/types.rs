//! Character Pool Data Models
//!
//! Defines the core types for pool characters and user avatars,
//! including the typed visual profile variants and the assignment
//! snapshot produced by the matching engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use uuid::Uuid;

use super::requirements::{AgeCategory, GenderRequirement};

// ============================================================================
// Newtype ID Wrapper
// ============================================================================

/// Strongly-typed wrapper for character IDs.
///
/// Covers both pool template ids and avatar ids so the uniqueness
/// invariant of a matching run can be checked over one id space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
    /// Create a new CharacterId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random CharacterId using UUID v4.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for CharacterId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CharacterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for CharacterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Roles and Species
// ============================================================================

/// Narrative role a pool character is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterRole {
    /// Mentor figures that lead the hero through the story.
    Guide,
    /// Sidekicks that accompany the hero.
    Companion,
    /// Characters met along the way.
    Discovery,
    /// Antagonists and rivals.
    Obstacle,
    /// Background helpers.
    Support,
    /// One-off specials (seasonal, licensed).
    Special,
}

impl CharacterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guide => "guide",
            Self::Companion => "companion",
            Self::Discovery => "discovery",
            Self::Obstacle => "obstacle",
            Self::Support => "support",
            Self::Special => "special",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "guide" => Some(Self::Guide),
            "companion" => Some(Self::Companion),
            "discovery" => Some(Self::Discovery),
            "obstacle" => Some(Self::Obstacle),
            "support" => Some(Self::Support),
            "special" => Some(Self::Special),
            _ => None,
        }
    }
}

impl fmt::Display for CharacterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse species classification used for hint matching and the
/// diversity criterion in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesClass {
    Human,
    Animal,
    Fantasy,
}

impl SpeciesClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Animal => "animal",
            Self::Fantasy => "fantasy",
        }
    }
}

impl fmt::Display for SpeciesClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Character gender as stored on pool templates and avatars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Neutral,
}

impl Gender {
    /// Whether this gender satisfies a requirement.
    pub fn satisfies(&self, requirement: GenderRequirement) -> bool {
        match requirement {
            GenderRequirement::Any => true,
            GenderRequirement::Male => *self == Gender::Male,
            GenderRequirement::Female => *self == Gender::Female,
        }
    }
}

// ============================================================================
// Visual Profiles
// ============================================================================

/// Typed appearance profile. Each variant only carries the fields that
/// exist for that kind of character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VisualProfile {
    #[serde(rename_all = "camelCase")]
    Human {
        age_years: u8,
        hair: String,
        eyes: String,
        clothing: String,
    },
    #[serde(rename_all = "camelCase")]
    Animal {
        species: String,
        coat: String,
        size: String,
    },
    #[serde(rename_all = "camelCase")]
    Fantasy {
        #[serde(rename = "creatureKind")]
        kind: String,
        palette: String,
        aura: String,
    },
}

impl VisualProfile {
    /// Coarse species classification of this profile.
    pub fn species_class(&self) -> SpeciesClass {
        match self {
            Self::Human { .. } => SpeciesClass::Human,
            Self::Animal { .. } => SpeciesClass::Animal,
            Self::Fantasy { .. } => SpeciesClass::Fantasy,
        }
    }

    /// Concrete species descriptor ("human", "fox", "dragon").
    pub fn species_descriptor(&self) -> &str {
        match self {
            Self::Human { .. } => "human",
            Self::Animal { species, .. } => species,
            Self::Fantasy { kind, .. } => kind,
        }
    }

    /// Age category, when the profile carries an age (humans only).
    pub fn age_category(&self) -> Option<AgeCategory> {
        match self {
            Self::Human { age_years, .. } => Some(AgeCategory::from_years(*age_years)),
            _ => None,
        }
    }

    /// One-line appearance summary for prompt construction.
    pub fn summary(&self) -> String {
        match self {
            Self::Human {
                age_years,
                hair,
                eyes,
                clothing,
            } => format!("{age_years}-year-old human, {hair} hair, {eyes} eyes, wearing {clothing}"),
            Self::Animal { species, coat, size } => format!("{size} {species} with {coat}"),
            Self::Fantasy { kind, palette, aura } => format!("{kind} in {palette} tones, {aura} aura"),
        }
    }
}

// ============================================================================
// Pool Template
// ============================================================================

/// A reusable pre-built character from the shared pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterTemplate {
    /// Unique identifier.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Narrative role the character is built for.
    pub role: CharacterRole,
    /// Archetype label ("wise mentor", "trickster").
    pub archetype: String,
    /// Emotional-nature descriptor used in prompts.
    pub emotional_nature: String,
    /// Character gender.
    #[serde(default)]
    pub gender: Gender,
    /// Typed appearance profile.
    pub visual_profile: VisualProfile,
    /// Reference image, if one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Screen-time weight (0-100) this character consumes in a chapter.
    pub max_screen_time: u8,
    /// Chapter indices the character may appear in. Empty = all.
    #[serde(default)]
    pub available_chapters: Vec<u32>,
    /// Story settings the character fits. Empty = all.
    #[serde(default)]
    pub canon_settings: Vec<String>,
    /// Uses within the rolling recency window.
    #[serde(default)]
    pub recent_usage_count: u32,
    /// Uses since the character was seeded.
    #[serde(default)]
    pub total_usage_count: u32,
    /// Last time the character appeared in a story.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Soft-delete flag; inactive characters are never matched.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl CharacterTemplate {
    /// Whether the template may appear in the given chapter.
    pub fn available_in_chapter(&self, chapter_index: u32) -> bool {
        self.available_chapters.is_empty() || self.available_chapters.contains(&chapter_index)
    }

    /// Whether the template fits the given story setting.
    pub fn fits_setting(&self, setting: &str) -> bool {
        self.canon_settings.is_empty()
            || self
                .canon_settings
                .iter()
                .any(|s| s.eq_ignore_ascii_case(setting))
    }
}

// ============================================================================
// Avatar Snapshot
// ============================================================================

/// The matching-relevant view of a user avatar.
///
/// Avatars carry evolving personality state elsewhere; the matcher only
/// needs identity and appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarSnapshot {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    pub visual_profile: VisualProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// ============================================================================
// Candidates and Assignments
// ============================================================================

/// A matchable character: pool template or user avatar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Candidate {
    Pool(CharacterTemplate),
    Avatar(AvatarSnapshot),
}

impl Candidate {
    pub fn id(&self) -> &CharacterId {
        match self {
            Self::Pool(t) => &t.id,
            Self::Avatar(a) => &a.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Pool(t) => &t.name,
            Self::Avatar(a) => &a.name,
        }
    }

    pub fn gender(&self) -> Gender {
        match self {
            Self::Pool(t) => t.gender,
            Self::Avatar(a) => a.gender,
        }
    }

    pub fn visual_profile(&self) -> &VisualProfile {
        match self {
            Self::Pool(t) => &t.visual_profile,
            Self::Avatar(a) => &a.visual_profile,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Pool(t) => t.image_url.as_deref(),
            Self::Avatar(a) => a.image_url.as_deref(),
        }
    }

    pub fn is_avatar(&self) -> bool {
        matches!(self, Self::Avatar(_))
    }

    /// Screen-time weight consumed in a chapter. Avatars are the hero
    /// and are never budget-limited.
    pub fn max_screen_time(&self) -> u8 {
        match self {
            Self::Pool(t) => t.max_screen_time,
            Self::Avatar(_) => 0,
        }
    }

    pub fn recent_usage_count(&self) -> u32 {
        match self {
            Self::Pool(t) => t.recent_usage_count,
            Self::Avatar(_) => 0,
        }
    }

    pub fn total_usage_count(&self) -> u32 {
        match self {
            Self::Pool(t) => t.total_usage_count,
            Self::Avatar(_) => 0,
        }
    }
}

/// Snapshot of a resolved character carried into prompt construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCharacter {
    pub id: CharacterId,
    pub name: String,
    pub species: SpeciesClass,
    /// Concrete descriptor ("human", "fox", "dragon").
    pub species_descriptor: String,
    pub gender: Gender,
    pub visual_profile: VisualProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// True when the resolved character is a user avatar.
    pub is_avatar: bool,
}

impl From<&Candidate> for ResolvedCharacter {
    fn from(candidate: &Candidate) -> Self {
        let profile = candidate.visual_profile();
        Self {
            id: candidate.id().clone(),
            name: candidate.name().to_string(),
            species: profile.species_class(),
            species_descriptor: profile.species_descriptor().to_string(),
            gender: candidate.gender(),
            visual_profile: profile.clone(),
            image_url: candidate.image_url().map(String::from),
            is_avatar: candidate.is_avatar(),
        }
    }
}

/// Pairing of one requirement with one resolved character.
///
/// Produced exactly once per matched requirement; never mutated after
/// creation. Unmatched requirements yield no assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterAssignment {
    /// The skeleton placeholder this assignment fills.
    pub placeholder: String,
    /// Chapter the requirement targets.
    pub chapter_index: u32,
    /// The resolved character snapshot.
    pub character: ResolvedCharacter,
    /// Soft-match score the winning candidate achieved.
    pub match_score: f64,
}
