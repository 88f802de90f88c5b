//! Character Requirements
//!
//! Requirement records extracted from a generated story skeleton, plus
//! the cue-word parsing that turns free-text visual hints into
//! matchable attributes. Hints arrive in German or English depending
//! on the story language, so both cue sets are carried.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::SpeciesClass;

// ============================================================================
// Placeholder Validation
// ============================================================================

/// Placeholder tokens look like `{{FOREST_GUIDE}}`.
pub const PLACEHOLDER_PATTERN: &str = r"^\{\{[A-Z_]+\}\}$";

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid pattern"))
}

/// Whether a placeholder token is well-formed.
pub fn is_valid_placeholder(token: &str) -> bool {
    placeholder_re().is_match(token)
}

// ============================================================================
// Requirement Attributes
// ============================================================================

/// Coarse age band used for matching and prompt construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    Child,
    Teen,
    Adult,
    Elder,
}

impl AgeCategory {
    /// Band a concrete age falls into.
    pub fn from_years(years: u8) -> Self {
        match years {
            0..=12 => Self::Child,
            13..=19 => Self::Teen,
            20..=59 => Self::Adult,
            _ => Self::Elder,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Teen => "teen",
            Self::Adult => "adult",
            Self::Elder => "elder",
        }
    }
}

/// Gender constraint on a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenderRequirement {
    Male,
    Female,
    #[default]
    Any,
}

// ============================================================================
// Requirement Record
// ============================================================================

/// One character slot extracted from a story skeleton.
///
/// Ephemeral; scoped to a single generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRequirement {
    /// Placeholder token (`{{UPPER_SNAKE}}`).
    pub placeholder: String,
    /// Free-text appearance and nature hints from the skeleton.
    #[serde(default)]
    pub visual_hints: String,
    /// Requested age band, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_category: Option<AgeCategory>,
    /// Requested minimum age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range_min: Option<u8>,
    /// Requested maximum age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range_max: Option<u8>,
    /// Gender constraint.
    #[serde(default)]
    pub gender: GenderRequirement,
    /// Chapter the character first appears in.
    #[serde(default)]
    pub chapter_index: u32,
}

impl CharacterRequirement {
    pub fn new(placeholder: impl Into<String>, chapter_index: u32) -> Self {
        Self {
            placeholder: placeholder.into(),
            visual_hints: String::new(),
            age_category: None,
            age_range_min: None,
            age_range_max: None,
            gender: GenderRequirement::Any,
            chapter_index,
        }
    }

    pub fn with_hints(mut self, hints: impl Into<String>) -> Self {
        self.visual_hints = hints.into();
        self
    }

    pub fn with_age_category(mut self, category: AgeCategory) -> Self {
        self.age_category = Some(category);
        self
    }

    pub fn with_gender(mut self, gender: GenderRequirement) -> Self {
        self.gender = gender;
        self
    }

    /// Whether the placeholder token is well-formed.
    pub fn has_valid_placeholder(&self) -> bool {
        is_valid_placeholder(&self.placeholder)
    }

    /// Effective age constraint: explicit category wins, otherwise the
    /// band containing the midpoint of the requested range.
    pub fn effective_age_category(&self) -> Option<AgeCategory> {
        if self.age_category.is_some() {
            return self.age_category;
        }
        match (self.age_range_min, self.age_range_max) {
            (Some(min), Some(max)) => Some(AgeCategory::from_years(min / 2 + max / 2)),
            (Some(min), None) => Some(AgeCategory::from_years(min)),
            (None, Some(max)) => Some(AgeCategory::from_years(max)),
            (None, None) => None,
        }
    }

    /// Species class the visual hints ask for, if any cue word matches.
    pub fn hinted_species(&self) -> Option<SpeciesClass> {
        detect_species(&self.visual_hints)
    }

    /// Age band the visual hints ask for ("alt", "old", "young", ...).
    pub fn hinted_age(&self) -> Option<AgeCategory> {
        detect_age(&self.visual_hints)
    }
}

// ============================================================================
// Cue-Word Detection
// ============================================================================

/// Species cue words, German and English. First match wins within a
/// class; classes are checked animal → fantasy → human so that
/// "fuchsmensch" style compounds lean toward the more specific cue.
const ANIMAL_CUES: &[&str] = &[
    "tier", "animal", "fuchs", "fox", "bär", "bear", "hase", "rabbit", "eule", "owl", "wolf",
    "katze", "cat", "hund", "dog", "maus", "mouse", "igel", "hedgehog", "reh", "deer", "vogel",
    "bird", "eichhörnchen", "squirrel",
];

const FANTASY_CUES: &[&str] = &[
    "drache", "dragon", "fee", "fairy", "elf", "elfe", "zwerg", "dwarf", "riese", "giant",
    "einhorn", "unicorn", "kobold", "goblin", "geist", "ghost", "troll", "magisch", "magical",
    "sprite", "zauberwesen",
];

const HUMAN_CUES: &[&str] = &[
    "mensch", "human", "frau", "woman", "mann", "man", "junge", "boy", "mädchen", "girl",
    "großvater", "grandfather", "großmutter", "grandmother", "kind", "child", "person",
];

const ELDER_CUES: &[&str] = &[
    "alt", "alte", "alter", "alten", "old", "weise", "wise", "greis", "elderly", "ancient",
];
const CHILD_CUES: &[&str] = &[
    "jung", "junge", "junges", "young", "klein", "kleine", "kleiner", "little", "kind", "child",
];

fn contains_cue(text: &str, cues: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|word| cues.contains(&word))
}

/// Detect the species class a hint string asks for.
pub fn detect_species(hints: &str) -> Option<SpeciesClass> {
    let lower = hints.to_lowercase();
    if contains_cue(&lower, ANIMAL_CUES) {
        Some(SpeciesClass::Animal)
    } else if contains_cue(&lower, FANTASY_CUES) {
        Some(SpeciesClass::Fantasy)
    } else if contains_cue(&lower, HUMAN_CUES) {
        Some(SpeciesClass::Human)
    } else {
        None
    }
}

/// Detect an age band from hint words.
pub fn detect_age(hints: &str) -> Option<AgeCategory> {
    let lower = hints.to_lowercase();
    if contains_cue(&lower, ELDER_CUES) {
        Some(AgeCategory::Elder)
    } else if contains_cue(&lower, CHILD_CUES) {
        Some(AgeCategory::Child)
    } else {
        None
    }
}
