//! Personality Trait Data Models
//!
//! The trait structure is hierarchical: nine fixed base traits, each
//! with a value and an ordered map of open-ended subcategories.
//! Whenever a trait has subcategories, its value equals their sum;
//! the merge engine is the only mutation path and maintains this.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Base Traits
// ============================================================================

/// The closed set of base trait ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseTrait {
    Knowledge,
    Creativity,
    Vocabulary,
    Courage,
    Curiosity,
    Teamwork,
    Empathy,
    Persistence,
    Logic,
}

impl BaseTrait {
    /// All nine base traits in canonical order.
    pub const ALL: [BaseTrait; 9] = [
        Self::Knowledge,
        Self::Creativity,
        Self::Vocabulary,
        Self::Courage,
        Self::Curiosity,
        Self::Teamwork,
        Self::Empathy,
        Self::Persistence,
        Self::Logic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Creativity => "creativity",
            Self::Vocabulary => "vocabulary",
            Self::Courage => "courage",
            Self::Curiosity => "curiosity",
            Self::Teamwork => "teamwork",
            Self::Empathy => "empathy",
            Self::Persistence => "persistence",
            Self::Logic => "logic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "knowledge" => Some(Self::Knowledge),
            "creativity" => Some(Self::Creativity),
            "vocabulary" => Some(Self::Vocabulary),
            "courage" => Some(Self::Courage),
            "curiosity" => Some(Self::Curiosity),
            "teamwork" => Some(Self::Teamwork),
            "empathy" => Some(Self::Empathy),
            "persistence" => Some(Self::Persistence),
            "logic" => Some(Self::Logic),
            _ => None,
        }
    }

    /// Upper clamp for this trait family. The knowledge family grows
    /// an order of magnitude further than the behavioral traits.
    pub fn max_value(&self) -> i64 {
        match self {
            Self::Knowledge => 1000,
            _ => 100,
        }
    }
}

impl fmt::Display for BaseTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Trait State
// ============================================================================

/// Value and subcategories of one base trait.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitState {
    /// Aggregate value. Equals the subcategory sum whenever
    /// subcategories exist.
    pub value: i64,
    /// Open-ended subcategories ("physics", "biology", ...), in
    /// insertion order.
    #[serde(default)]
    pub subcategories: IndexMap<String, i64>,
}

impl TraitState {
    pub fn scalar(value: i64) -> Self {
        Self {
            value,
            subcategories: IndexMap::new(),
        }
    }

    /// Whether the sum invariant holds for this state.
    pub fn invariant_holds(&self) -> bool {
        if self.value < 0 {
            return false;
        }
        if self.subcategories.is_empty() {
            return true;
        }
        self.value == self.subcategories.values().sum::<i64>()
    }
}

// ============================================================================
// Personality Traits
// ============================================================================

/// The full trait mapping of one avatar.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonalityTraits {
    pub traits: IndexMap<BaseTrait, TraitState>,
}

impl PersonalityTraits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, base: BaseTrait) -> Option<&TraitState> {
        self.traits.get(&base)
    }

    /// Current aggregate value of a base trait (0 when absent).
    pub fn value(&self, base: BaseTrait) -> i64 {
        self.traits.get(&base).map(|t| t.value).unwrap_or(0)
    }

    /// Current value of a subcategory (None when absent).
    pub fn subcategory(&self, base: BaseTrait, sub: &str) -> Option<i64> {
        self.traits
            .get(&base)
            .and_then(|t| t.subcategories.get(sub))
            .copied()
    }

    /// Whether the sum invariant holds for every trait.
    pub fn invariant_holds(&self) -> bool {
        self.traits.values().all(TraitState::invariant_holds)
    }
}

// ============================================================================
// Changes
// ============================================================================

/// A requested signed change to one trait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitChange {
    /// Trait id: bare base id, an alias, or `base.subcategory`.
    #[serde(rename = "trait")]
    pub trait_id: String,
    /// Requested signed delta.
    pub delta: i64,
}

impl TraitChange {
    pub fn new(trait_id: impl Into<String>, delta: i64) -> Self {
        Self {
            trait_id: trait_id.into(),
            delta,
        }
    }
}

/// The realized effect of one applied change.
///
/// `actual_delta` is the post-clamp difference; reversal must negate
/// this, not the requested delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    /// Canonical trait id (`courage` or `knowledge.physics`).
    #[serde(rename = "trait")]
    pub trait_id: String,
    /// Requested signed delta.
    pub delta: i64,
    /// Realized signed delta after clamping.
    pub actual_delta: i64,
}
