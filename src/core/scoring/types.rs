//! Scoring Data Models
//!
//! A phase score is the sum of independently computed, individually
//! capped criterion scores, rounded to one decimal and clamped to
//! [0, 10]. Issues and recommendations accumulate per phase without
//! deduplication; cross-story dedup happens only in the batch
//! aggregate.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::pipeline::context::StoryLength;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// Criterion and Phase Scores
// ============================================================================

/// One scored rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    pub score: f64,
    pub max_score: f64,
    pub reason: String,
}

/// Quality score of one pipeline phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseScore {
    pub score: f64,
    pub max_score: f64,
    /// Per-criterion breakdown, in rubric order.
    pub details: IndexMap<String, CriterionScore>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl PhaseScore {
    /// Start an empty score sheet; call [`PhaseScore::finalize`] after
    /// all criteria are recorded.
    pub fn builder() -> Self {
        Self {
            score: 0.0,
            max_score: 10.0,
            details: IndexMap::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// Record one criterion. The score is capped at the criterion's
    /// own max and floored at 0.
    pub fn criterion(
        &mut self,
        name: &str,
        score: f64,
        max_score: f64,
        reason: impl Into<String>,
    ) {
        self.details.insert(
            name.to_string(),
            CriterionScore {
                score: score.clamp(0.0, max_score),
                max_score,
                reason: reason.into(),
            },
        );
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.issues.push(text.into());
    }

    pub fn recommend(&mut self, text: impl Into<String>) {
        self.recommendations.push(text.into());
    }

    /// Sum, round, and clamp the total.
    pub fn finalize(mut self) -> Self {
        let total: f64 = self.details.values().map(|c| c.score).sum();
        self.score = round1(total.clamp(0.0, self.max_score));
        self
    }
}

// ============================================================================
// Scoring Context
// ============================================================================

/// Story-level facts the rubrics need beyond the phase logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreContext {
    pub story_id: String,
    pub story_title: String,
    /// Age of the child the story targets.
    pub child_age: u8,
    pub genre: String,
    #[serde(default)]
    pub length: StoryLength,
    /// The full story configuration, carried into the report.
    #[serde(default)]
    pub config: serde_json::Value,
}
