//! Overall Score Reports
//!
//! Aggregates the five phase scores into the externally visible report
//! artifact. The report shape is a stable schema relied upon by
//! downstream analytics; change it deliberately.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::pipeline::phase::GenerationPhase;

use super::types::{round1, PhaseScore, ScoreContext};

/// The persisted per-story quality report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallScoreReport {
    pub test_id: String,
    pub timestamp: DateTime<Utc>,
    pub story_id: String,
    pub story_title: String,
    /// The story configuration the run used.
    pub config: serde_json::Value,
    /// Phase scores keyed "phase0".."phase4".
    pub phases: IndexMap<String, PhaseScore>,
    /// Arithmetic mean of the five phase scores, one decimal.
    pub overall_score: f64,
    /// Deterministic human-readable summary.
    pub summary: String,
}

/// Combine the five phase scores into one report.
pub fn aggregate(phases: IndexMap<String, PhaseScore>, context: &ScoreContext) -> OverallScoreReport {
    let overall_score = if phases.is_empty() {
        0.0
    } else {
        round1(phases.values().map(|p| p.score).sum::<f64>() / phases.len() as f64)
    };

    let mut parts = Vec::with_capacity(phases.len());
    for phase in GenerationPhase::PIPELINE {
        let Some(key) = phase.log_key() else { continue };
        if let Some(score) = phases.get(key) {
            parts.push(format!("{} {:.1}/10", phase.display_name(), score.score));
        }
    }
    let issue_count: usize = phases.values().map(|p| p.issues.len()).sum();
    let summary = format!(
        "Overall {overall_score:.1}/10 for \"{}\", {}, {issue_count} issue(s)",
        context.story_title,
        parts.join("; "),
    );

    OverallScoreReport {
        test_id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        story_id: context.story_id.clone(),
        story_title: context.story_title.clone(),
        config: context.config.clone(),
        phases,
        overall_score,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ScoreContext {
        ScoreContext {
            story_id: "story-1".to_string(),
            story_title: "Mia and the Moon Fox".to_string(),
            child_age: 7,
            genre: "adventure".to_string(),
            length: Default::default(),
            config: json!({"genre": "adventure"}),
        }
    }

    fn sheet(score: f64) -> PhaseScore {
        let mut sheet = PhaseScore::builder();
        sheet.criterion("only", score, 10.0, "fixture");
        sheet.finalize()
    }

    #[test]
    fn test_overall_is_mean_to_one_decimal() {
        let mut phases = IndexMap::new();
        phases.insert("phase0".to_string(), sheet(10.0));
        phases.insert("phase1".to_string(), sheet(9.0));
        phases.insert("phase2".to_string(), sheet(8.0));
        phases.insert("phase3".to_string(), sheet(7.5));
        phases.insert("phase4".to_string(), sheet(6.0));
        let report = aggregate(phases, &context());
        assert_eq!(report.overall_score, 8.1);
    }

    #[test]
    fn test_summary_is_deterministic() {
        let mut phases = IndexMap::new();
        for key in ["phase0", "phase1", "phase2", "phase3", "phase4"] {
            phases.insert(key.to_string(), sheet(8.0));
        }
        let a = aggregate(phases.clone(), &context());
        let b = aggregate(phases, &context());
        assert_eq!(a.summary, b.summary);
        assert!(a.summary.contains("Overall 8.0/10"));
        assert!(a.summary.contains("Fairy Tale Selection 8.0/10"));
    }

    #[test]
    fn test_report_serializes_stable_shape() {
        let mut phases = IndexMap::new();
        phases.insert("phase0".to_string(), sheet(8.0));
        let report = aggregate(phases, &context());
        let json = serde_json::to_value(&report).unwrap();
        for field in [
            "testId",
            "timestamp",
            "storyId",
            "storyTitle",
            "config",
            "phases",
            "overallScore",
            "summary",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
    }
}
