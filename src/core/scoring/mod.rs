//! Phase Quality Scoring
//!
//! Evaluates the recorded phase logs of a story against fixed rubrics
//! (one per phase, each summing to 10) and aggregates the five phase
//! scores into an overall report. Scoring never refuses incomplete
//! data: missing logs score low with issues attached, and
//! reconstructed logs score normally but carry a data-integrity flag.

pub mod batch;
mod phase0;
mod phase1;
mod phase2;
mod phase3;
mod phase4;
pub mod report;
pub mod types;

pub use batch::{analyze_recent, BatchAnalysis};
pub use report::{aggregate, OverallScoreReport};
pub use types::{CriterionScore, PhaseScore, ScoreContext};

use indexmap::IndexMap;

use crate::core::pipeline::logs::PhaseLog;
use crate::core::pipeline::phase::GenerationPhase;

/// Rubric-based scorer over phase logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score a single phase from its log (or its absence).
    pub fn score_phase(
        &self,
        phase: GenerationPhase,
        log: Option<&PhaseLog>,
        context: &ScoreContext,
    ) -> PhaseScore {
        let mut score = match phase {
            GenerationPhase::FairyTaleSelection => phase0::score(log, context),
            GenerationPhase::SkeletonGeneration => phase1::score(log, context),
            GenerationPhase::CharacterMatching => phase2::score(log, context),
            GenerationPhase::StoryFinalization => phase3::score(log, context),
            GenerationPhase::ImageGeneration => phase4::score(log, context),
            GenerationPhase::Complete | GenerationPhase::Error => PhaseScore::builder().finalize(),
        };
        if log.is_some_and(PhaseLog::is_reconstructed) {
            score.issues.push(
                "Phase log was reconstructed from persisted rows; durations and usage are approximate"
                    .to_string(),
            );
        }
        score
    }

    /// Score all five phases of one story and aggregate.
    pub fn score_story(&self, logs: &[PhaseLog], context: &ScoreContext) -> OverallScoreReport {
        let mut phases = IndexMap::new();
        for phase in GenerationPhase::PIPELINE {
            let key = phase.log_key().expect("pipeline phases have log keys");
            let log = logs.iter().find(|l| l.phase == key);
            phases.insert(key.to_string(), self.score_phase(phase, log, context));
        }
        report::aggregate(phases, context)
    }
}
