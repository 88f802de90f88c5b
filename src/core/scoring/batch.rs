//! Batch Scoring
//!
//! The "analyze recent" workflow: score many historical stories as a
//! read-only fan-out with bounded concurrency. Stories that predate
//! live phase logging are scored on reconstructed logs. Issues and
//! recommendations are deduplicated across stories by set union;
//! per-story reports keep their full unduplicated lists.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use serde_json::json;

use crate::core::pipeline::context::StoryLength;
use crate::core::pipeline::errors::PipelineResult;
use crate::core::pipeline::logs::{reconstruct_logs, PhaseLog};
use crate::core::pipeline::phase::GenerationPhase;
use crate::database::models::StoryRecord;
use crate::database::phase_logs::PhaseLogOps;
use crate::database::stories::StoryOps;
use crate::database::Database;

use super::report::OverallScoreReport;
use super::types::{round1, ScoreContext};
use super::ScoringEngine;

/// Aggregate outcome of one batch run.
#[derive(Debug)]
pub struct BatchAnalysis {
    /// One report per scored story, newest first.
    pub reports: Vec<OverallScoreReport>,
    /// Issues across all stories, set-union deduplicated.
    pub distinct_issues: BTreeSet<String>,
    /// Recommendations across all stories, set-union deduplicated.
    pub distinct_recommendations: BTreeSet<String>,
    /// Mean of the overall scores, one decimal.
    pub average_overall: f64,
}

/// Score the most recent `limit` stories with at most `concurrency`
/// stories in flight. Performs no writes.
pub async fn analyze_recent(
    db: &Database,
    limit: u32,
    concurrency: usize,
) -> PipelineResult<BatchAnalysis> {
    let stories = db.list_recent_stories(limit).await?;
    log::info!(
        "Batch scoring {} stories (concurrency {})",
        stories.len(),
        concurrency.max(1)
    );

    let mut reports: Vec<OverallScoreReport> = stream::iter(stories)
        .map(|story| {
            let db = db.clone();
            async move {
                match score_story(&db, &story).await {
                    Ok(report) => Some(report),
                    Err(err) => {
                        log::warn!("Skipping story {} in batch scoring: {err}", story.id);
                        None
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|report| async move { report })
        .collect()
        .await;

    // buffer_unordered scrambles completion order; restore recency.
    reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.story_id.cmp(&b.story_id)));

    let mut distinct_issues = BTreeSet::new();
    let mut distinct_recommendations = BTreeSet::new();
    for report in &reports {
        for phase in report.phases.values() {
            distinct_issues.extend(phase.issues.iter().cloned());
            distinct_recommendations.extend(phase.recommendations.iter().cloned());
        }
    }

    let average_overall = if reports.is_empty() {
        0.0
    } else {
        round1(reports.iter().map(|r| r.overall_score).sum::<f64>() / reports.len() as f64)
    };

    Ok(BatchAnalysis {
        reports,
        distinct_issues,
        distinct_recommendations,
        average_overall,
    })
}

/// Score one story from its stored logs, reconstructing any missing
/// phase logs from the persisted rows.
pub async fn score_story(db: &Database, story: &StoryRecord) -> PipelineResult<OverallScoreReport> {
    let mut logs = db.logs_for_story(&story.id).await?;

    let missing: Vec<&'static str> = GenerationPhase::PIPELINE
        .iter()
        .filter_map(|p| p.log_key())
        .filter(|key| !logs.iter().any(|l| &l.phase == key))
        .collect();
    if !missing.is_empty() {
        log::debug!(
            "Story {}: reconstructing {} missing phase log(s)",
            story.id,
            missing.len()
        );
        let chapters = db.list_chapters(&story.id).await?;
        let reconstructed: Vec<PhaseLog> = reconstruct_logs(story, &chapters)
            .into_iter()
            .filter(|l| missing.contains(&l.phase.as_str()))
            .collect();
        logs.extend(reconstructed);
    }

    let context = ScoreContext {
        story_id: story.id.clone(),
        story_title: story.title.clone(),
        child_age: story.child_age as u8,
        genre: story.genre.clone(),
        length: parse_length(&story.length),
        config: json!({
            "genre": story.genre,
            "setting": story.setting,
            "length": story.length,
        }),
    };
    Ok(ScoringEngine::new().score_story(&logs, &context))
}

fn parse_length(s: &str) -> StoryLength {
    match s {
        "short" => StoryLength::Short,
        "long" => StoryLength::Long,
        _ => StoryLength::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("short"), StoryLength::Short);
        assert_eq!(parse_length("medium"), StoryLength::Medium);
        assert_eq!(parse_length("long"), StoryLength::Long);
        assert_eq!(parse_length("weird"), StoryLength::Medium);
    }
}
