//! End-to-end pipeline runs against an in-memory store and mock
//! generation collaborators.

mod common;

use std::sync::Arc;

use fableweaver::config::GenerationConfig;
use fableweaver::core::characters::catalog::seed_catalog;
use fableweaver::core::personality::merge;
use fableweaver::core::personality::types::{BaseTrait, PersonalityTraits};
use fableweaver::core::pipeline::{GenerationPhase, PipelineServices, StoryPipeline};
use fableweaver::database::avatars::AvatarOps;
use fableweaver::database::characters::CharacterPoolOps;
use fableweaver::database::phase_logs::PhaseLogOps;
use fableweaver::database::stories::StoryOps;
use fableweaver::database::Database;

use common::{avatar, request, MockImageService, MockSpeechService, MockTextService};

async fn pipeline_with(db: &Database, text: MockTextService) -> StoryPipeline {
    db.seed(seed_catalog()).await.unwrap();
    let traits = merge::normalize(&PersonalityTraits::new());
    db.save_avatar(&avatar(), &traits).await.unwrap();

    StoryPipeline::new(
        db.clone(),
        PipelineServices {
            text: Arc::new(text),
            images: Arc::new(MockImageService::reliable()),
            speech: Some(Arc::new(MockSpeechService)),
        },
        GenerationConfig::default(),
    )
}

#[tokio::test]
async fn test_full_run_completes_with_all_phase_logs() {
    let db = Database::open_in_memory().await.unwrap();
    let pipeline = pipeline_with(&db, MockTextService::reliable()).await;

    let result = pipeline.run(request(true)).await.unwrap();
    assert_eq!(result.status, GenerationPhase::Complete);
    assert!(result.error.is_none());

    let keys: Vec<_> = result.logs.iter().map(|l| l.phase.as_str()).collect();
    assert_eq!(keys, vec!["phase0", "phase1", "phase2", "phase3", "phase4"]);
    assert!(result.logs.iter().all(|l| !l.is_reconstructed()));

    let story = db.get_story(&result.story_id).await.unwrap().unwrap();
    assert_eq!(story.status, "complete");
    assert_eq!(story.title, "Mia and the Moon Fox");
    assert_eq!(story.planned_chapters, 5);
    assert_eq!(story.fairy_tale_title.as_deref(), Some("The Star Coins"));
    assert!(story.cover_url.is_some());

    let chapters = db.list_chapters(&result.story_id).await.unwrap();
    assert_eq!(chapters.len(), 5);
    assert!(chapters.iter().all(|c| !c.text.is_empty()));
    assert!(chapters.iter().all(|c| c.image_url.is_some()));
    // Per-item speech failure: the last chapter has no narration
    assert!(chapters[0].audio_url.is_some());
    assert!(chapters[4].audio_url.is_none());
}

#[tokio::test]
async fn test_skipping_fairy_tale_selection_is_normal() {
    let db = Database::open_in_memory().await.unwrap();
    let pipeline = pipeline_with(&db, MockTextService::reliable()).await;

    let result = pipeline.run(request(false)).await.unwrap();
    assert_eq!(result.status, GenerationPhase::Complete);
    assert!(result.context.fairy_tale.is_none());

    let keys: Vec<_> = result.logs.iter().map(|l| l.phase.as_str()).collect();
    assert_eq!(keys, vec!["phase1", "phase2", "phase3", "phase4"]);
}

#[tokio::test]
async fn test_matching_assigns_avatar_and_pool_characters() {
    let db = Database::open_in_memory().await.unwrap();
    let pipeline = pipeline_with(&db, MockTextService::reliable()).await;

    let result = pipeline.run(request(false)).await.unwrap();
    let outcome = result.context.match_outcome.unwrap();

    // Hero, guide, companion all filled
    assert_eq!(outcome.assignments.len(), 3);
    assert!(outcome.unmatched.is_empty());

    let hero = outcome
        .assignments
        .iter()
        .find(|a| a.placeholder == "{{HERO}}")
        .unwrap();
    assert!(hero.character.is_avatar);
    assert_eq!(hero.character.name, "Mia");

    let guide = outcome
        .assignments
        .iter()
        .find(|a| a.placeholder == "{{GUIDE}}")
        .unwrap();
    // "alter mensch, weise" in a forest must resolve to a human elder
    assert_eq!(guide.character.species.as_str(), "human");
    assert!(!guide.character.is_avatar);

    // No character id used twice
    let mut ids: Vec<_> = outcome.assignments.iter().map(|a| a.character.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), outcome.assignments.len());
}

#[tokio::test]
async fn test_usage_counters_committed_for_pool_characters() {
    let db = Database::open_in_memory().await.unwrap();
    let pipeline = pipeline_with(&db, MockTextService::reliable()).await;

    let result = pipeline.run(request(false)).await.unwrap();
    let outcome = result.context.match_outcome.unwrap();

    for id in &outcome.used_pool_ids {
        let character = db.get_character(id).await.unwrap().unwrap();
        assert_eq!(character.recent_usage_count, 1);
        assert_eq!(character.total_usage_count, 1);
        assert!(character.last_used_at.is_some());
    }
    // The avatar never gets a usage commit
    assert!(outcome.used_pool_ids.iter().all(|id| id.as_str() != "avatar-mia"));
}

#[tokio::test]
async fn test_avatar_development_applied_and_memorized() {
    let db = Database::open_in_memory().await.unwrap();
    let pipeline = pipeline_with(&db, MockTextService::reliable()).await;

    let result = pipeline.run(request(false)).await.unwrap();

    // Adventure grants courage and curiosity
    let (_, traits) = db.get_avatar("avatar-mia").await.unwrap().unwrap();
    assert_eq!(traits.value(BaseTrait::Courage), 3);
    assert_eq!(traits.value(BaseTrait::Curiosity), 2);
    assert!(traits.invariant_holds());

    let memories = db.list_memories("avatar-mia").await.unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].content_id, result.story_id);
}

#[tokio::test]
async fn test_service_failure_transitions_to_error_and_keeps_partials() {
    let db = Database::open_in_memory().await.unwrap();
    // Chapters fail; everything before phase 3 succeeds
    let pipeline = pipeline_with(&db, MockTextService::failing_on("Write chapter")).await;

    let result = pipeline.run(request(false)).await.unwrap();
    assert_eq!(result.status, GenerationPhase::Error);
    assert!(result.error.as_deref().unwrap().contains("503"));

    // Logs captured before the failure are retained
    let keys: Vec<_> = result.logs.iter().map(|l| l.phase.as_str()).collect();
    assert_eq!(keys, vec!["phase1", "phase2"]);
    let stored = db.logs_for_story(&result.story_id).await.unwrap();
    assert_eq!(stored.len(), 2);

    // The story row stays visible with an error status
    let story = db.get_story(&result.story_id).await.unwrap().unwrap();
    assert_eq!(story.status, "error");
}

#[tokio::test]
async fn test_image_failures_degrade_without_aborting() {
    let db = Database::open_in_memory().await.unwrap();
    db.seed(seed_catalog()).await.unwrap();
    db.save_avatar(&avatar(), &merge::normalize(&PersonalityTraits::new()))
        .await
        .unwrap();
    let pipeline = StoryPipeline::new(
        db.clone(),
        PipelineServices {
            text: Arc::new(MockTextService::reliable()),
            images: Arc::new(MockImageService { fail_all: true }),
            speech: None,
        },
        GenerationConfig::default(),
    );

    // Image errors are per-item: the run still completes
    let result = pipeline.run(request(false)).await.unwrap();
    assert_eq!(result.status, GenerationPhase::Complete);

    let manifest = result.context.images.unwrap();
    assert_eq!(manifest.total_images(), 5);
    assert_eq!(manifest.successful_images(), 0);
    assert!(manifest.cover_url.is_none());
    assert!(manifest.chapter_images.iter().all(|i| i.error.is_some()));

    let story = db.get_story(&result.story_id).await.unwrap().unwrap();
    assert_eq!(story.status, "complete");
    assert!(story.cover_url.is_none());
}

#[tokio::test]
async fn test_independent_runs_share_usage_counters() {
    let db = Database::open_in_memory().await.unwrap();
    let pipeline = pipeline_with(&db, MockTextService::reliable()).await;

    let first = pipeline.run(request(false)).await.unwrap();
    let second = pipeline.run(request(false)).await.unwrap();
    assert_eq!(first.status, GenerationPhase::Complete);
    assert_eq!(second.status, GenerationPhase::Complete);

    // A pool character used in both runs accumulated both commits
    let outcome = second.context.match_outcome.unwrap();
    let repeated = outcome
        .used_pool_ids
        .iter()
        .find(|id| {
            first
                .context
                .match_outcome
                .as_ref()
                .unwrap()
                .used_pool_ids
                .contains(id)
        })
        .cloned();
    if let Some(id) = repeated {
        let character = db.get_character(&id).await.unwrap().unwrap();
        assert_eq!(character.total_usage_count, 2);
    }
}
