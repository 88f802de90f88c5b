//! Story Pipeline Orchestrator
//!
//! Runs the five generation phases strictly in order, carrying the
//! accumulated context forward and appending one durable phase log per
//! phase. External service failures (including timeouts) abort the
//! run: the story row is marked `error`, everything persisted so far
//! stays visible, and no rollback or retry happens here; retry policy
//! belongs to the services.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::core::characters::matching::{MatchContext, MatchingEngine};
use crate::core::characters::requirements::{AgeCategory, CharacterRequirement};
use crate::core::characters::types::{Candidate, CharacterAssignment};
use crate::core::personality::memory::{AvatarMemory, ContentType};
use crate::core::personality::merge;
use crate::core::personality::types::TraitChange;
use crate::core::services::{
    GenerationRequest, ImageDimensions, ImageGenerationService, ServiceError, SpeechItem,
    SpeechService, TextGenerationService,
};
use crate::database::avatars::AvatarOps;
use crate::database::characters::CharacterPoolOps;
use crate::database::models::{ChapterRecord, StoryRecord};
use crate::database::phase_logs::PhaseLogOps;
use crate::database::stories::StoryOps;
use crate::database::Database;

use super::context::{StoryContext, StoryRequest};
use super::errors::{PipelineError, PipelineResult};
use super::logs::PhaseLog;
use super::phase::GenerationPhase;
use super::prompts;
use super::skeleton::{
    ChapterImage, FairyTaleSelection, FinalChapter, FinalStory, ImageManifest, StorySkeleton,
};

// ============================================================================
// Pipeline Setup
// ============================================================================

/// The external collaborators a pipeline runs against.
#[derive(Clone)]
pub struct PipelineServices {
    pub text: Arc<dyn TextGenerationService>,
    pub images: Arc<dyn ImageGenerationService>,
    /// Narration is optional; stories work without audio.
    pub speech: Option<Arc<dyn SpeechService>>,
}

/// Outcome of one run. A run that hit a service failure still returns
/// a result: the terminal state, the error message, and every log
/// captured before the failure.
#[derive(Debug)]
pub struct StoryRunResult {
    pub story_id: String,
    pub status: GenerationPhase,
    pub error: Option<String>,
    pub context: StoryContext,
    pub logs: Vec<PhaseLog>,
}

/// The five-phase story generation pipeline.
pub struct StoryPipeline {
    db: Database,
    services: PipelineServices,
    config: GenerationConfig,
    engine: MatchingEngine,
}

impl StoryPipeline {
    pub fn new(db: Database, services: PipelineServices, config: GenerationConfig) -> Self {
        Self {
            db,
            services,
            config,
            engine: MatchingEngine::new(),
        }
    }

    // ========================================================================
    // Run
    // ========================================================================

    /// Execute one full story generation run.
    pub async fn run(&self, request: StoryRequest) -> PipelineResult<StoryRunResult> {
        let story_id = Uuid::new_v4().to_string();
        self.db
            .create_story(&StoryRecord::new_generating(&story_id, &request))
            .await?;
        log::info!(
            "Starting story run {story_id} for avatar {}",
            request.avatar.id
        );

        let mut context = StoryContext::default();
        let mut logs = Vec::new();

        match self
            .execute_phases(&story_id, &request, &mut context, &mut logs)
            .await
        {
            Ok(()) => {
                self.db.set_story_status(&story_id, "complete").await?;
                log::info!("Story run {story_id} complete");
                Ok(StoryRunResult {
                    story_id,
                    status: GenerationPhase::Complete,
                    error: None,
                    context,
                    logs,
                })
            }
            Err(PipelineError::Service(err)) => {
                // Phase-fatal: keep all partial data, mark the story.
                self.db.set_story_status(&story_id, "error").await?;
                log::error!("Story run {story_id} failed: {err}");
                Ok(StoryRunResult {
                    story_id,
                    status: GenerationPhase::Error,
                    error: Some(err.to_string()),
                    context,
                    logs,
                })
            }
            Err(other) => {
                self.db.set_story_status(&story_id, "error").await.ok();
                Err(other)
            }
        }
    }

    async fn execute_phases(
        &self,
        story_id: &str,
        request: &StoryRequest,
        context: &mut StoryContext,
        logs: &mut Vec<PhaseLog>,
    ) -> PipelineResult<()> {
        let mut state = GenerationPhase::FairyTaleSelection;

        if request.config.use_fairy_tale_template {
            context.fairy_tale = Some(self.phase0_select_fairy_tale(story_id, request, logs).await?);
        } else {
            log::info!("Story {story_id}: fairy tale selection skipped by preference");
        }
        advance(&mut state)?;

        context.skeleton = Some(self.phase1_generate_skeleton(story_id, request, context, logs).await?);
        advance(&mut state)?;

        let assignments = self.phase2_match_characters(story_id, request, context, logs).await?;
        advance(&mut state)?;

        context.final_story =
            Some(self.phase3_finalize_story(story_id, request, context, &assignments, logs).await?);
        advance(&mut state)?;

        context.images =
            Some(self.phase4_generate_images(story_id, request, context, &assignments, logs).await?);
        advance(&mut state)?;

        debug_assert_eq!(state, GenerationPhase::Complete);
        Ok(())
    }

    // ========================================================================
    // Phase 0: Fairy Tale Selection
    // ========================================================================

    async fn phase0_select_fairy_tale(
        &self,
        story_id: &str,
        request: &StoryRequest,
        logs: &mut Vec<PhaseLog>,
    ) -> PipelineResult<FairyTaleSelection> {
        let prompt = prompts::fairy_tale_selection_prompt(request);
        let response = self.generate_text(&prompt).await?;
        let payload = parse_json_payload(&response.text)
            .ok_or_else(|| PipelineError::malformed_response("phase0", "no JSON object found"))?;
        let selection: FairyTaleSelection = serde_json::from_value(payload.clone())?;

        self.append_log(
            logs,
            PhaseLog::live(
                story_id,
                GenerationPhase::FairyTaleSelection,
                json!({ "prompt": prompt }),
                json!({ "selection": payload, "usage": response.usage }),
                response.duration_ms,
            ),
        )
        .await?;
        log::info!(
            "Story {story_id}: selected fairy tale \"{}\" (score {:.2})",
            selection.title,
            selection.match_score
        );
        Ok(selection)
    }

    // ========================================================================
    // Phase 1: Skeleton Generation
    // ========================================================================

    async fn phase1_generate_skeleton(
        &self,
        story_id: &str,
        request: &StoryRequest,
        context: &StoryContext,
        logs: &mut Vec<PhaseLog>,
    ) -> PipelineResult<StorySkeleton> {
        let prompt = prompts::skeleton_prompt(request, context.fairy_tale.as_ref());
        let response = self.generate_text(&prompt).await?;
        let payload = parse_json_payload(&response.text)
            .ok_or_else(|| PipelineError::malformed_response("phase1", "no JSON object found"))?;
        let skeleton: StorySkeleton = serde_json::from_value(payload.clone())?;

        self.db
            .set_story_details(
                story_id,
                &skeleton.title,
                skeleton.chapters.len() as i64,
                context.fairy_tale.as_ref().map(|t| t.title.as_str()),
            )
            .await?;

        self.append_log(
            logs,
            PhaseLog::live(
                story_id,
                GenerationPhase::SkeletonGeneration,
                json!({ "prompt": prompt }),
                json!({ "skeleton": payload, "usage": response.usage }),
                response.duration_ms,
            ),
        )
        .await?;
        log::info!(
            "Story {story_id}: skeleton \"{}\" with {} chapters, {} supporting requirements",
            skeleton.title,
            skeleton.chapters.len(),
            skeleton.supporting_character_requirements.len()
        );
        Ok(skeleton)
    }

    // ========================================================================
    // Phase 2: Character Matching
    // ========================================================================

    async fn phase2_match_characters(
        &self,
        story_id: &str,
        request: &StoryRequest,
        context: &mut StoryContext,
        logs: &mut Vec<PhaseLog>,
    ) -> PipelineResult<Vec<CharacterAssignment>> {
        let skeleton = context.skeleton.as_ref().expect("phase 1 ran");
        let started = Instant::now();

        let mut requirements = vec![hero_requirement(request, skeleton)];
        requirements.extend(skeleton.supporting_character_requirements.iter().cloned());

        let mut candidates: Vec<Candidate> = self
            .db
            .list_active(Some(&request.config.setting))
            .await?
            .into_iter()
            .map(Candidate::Pool)
            .collect();
        candidates.push(Candidate::Avatar(request.avatar.clone()));

        let outcome = self.engine.match_requirements(
            &requirements,
            &candidates,
            &MatchContext::new(&request.config.setting),
        );

        // Commit usage counters for every assigned pool character.
        for id in &outcome.used_pool_ids {
            self.db.increment_usage(id).await?;
        }

        self.append_log(
            logs,
            PhaseLog::live(
                story_id,
                GenerationPhase::CharacterMatching,
                json!({
                    "requirements": requirements,
                    "heroPlaceholder": skeleton.hero_placeholder,
                }),
                serde_json::to_value(&outcome)?,
                started.elapsed().as_millis() as u64,
            ),
        )
        .await?;

        if !outcome.unmatched.is_empty() {
            log::warn!(
                "Story {story_id}: {} requirements left unmatched",
                outcome.unmatched.len()
            );
        }
        let assignments = outcome.assignments.clone();
        context.match_outcome = Some(outcome);
        Ok(assignments)
    }

    // ========================================================================
    // Phase 3: Story Finalization
    // ========================================================================

    async fn phase3_finalize_story(
        &self,
        story_id: &str,
        request: &StoryRequest,
        context: &StoryContext,
        assignments: &[CharacterAssignment],
        logs: &mut Vec<PhaseLog>,
    ) -> PipelineResult<FinalStory> {
        let skeleton = context.skeleton.as_ref().expect("phase 1 ran");
        let mut chapters = Vec::with_capacity(skeleton.chapters.len());
        let mut total_duration = 0u64;

        for outline in &skeleton.chapters {
            let prompt = prompts::chapter_prompt(request, skeleton, outline, assignments);
            let response = self.generate_text(&prompt).await?;
            total_duration += response.duration_ms;
            let payload = parse_json_payload(&response.text).ok_or_else(|| {
                PipelineError::malformed_response("phase3", "no JSON object found")
            })?;

            let title = payload["title"].as_str().unwrap_or(&outline.title).to_string();
            let text = payload["text"].as_str().unwrap_or_default().to_string();
            chapters.push(FinalChapter {
                index: outline.index,
                title,
                text,
                audio_url: None,
            });
        }

        let development = development_for_genre(&request.config.genre);
        self.apply_avatar_development(story_id, request, &development).await?;

        let story = FinalStory {
            title: skeleton.title.clone(),
            chapters,
            avatar_development: development,
            fairy_tale_title: context.fairy_tale.as_ref().map(|t| t.title.clone()),
            twist_summary: context.fairy_tale.as_ref().map(|_| {
                format!(
                    "Set in the {} instead of the original tale, with {} at the center",
                    request.config.setting, request.child.name
                )
            }),
        };

        for chapter in &story.chapters {
            self.db
                .upsert_chapter(&ChapterRecord {
                    id: format!("{story_id}-{}", chapter.index),
                    story_id: story_id.to_string(),
                    chapter_index: chapter.index as i64,
                    title: chapter.title.clone(),
                    text: chapter.text.clone(),
                    image_url: None,
                    image_prompt: None,
                    audio_url: None,
                })
                .await?;
        }

        self.append_log(
            logs,
            PhaseLog::live(
                story_id,
                GenerationPhase::StoryFinalization,
                json!({
                    "plannedChapters": skeleton.chapters.len(),
                    "fairyTaleTitle": story.fairy_tale_title,
                }),
                json!({ "story": story }),
                total_duration,
            ),
        )
        .await?;
        Ok(story)
    }

    /// Apply the story's trait development to the avatar and record
    /// the memory. Skipped with a warning when the avatar has no
    /// stored record (the development list still ships with the story).
    async fn apply_avatar_development(
        &self,
        story_id: &str,
        request: &StoryRequest,
        development: &[TraitChange],
    ) -> PipelineResult<()> {
        let avatar_id = request.avatar.id.as_str();
        let Some((_, traits)) = self.db.get_avatar(avatar_id).await? else {
            log::warn!("Story {story_id}: avatar {avatar_id} not stored; development not persisted");
            return Ok(());
        };

        let result = merge::apply_changes(&traits, development);
        for (change, err) in &result.rejected {
            log::warn!("Story {story_id}: dropped development '{}': {err}", change.trait_id);
        }
        self.db.update_traits(avatar_id, &result.traits).await?;

        let memory = AvatarMemory::new(avatar_id, story_id, ContentType::Story, result.applied);
        if !self.db.append_memory(&memory).await? {
            log::warn!(
                "Story {story_id}: memory {} already recorded; skipping re-application",
                memory.natural_key()
            );
        }
        Ok(())
    }

    // ========================================================================
    // Phase 4: Image Generation
    // ========================================================================

    async fn phase4_generate_images(
        &self,
        story_id: &str,
        request: &StoryRequest,
        context: &StoryContext,
        assignments: &[CharacterAssignment],
        logs: &mut Vec<PhaseLog>,
    ) -> PipelineResult<ImageManifest> {
        let story = context.final_story.as_ref().expect("phase 3 ran");
        let mut manifest = ImageManifest::default();
        let mut total_duration = 0u64;

        // Images fail per-item: one bad illustration degrades the
        // completion score instead of killing the run.
        for chapter in &story.chapters {
            let prompt = prompts::chapter_image_prompt(
                &request.config,
                &request.child,
                &chapter.title,
                assignments,
            );
            let result = self
                .timed(self.config.image_timeout_secs, async {
                    self.services.images.generate(&prompt, ImageDimensions::CHAPTER).await
                })
                .await;

            let image = match result {
                Ok(image) => {
                    total_duration += image.duration_ms;
                    self.db
                        .set_chapter_image(story_id, chapter.index as i64, &image.url, &prompt)
                        .await?;
                    ChapterImage {
                        chapter_index: chapter.index,
                        prompt,
                        url: Some(image.url),
                        error: None,
                    }
                }
                Err(err) => {
                    log::warn!("Story {story_id}: chapter {} image failed: {err}", chapter.index);
                    ChapterImage {
                        chapter_index: chapter.index,
                        prompt,
                        url: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            manifest.chapter_images.push(image);
        }

        let cover_prompt = prompts::cover_image_prompt(
            &request.config,
            &request.child,
            &story.title,
            assignments,
        );
        match self
            .timed(self.config.image_timeout_secs, async {
                self.services.images.generate(&cover_prompt, ImageDimensions::COVER).await
            })
            .await
        {
            Ok(image) => {
                total_duration += image.duration_ms;
                self.db.set_cover(story_id, &image.url).await?;
                manifest.cover_url = Some(image.url);
            }
            Err(err) => {
                log::warn!("Story {story_id}: cover image failed: {err}");
            }
        }
        manifest.cover_prompt = Some(cover_prompt);

        self.narrate_chapters(story_id, story).await?;

        self.append_log(
            logs,
            PhaseLog::live(
                story_id,
                GenerationPhase::ImageGeneration,
                json!({ "storyId": story_id, "chapterCount": story.chapters.len() }),
                json!({ "images": manifest }),
                total_duration,
            ),
        )
        .await?;
        Ok(manifest)
    }

    /// Batched narration; partial failure is expected and handled
    /// per item.
    async fn narrate_chapters(&self, story_id: &str, story: &FinalStory) -> PipelineResult<()> {
        let Some(speech) = &self.services.speech else {
            return Ok(());
        };
        let items: Vec<SpeechItem> = story
            .chapters
            .iter()
            .map(|c| SpeechItem::new(c.index.to_string(), c.text.clone()))
            .collect();

        let results = match self
            .timed(self.config.speech_timeout_secs, speech.synthesize(items))
            .await
        {
            Ok(results) => results,
            Err(err) => {
                log::warn!("Story {story_id}: narration batch failed: {err}");
                return Ok(());
            }
        };

        for result in results {
            match (&result.audio_url, result.id.parse::<i64>()) {
                (Some(url), Ok(index)) => {
                    self.db.set_chapter_audio(story_id, index, url).await?;
                }
                _ => {
                    log::warn!(
                        "Story {story_id}: narration item {} failed: {}",
                        result.id,
                        result.error.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn generate_text(
        &self,
        prompt: &str,
    ) -> Result<crate::core::services::GenerationResponse, ServiceError> {
        self.timed(
            self.config.text_timeout_secs,
            self.services
                .text
                .generate(GenerationRequest::new(prompt).with_temperature(0.7)),
        )
        .await
    }

    async fn timed<T>(
        &self,
        timeout_secs: u64,
        future: impl std::future::Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ServiceError> {
        match tokio::time::timeout(Duration::from_secs(timeout_secs), future).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout { timeout_secs }),
        }
    }

    async fn append_log(&self, logs: &mut Vec<PhaseLog>, log: PhaseLog) -> PipelineResult<()> {
        self.db.append_log(&log).await?;
        logs.push(log);
        Ok(())
    }
}

// ============================================================================
// Free Helpers
// ============================================================================

fn advance(state: &mut GenerationPhase) -> PipelineResult<()> {
    let next = state.next().ok_or_else(|| PipelineError::InvalidTransition {
        from: state.to_string(),
        to: "next".to_string(),
    })?;
    if !state.can_transition_to(next) {
        return Err(PipelineError::InvalidTransition {
            from: state.to_string(),
            to: next.to_string(),
        });
    }
    *state = next;
    Ok(())
}

/// The requirement the avatar fills: the hero slot, described from the
/// child profile so the matcher scores the avatar naturally.
fn hero_requirement(request: &StoryRequest, skeleton: &StorySkeleton) -> CharacterRequirement {
    CharacterRequirement::new(&skeleton.hero_placeholder, 0)
        .with_hints(format!(
            "{} year old human child named {}",
            request.child.age_years, request.child.name
        ))
        .with_age_category(AgeCategory::from_years(request.child.age_years))
}

/// Trait development a completed story of this genre grants.
fn development_for_genre(genre: &str) -> Vec<TraitChange> {
    match genre.to_lowercase().as_str() {
        "adventure" => vec![
            TraitChange::new("courage", 3),
            TraitChange::new("curiosity", 2),
            TraitChange::new("persistence", 1),
        ],
        "friendship" => vec![
            TraitChange::new("empathy", 3),
            TraitChange::new("teamwork", 2),
        ],
        "mystery" => vec![
            TraitChange::new("logic", 3),
            TraitChange::new("curiosity", 2),
        ],
        "wonder" | "fantasy" => vec![
            TraitChange::new("creativity", 3),
            TraitChange::new("vocabulary", 1),
        ],
        "nature" => vec![
            TraitChange::new("knowledge.biology", 5),
            TraitChange::new("curiosity", 1),
        ],
        _ => vec![
            TraitChange::new("creativity", 2),
            TraitChange::new("vocabulary", 1),
        ],
    }
}

/// Extract the first JSON object from generated text, tolerating code
/// fences and prose around it.
fn parse_json_payload(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}
