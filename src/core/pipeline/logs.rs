//! Phase Logs
//!
//! Every phase appends one durable log entry: the request/response
//! snapshot plus duration. The scoring engine reads these logs, never
//! the live pipeline state. When live logs are missing (older stories,
//! or a logging failure at generation time), an approximate log can be
//! reconstructed from persisted story and chapter rows. Reconstructed
//! logs are explicitly tagged because the fabricated zero-duration and
//! zero-usage fields must never be mistaken for measurements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{ChapterRecord, StoryRecord};

use super::phase::GenerationPhase;

// ============================================================================
// Provenance
// ============================================================================

/// Where a phase log came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogProvenance {
    /// Captured during the run.
    Live,
    /// Rebuilt best-effort from persisted rows.
    Reconstructed,
}

// ============================================================================
// Log Record
// ============================================================================

/// Snapshot of one phase's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseLog {
    pub id: String,
    pub story_id: String,
    /// Stable phase key ("phase0".."phase4").
    pub phase: String,
    pub provenance: LogProvenance,
    pub request: Value,
    pub response: Value,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl PhaseLog {
    /// A log captured during a live run.
    pub fn live(
        story_id: impl Into<String>,
        phase: GenerationPhase,
        request: Value,
        response: Value,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            story_id: story_id.into(),
            phase: phase.log_key().unwrap_or("unknown").to_string(),
            provenance: LogProvenance::Live,
            request,
            response,
            duration_ms,
            created_at: Utc::now(),
        }
    }

    /// An approximate log rebuilt from persisted rows. Duration is
    /// always 0; provenance is the distinguishing marker.
    pub fn reconstructed(
        story_id: impl Into<String>,
        phase: GenerationPhase,
        request: Value,
        response: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            story_id: story_id.into(),
            phase: phase.log_key().unwrap_or("unknown").to_string(),
            provenance: LogProvenance::Reconstructed,
            request,
            response,
            duration_ms: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_reconstructed(&self) -> bool {
        self.provenance == LogProvenance::Reconstructed
    }
}

// ============================================================================
// Best-Effort Reconstruction
// ============================================================================

/// Rebuild approximate phase logs for a story whose live logs are
/// missing. Lossy by design: requirements, assignments, usage, and
/// durations are unrecoverable and come back empty or zero.
pub fn reconstruct_logs(story: &StoryRecord, chapters: &[ChapterRecord]) -> Vec<PhaseLog> {
    let mut logs = Vec::with_capacity(5);

    // Phase 0: only the chosen title survives in the story row.
    let selection = story.fairy_tale_title.as_ref().map(|title| {
        json!({
            "fairyTaleId": "",
            "title": title,
            "matchScore": 0.0,
            "matchReason": "",
            "ageMin": 0,
            "ageMax": 0,
            "genre": story.genre,
        })
    });
    logs.push(PhaseLog::reconstructed(
        &story.id,
        GenerationPhase::FairyTaleSelection,
        json!({ "storyId": story.id }),
        json!({ "selection": selection }),
    ));

    // Phase 1: chapter outlines from the persisted chapter rows.
    let outlines: Vec<Value> = chapters
        .iter()
        .map(|c| {
            json!({
                "index": c.chapter_index,
                "title": c.title,
                "synopsis": "",
                "placeholders": [],
            })
        })
        .collect();
    logs.push(PhaseLog::reconstructed(
        &story.id,
        GenerationPhase::SkeletonGeneration,
        json!({ "storyId": story.id }),
        json!({
            "skeleton": {
                "title": story.title,
                "heroPlaceholder": "{{HERO}}",
                "chapters": outlines,
            }
        }),
    ));

    // Phase 2: assignments are not persisted outside the live log.
    logs.push(PhaseLog::reconstructed(
        &story.id,
        GenerationPhase::CharacterMatching,
        json!({ "requirements": [], "heroPlaceholder": "{{HERO}}" }),
        json!({ "assignments": [], "unmatched": [], "issues": [] }),
    ));

    // Phase 3: final chapters from the rows; development unrecoverable.
    let final_chapters: Vec<Value> = chapters
        .iter()
        .map(|c| {
            json!({
                "index": c.chapter_index,
                "title": c.title,
                "text": c.text,
            })
        })
        .collect();
    logs.push(PhaseLog::reconstructed(
        &story.id,
        GenerationPhase::StoryFinalization,
        json!({
            "plannedChapters": story.planned_chapters,
            "fairyTaleTitle": story.fairy_tale_title,
        }),
        json!({
            "story": {
                "title": story.title,
                "chapters": final_chapters,
                "avatarDevelopment": [],
            }
        }),
    ));

    // Phase 4: urls survive on the rows, prompts do not.
    let chapter_images: Vec<Value> = chapters
        .iter()
        .map(|c| {
            json!({
                "chapterIndex": c.chapter_index,
                "prompt": "",
                "url": c.image_url,
            })
        })
        .collect();
    logs.push(PhaseLog::reconstructed(
        &story.id,
        GenerationPhase::ImageGeneration,
        json!({ "storyId": story.id }),
        json!({
            "images": {
                "coverUrl": story.cover_url,
                "chapterImages": chapter_images,
            }
        }),
    ));

    logs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story_record() -> StoryRecord {
        StoryRecord {
            id: "story-1".to_string(),
            avatar_id: "avatar-1".to_string(),
            title: "Mia and the Moon Fox".to_string(),
            genre: "adventure".to_string(),
            setting: "forest".to_string(),
            length: "medium".to_string(),
            status: "complete".to_string(),
            fairy_tale_title: Some("The Star Coins".to_string()),
            planned_chapters: 5,
            child_age: 7,
            cover_url: Some("https://img.example/cover.png".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn chapter_record(index: i64) -> ChapterRecord {
        ChapterRecord {
            id: format!("ch-{index}"),
            story_id: "story-1".to_string(),
            chapter_index: index,
            title: format!("Chapter {index}"),
            text: "Once upon a time...".to_string(),
            image_url: Some(format!("https://img.example/{index}.png")),
            image_prompt: None,
            audio_url: None,
        }
    }

    #[test]
    fn test_reconstruction_covers_all_phases() {
        let chapters: Vec<_> = (0..5).map(chapter_record).collect();
        let logs = reconstruct_logs(&story_record(), &chapters);
        assert_eq!(logs.len(), 5);
        let keys: Vec<_> = logs.iter().map(|l| l.phase.as_str()).collect();
        assert_eq!(keys, vec!["phase0", "phase1", "phase2", "phase3", "phase4"]);
    }

    #[test]
    fn test_reconstructed_logs_are_marked() {
        let logs = reconstruct_logs(&story_record(), &[chapter_record(0)]);
        for log in &logs {
            assert!(log.is_reconstructed());
            assert_eq!(log.duration_ms, 0);
        }
    }

    #[test]
    fn test_reconstruction_without_fairy_tale() {
        let mut story = story_record();
        story.fairy_tale_title = None;
        let logs = reconstruct_logs(&story, &[]);
        assert!(logs[0].response["selection"].is_null());
    }

    #[test]
    fn test_reconstruction_carries_chapter_images() {
        let logs = reconstruct_logs(&story_record(), &[chapter_record(0), chapter_record(1)]);
        let images = &logs[4].response["images"];
        assert_eq!(images["chapterImages"].as_array().unwrap().len(), 2);
        assert_eq!(images["coverUrl"], "https://img.example/cover.png");
    }
}
