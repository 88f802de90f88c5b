//! Phase 3 Rubric: Story Finalization
//!
//! Criteria (max 10): structural completeness (2), chapter count vs.
//! plan (2), avatar development validity (2), originality when a fairy
//! tale was remixed (2), first-chapter language quality (2, additive).

use serde_json::Value;

use crate::core::personality::aliases;
use crate::core::pipeline::logs::PhaseLog;
use crate::core::pipeline::skeleton::FinalStory;

use super::types::{PhaseScore, ScoreContext};

/// Minimum characters for a first chapter to count as substantial.
const MIN_CHAPTER_LENGTH: usize = 300;
/// Minimum characters for a twist summary to count as a real remix
/// signal.
const MIN_TWIST_LENGTH: usize = 20;

pub fn score(log: Option<&PhaseLog>, _context: &ScoreContext) -> PhaseScore {
    let mut sheet = PhaseScore::builder();

    let story: Option<FinalStory> = log
        .and_then(|l| l.response.get("story"))
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    let planned_chapters = log
        .and_then(|l| l.request.get("plannedChapters"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let fairy_tale_title: Option<String> = log
        .and_then(|l| l.request.get("fairyTaleTitle"))
        .and_then(Value::as_str)
        .map(String::from);

    let Some(story) = story else {
        sheet.criterion("structure", 0.0, 2.0, "no finalized story recorded");
        sheet.criterion("chapter_match", 0.0, 2.0, "no finalized story recorded");
        sheet.criterion("avatar_development", 0.0, 2.0, "no finalized story recorded");
        sheet.criterion("originality", 0.0, 2.0, "no finalized story recorded");
        sheet.criterion("language_quality", 0.0, 2.0, "no finalized story recorded");
        sheet.issue("Phase 3 produced no finalized story");
        return sheet.finalize();
    };

    // Structural completeness: a title and prose in every chapter.
    let empty_chapters = story.chapters.iter().filter(|c| c.text.trim().is_empty()).count();
    if story.title.trim().is_empty() || story.chapters.is_empty() {
        sheet.criterion("structure", 0.0, 2.0, "missing title or chapters");
        sheet.issue("Finalized story is structurally incomplete");
    } else if empty_chapters > 0 {
        sheet.criterion(
            "structure",
            1.0,
            2.0,
            format!("{empty_chapters} chapter(s) have no prose"),
        );
        sheet.issue(format!("{empty_chapters} chapter(s) were left empty"));
    } else {
        sheet.criterion("structure", 2.0, 2.0, "title and all chapter prose present");
    }

    // Chapter count against the skeleton's plan.
    if story.chapters.is_empty() || planned_chapters == 0 {
        sheet.criterion("chapter_match", 0.0, 2.0, "no chapters to compare");
    } else {
        let ratio = story.chapters.len() as f64 / planned_chapters as f64;
        let (chapter_score, label) = if story.chapters.len() == planned_chapters {
            (2.0, "matches the plan exactly")
        } else if ratio >= 0.8 {
            (1.5, "close to the plan")
        } else {
            (1.0, "diverges from the plan")
        };
        sheet.criterion(
            "chapter_match",
            chapter_score,
            2.0,
            format!(
                "{}/{planned_chapters} planned chapters ({label})",
                story.chapters.len()
            ),
        );
        if story.chapters.len() != planned_chapters {
            sheet.issue(format!(
                "Finalized {} chapters but {planned_chapters} were planned",
                story.chapters.len()
            ));
        }
    }

    // Avatar development: present and every trait id resolvable.
    if story.avatar_development.is_empty() {
        sheet.criterion("avatar_development", 0.0, 2.0, "no development record");
        sheet.issue("Story grants the avatar no trait development");
    } else {
        let invalid = story
            .avatar_development
            .iter()
            .filter(|c| aliases::resolve(&c.trait_id).is_err() || c.delta == 0)
            .count();
        if invalid == 0 {
            sheet.criterion(
                "avatar_development",
                2.0,
                2.0,
                format!("{} valid trait change(s)", story.avatar_development.len()),
            );
        } else {
            sheet.criterion(
                "avatar_development",
                1.0,
                2.0,
                format!("{invalid} invalid trait change(s)"),
            );
            sheet.issue(format!(
                "{invalid} development entr(y/ies) reference unknown traits or zero deltas"
            ));
        }
    }

    // Originality: only meaningful when a fairy tale was remixed.
    match fairy_tale_title {
        Some(original) => {
            let title_changed = !story.title.eq_ignore_ascii_case(&original);
            let has_twist = story
                .twist_summary
                .as_deref()
                .is_some_and(|t| t.len() >= MIN_TWIST_LENGTH);
            let originality = match (title_changed, has_twist) {
                (true, true) => 2.0,
                (true, false) | (false, true) => 1.0,
                (false, false) => 0.0,
            };
            sheet.criterion(
                "originality",
                originality,
                2.0,
                format!(
                    "title {}, twist {}",
                    if title_changed { "reworked" } else { "copied" },
                    if has_twist { "described" } else { "missing" }
                ),
            );
            if originality < 2.0 {
                sheet.issue("Remix stays too close to the original fairy tale");
            }
        }
        None => {
            sheet.criterion("originality", 2.0, 2.0, "original story, no template used");
        }
    }

    // Language quality of the opening chapter: length, dialogue,
    // sentence variety. Additive, capped at 2.
    let first_text = story
        .chapters
        .first()
        .map(|c| c.text.as_str())
        .unwrap_or_default();
    let mut language = 0.0;
    let mut notes = Vec::new();
    if first_text.len() >= MIN_CHAPTER_LENGTH {
        language += 0.7;
        notes.push("substantial length");
    } else {
        sheet.issue("Opening chapter is very short");
    }
    if has_dialogue(first_text) {
        language += 0.6;
        notes.push("contains dialogue");
    } else {
        sheet.recommend("Add spoken dialogue to bring characters to life");
    }
    if has_sentence_variety(first_text) {
        language += 0.7;
        notes.push("varied sentences");
    }
    sheet.criterion(
        "language_quality",
        language,
        2.0,
        if notes.is_empty() {
            "no quality signals in the opening chapter".to_string()
        } else {
            notes.join(", ")
        },
    );

    sheet.finalize()
}

/// Quotation marks in any of the conventions the generator produces.
fn has_dialogue(text: &str) -> bool {
    text.contains('"') || text.contains('„') || text.contains('“') || text.contains('»')
}

/// At least three sentences with meaningfully different lengths.
fn has_sentence_variety(text: &str) -> bool {
    let lengths: Vec<usize> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::len)
        .collect();
    if lengths.len() < 3 {
        return false;
    }
    let min = lengths.iter().min().copied().unwrap_or(0);
    let max = lengths.iter().max().copied().unwrap_or(0);
    max >= min * 2
}
