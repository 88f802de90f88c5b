//! Phase 1 Rubric: Skeleton Generation
//!
//! Criteria (max 10): field completeness (2), requirement count in
//! [2, 8] (2), chapter count within the length band (2), placeholder
//! format compliance ratio (2), generation latency tiers (2).

use serde_json::Value;

use crate::core::characters::requirements::is_valid_placeholder;
use crate::core::pipeline::logs::PhaseLog;

use super::types::{PhaseScore, ScoreContext};

/// Fields a complete skeleton must carry.
const REQUIRED_FIELDS: [&str; 5] = [
    "title",
    "summary",
    "heroPlaceholder",
    "supportingCharacterRequirements",
    "chapters",
];

const MIN_REQUIREMENTS: usize = 2;
const MAX_REQUIREMENTS: usize = 8;

pub fn score(log: Option<&PhaseLog>, context: &ScoreContext) -> PhaseScore {
    let mut sheet = PhaseScore::builder();

    let skeleton = log.and_then(|l| l.response.get("skeleton")).cloned();
    let Some(skeleton) = skeleton else {
        sheet.criterion("completeness", 0.0, 2.0, "no skeleton recorded");
        sheet.criterion("requirement_count", 0.0, 2.0, "no skeleton recorded");
        sheet.criterion("chapter_count", 0.0, 2.0, "no skeleton recorded");
        sheet.criterion("placeholder_format", 0.0, 2.0, "no skeleton recorded");
        sheet.criterion("latency", 0.0, 2.0, "no skeleton recorded");
        sheet.issue("Phase 1 produced no skeleton");
        return sheet.finalize();
    };

    // Completeness: every required field, all or nothing.
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .filter(|f| skeleton.get(**f).is_none())
        .copied()
        .collect();
    if missing.is_empty() {
        sheet.criterion("completeness", 2.0, 2.0, "all required skeleton fields present");
    } else {
        sheet.criterion(
            "completeness",
            0.0,
            2.0,
            format!("missing fields: {}", missing.join(", ")),
        );
        for field in &missing {
            sheet.issue(format!("Skeleton is missing required field '{field}'"));
        }
    }

    // Requirement count: supporting slots plus the hero slot.
    match skeleton
        .get("supportingCharacterRequirements")
        .and_then(Value::as_array)
    {
        Some(requirements) => {
            let count = requirements.len() + 1;
            if (MIN_REQUIREMENTS..=MAX_REQUIREMENTS).contains(&count) {
                sheet.criterion(
                    "requirement_count",
                    2.0,
                    2.0,
                    format!("{count} character slots"),
                );
            } else {
                sheet.criterion(
                    "requirement_count",
                    1.0,
                    2.0,
                    format!("{count} character slots, outside [{MIN_REQUIREMENTS}, {MAX_REQUIREMENTS}]"),
                );
                sheet.recommend("Tune the skeleton prompt toward 2-8 character slots");
            }
        }
        None => {
            sheet.criterion("requirement_count", 0.0, 2.0, "requirement list absent");
        }
    }

    // Chapter count against the requested length band.
    let band = context.length.expected_chapters();
    match skeleton.get("chapters").and_then(Value::as_array) {
        Some(chapters) if !chapters.is_empty() => {
            let count = chapters.len() as u32;
            if band.contains(&count) {
                sheet.criterion(
                    "chapter_count",
                    2.0,
                    2.0,
                    format!("{count} chapters fit the {} band", context.length.as_str()),
                );
            } else {
                sheet.criterion(
                    "chapter_count",
                    1.0,
                    2.0,
                    format!(
                        "{count} chapters outside the expected {}-{} band",
                        band.start(),
                        band.end()
                    ),
                );
                sheet.issue(format!(
                    "Chapter count {count} does not fit the {} length",
                    context.length.as_str()
                ));
            }
        }
        _ => {
            sheet.criterion("chapter_count", 0.0, 2.0, "no chapters in skeleton");
            sheet.issue("Skeleton has no chapters");
        }
    }

    // Placeholder format compliance across all placeholder tokens.
    let placeholders = collect_placeholders(&skeleton);
    if placeholders.is_empty() {
        sheet.criterion("placeholder_format", 0.0, 2.0, "no placeholders found");
        sheet.issue("Skeleton contains no character placeholders");
    } else {
        let valid = placeholders
            .iter()
            .filter(|p| is_valid_placeholder(p))
            .count();
        let ratio = valid as f64 / placeholders.len() as f64;
        sheet.criterion(
            "placeholder_format",
            ratio * 2.0,
            2.0,
            format!("{valid}/{} placeholders well-formed", placeholders.len()),
        );
        if valid < placeholders.len() {
            sheet.issue(format!(
                "{} malformed placeholder(s) in skeleton",
                placeholders.len() - valid
            ));
        }
    }

    // Latency tiers.
    let duration_ms = log.map(|l| l.duration_ms).unwrap_or(0);
    let (latency_score, label) = if duration_ms < 40_000 {
        (2.0, "under 40s")
    } else if duration_ms < 50_000 {
        (1.5, "under 50s")
    } else if duration_ms < 60_000 {
        (1.0, "under 60s")
    } else {
        (0.0, "60s or slower")
    };
    sheet.criterion(
        "latency",
        latency_score,
        2.0,
        format!("generation took {duration_ms}ms ({label})"),
    );
    if latency_score == 0.0 {
        sheet.recommend("Skeleton generation is slow; check prompt size and service load");
    }

    sheet.finalize()
}

fn collect_placeholders(skeleton: &Value) -> Vec<String> {
    let mut placeholders = Vec::new();
    if let Some(hero) = skeleton.get("heroPlaceholder").and_then(Value::as_str) {
        placeholders.push(hero.to_string());
    }
    if let Some(requirements) = skeleton
        .get("supportingCharacterRequirements")
        .and_then(Value::as_array)
    {
        for requirement in requirements {
            if let Some(p) = requirement.get("placeholder").and_then(Value::as_str) {
                placeholders.push(p.to_string());
            }
        }
    }
    placeholders
}
