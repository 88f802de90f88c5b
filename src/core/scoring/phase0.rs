//! Phase 0 Rubric: Fairy Tale Selection
//!
//! Criteria (max 10): selection present (2), match score tiers (3),
//! match reason substance (2), age fit (1.5), genre fit (1.5).

use serde::Deserialize;

use crate::core::pipeline::logs::PhaseLog;

use super::types::{PhaseScore, ScoreContext};

/// Minimum characters for a match reason to count as substantiated.
const MIN_REASON_LENGTH: usize = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionView {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    match_score: Option<f64>,
    #[serde(default)]
    match_reason: Option<String>,
    #[serde(default)]
    age_min: Option<u8>,
    #[serde(default)]
    age_max: Option<u8>,
    #[serde(default)]
    genre: Option<String>,
}

pub fn score(log: Option<&PhaseLog>, context: &ScoreContext) -> PhaseScore {
    let mut sheet = PhaseScore::builder();

    let selection: Option<SelectionView> = log
        .and_then(|l| l.response.get("selection"))
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    let Some(selection) = selection else {
        sheet.criterion("selection_present", 0.0, 2.0, "no fairy tale selection recorded");
        sheet.criterion("match_score", 0.0, 3.0, "no selection to score");
        sheet.criterion("match_reason", 0.0, 2.0, "no selection to score");
        sheet.criterion("age_fit", 0.0, 1.5, "no selection to score");
        sheet.criterion("genre_fit", 0.0, 1.5, "no selection to score");
        sheet.issue("Phase 0 produced no fairy tale selection");
        sheet.recommend("Verify the fairy tale catalog covers the requested genre and age");
        return sheet.finalize();
    };

    let has_title = selection.title.as_deref().is_some_and(|t| !t.is_empty());
    sheet.criterion(
        "selection_present",
        if has_title { 2.0 } else { 0.0 },
        2.0,
        if has_title {
            "fairy tale selected"
        } else {
            "selection record has no title"
        },
    );
    if !has_title {
        sheet.issue("Selection record is missing the fairy tale title");
    }

    let (tier, reason) = match selection.match_score {
        Some(value) if value >= 0.9 => (3.0, format!("excellent template fit ({value:.2})")),
        Some(value) if value >= 0.7 => (2.0, format!("good template fit ({value:.2})")),
        Some(value) => (1.0, format!("weak template fit ({value:.2})")),
        None => (0.0, "no match score recorded".to_string()),
    };
    sheet.criterion("match_score", tier, 3.0, reason);
    if tier < 2.0 {
        sheet.recommend("Consider widening the fairy tale catalog for this request profile");
    }

    let reason_text = selection.match_reason.unwrap_or_default();
    let (reason_score, reason_label) = if reason_text.len() >= MIN_REASON_LENGTH {
        (2.0, "match reason is substantiated".to_string())
    } else if !reason_text.is_empty() {
        (1.0, format!("match reason too short ({} chars)", reason_text.len()))
    } else {
        (0.0, "no match reason given".to_string())
    };
    sheet.criterion("match_reason", reason_score, 2.0, reason_label);
    if reason_text.len() < MIN_REASON_LENGTH {
        sheet.issue("Selection lacks a substantive match reason");
    }

    let age_fits = match (selection.age_min, selection.age_max) {
        (Some(min), Some(max)) => context.child_age >= min && context.child_age <= max,
        _ => false,
    };
    sheet.criterion(
        "age_fit",
        if age_fits { 1.5 } else { 0.0 },
        1.5,
        if age_fits {
            format!("template suits age {}", context.child_age)
        } else {
            format!("template age band does not cover age {}", context.child_age)
        },
    );
    if !age_fits {
        sheet.issue("Selected fairy tale does not match the child's age");
    }

    let genre_fits = selection
        .genre
        .as_deref()
        .is_some_and(|g| g.eq_ignore_ascii_case(&context.genre));
    sheet.criterion(
        "genre_fit",
        if genre_fits { 1.5 } else { 0.0 },
        1.5,
        if genre_fits {
            "template genre matches the request"
        } else {
            "template genre differs from the request"
        },
    );

    sheet.finalize()
}
