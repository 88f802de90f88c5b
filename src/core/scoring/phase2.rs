//! Phase 2 Rubric: Character Matching
//!
//! Criteria (max 10): match rate (3), attribute accuracy across
//! species/age/gender checks (3), avatar role correctness (2), species
//! diversity (1), assignment uniqueness (1).

use std::collections::HashSet;

use serde_json::Value;

use crate::core::characters::requirements::CharacterRequirement;
use crate::core::characters::types::CharacterAssignment;
use crate::core::pipeline::logs::PhaseLog;

use super::types::{PhaseScore, ScoreContext};

pub fn score(log: Option<&PhaseLog>, _context: &ScoreContext) -> PhaseScore {
    let mut sheet = PhaseScore::builder();

    let requirements: Vec<CharacterRequirement> = log
        .and_then(|l| l.request.get("requirements"))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let hero_placeholder: Option<String> = log
        .and_then(|l| l.request.get("heroPlaceholder"))
        .and_then(Value::as_str)
        .map(String::from);
    let assignments: Vec<CharacterAssignment> = log
        .and_then(|l| l.response.get("assignments"))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    // Match rate against the requirement count.
    if requirements.is_empty() {
        sheet.criterion("match_rate", 0.0, 3.0, "no requirements recorded");
        sheet.issue("Phase 2 log carries no character requirements");
    } else {
        let rate = assignments.len() as f64 / requirements.len() as f64;
        let (rate_score, label) = if rate >= 1.0 {
            (3.0, "every requirement matched")
        } else if rate >= 0.8 {
            (2.0, "most requirements matched")
        } else if rate > 0.0 {
            (1.0, "significant match gaps")
        } else {
            (0.0, "nothing matched")
        };
        sheet.criterion(
            "match_rate",
            rate_score,
            3.0,
            format!("{}/{} requirements matched ({label})", assignments.len(), requirements.len()),
        );
        if rate < 1.0 {
            sheet.issue(format!(
                "{} requirement(s) left without a character",
                requirements.len() - assignments.len()
            ));
        }
    }

    // Attribute accuracy: every species/age/gender constraint a
    // requirement states must hold on its assignment.
    let mut checks = 0usize;
    let mut passed = 0usize;
    for assignment in &assignments {
        let Some(requirement) = requirements
            .iter()
            .find(|r| r.placeholder == assignment.placeholder)
        else {
            continue;
        };
        if let Some(wanted) = requirement.hinted_species() {
            checks += 1;
            if assignment.character.species == wanted {
                passed += 1;
            }
        }
        if let Some(wanted) = requirement
            .effective_age_category()
            .or_else(|| requirement.hinted_age())
        {
            checks += 1;
            if assignment.character.visual_profile.age_category() == Some(wanted) {
                passed += 1;
            }
        }
        if requirement.gender != crate::core::characters::requirements::GenderRequirement::Any {
            checks += 1;
            if assignment.character.gender.satisfies(requirement.gender) {
                passed += 1;
            }
        }
    }
    if checks == 0 {
        sheet.criterion(
            "attribute_accuracy",
            if assignments.is_empty() { 0.0 } else { 3.0 },
            3.0,
            "no attribute constraints to verify",
        );
    } else {
        let ratio = passed as f64 / checks as f64;
        sheet.criterion(
            "attribute_accuracy",
            ratio * 3.0,
            3.0,
            format!("{passed}/{checks} attribute checks passed"),
        );
        if passed < checks {
            sheet.issue(format!("{} attribute mismatch(es) in assignments", checks - passed));
        }
    }

    // Avatar role: the avatar must fill the hero slot.
    let avatar_assignment = assignments.iter().find(|a| a.character.is_avatar);
    match (avatar_assignment, hero_placeholder.as_deref()) {
        (Some(assignment), Some(hero)) if assignment.placeholder == hero => {
            sheet.criterion("avatar_role", 2.0, 2.0, "avatar fills the hero slot");
        }
        (Some(assignment), Some(_)) => {
            sheet.criterion(
                "avatar_role",
                0.0,
                2.0,
                format!("avatar assigned to '{}' instead of the hero slot", assignment.placeholder),
            );
            sheet.issue("Avatar was matched into a supporting role");
        }
        _ => {
            sheet.criterion("avatar_role", 0.0, 2.0, "avatar not assigned");
            sheet.issue("No assignment references the avatar");
        }
    }

    // Species diversity across the cast.
    let species: HashSet<_> = assignments.iter().map(|a| a.character.species).collect();
    sheet.criterion(
        "species_diversity",
        if species.len() >= 2 { 1.0 } else { 0.0 },
        1.0,
        format!("{} species type(s) in the cast", species.len()),
    );
    if species.len() < 2 {
        sheet.recommend("Mix human, animal, or fantasy characters for a livelier cast");
    }

    // Uniqueness: duplicate ids violate the matching contract.
    let mut seen = HashSet::new();
    let duplicates = assignments
        .iter()
        .filter(|a| !seen.insert(a.character.id.clone()))
        .count();
    sheet.criterion(
        "uniqueness",
        if duplicates == 0 { 1.0 } else { 0.0 },
        1.0,
        if duplicates == 0 {
            "no duplicate character ids".to_string()
        } else {
            format!("{duplicates} duplicate character id(s)")
        },
    );
    if duplicates > 0 {
        sheet.issue("The same character fills more than one requirement");
    }

    sheet.finalize()
}
