//! Character Matching Engine
//!
//! Resolves skeleton character requirements against the candidate set
//! (pool templates plus user avatars). Hard constraints eliminate
//! candidates before scoring; the survivors are ranked by a weighted
//! soft score with a deterministic, diversity-favoring tie-break.
//!
//! Guarantees:
//! - No character id is assigned to two requirements in one run.
//! - Per-chapter screen-time budgets are never exceeded.
//! - Unsatisfiable requirements are reported, not defaulted.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::errors::MatchError;
use super::requirements::CharacterRequirement;
use super::types::{Candidate, CharacterAssignment, CharacterId, ResolvedCharacter};

/// Cumulative screen-time ceiling per chapter.
const CHAPTER_SCREEN_TIME_BUDGET: u32 = 100;

// ============================================================================
// Context and Outcome
// ============================================================================

/// Story-level context the matcher filters against.
#[derive(Debug, Clone)]
pub struct MatchContext {
    /// The story's setting ("forest", "castle", ...).
    pub setting: String,
}

impl MatchContext {
    pub fn new(setting: impl Into<String>) -> Self {
        Self {
            setting: setting.into(),
        }
    }
}

/// A requirement the engine could not fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedRequirement {
    pub placeholder: String,
    pub chapter_index: u32,
    pub reason: String,
}

/// Result of one matching run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    /// One assignment per successfully filled requirement.
    pub assignments: Vec<CharacterAssignment>,
    /// Requirements left unfilled after hard filtering.
    pub unmatched: Vec<UnmatchedRequirement>,
    /// Recoverable problems encountered, for the scoring engine.
    pub issues: Vec<String>,
    /// Pool character ids whose usage counters must be committed.
    pub used_pool_ids: Vec<CharacterId>,
}

impl MatchOutcome {
    /// Fraction of valid requirements that were filled.
    pub fn match_rate(&self) -> f64 {
        let total = self.assignments.len() + self.unmatched.len();
        if total == 0 {
            return 1.0;
        }
        self.assignments.len() as f64 / total as f64
    }
}

// ============================================================================
// Scoring Weights
// ============================================================================

/// Soft-score weights, in descending priority.
#[derive(Debug, Clone, Copy)]
pub struct MatchWeights {
    /// Species/type match against visual hints.
    pub species: f64,
    /// Age-category match.
    pub age: f64,
    /// Gender match when the requirement is not `any`.
    pub gender: f64,
    /// Fuzzy affinity between hints and archetype descriptors.
    pub affinity: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            species: 40.0,
            age: 25.0,
            gender: 15.0,
            affinity: 10.0,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The constrained assignment engine.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    weights: MatchWeights,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: MatchWeights) -> Self {
        Self { weights }
    }

    /// Resolve all requirements against the candidate set.
    ///
    /// Requirements are processed in input order; each assignment
    /// removes its character from the candidate set and consumes
    /// screen-time budget in its chapter.
    pub fn match_requirements(
        &self,
        requirements: &[CharacterRequirement],
        candidates: &[Candidate],
        context: &MatchContext,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        let mut assigned_ids: HashSet<CharacterId> = HashSet::new();
        let mut chapter_screen_time: HashMap<u32, u32> = HashMap::new();

        for requirement in requirements {
            if !requirement.has_valid_placeholder() {
                let err = MatchError::invalid_placeholder(&requirement.placeholder);
                log::warn!("{err}");
                outcome.issues.push(err.to_string());
                continue;
            }

            let consumed = chapter_screen_time
                .get(&requirement.chapter_index)
                .copied()
                .unwrap_or(0);

            let survivors: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| Self::passes_hard_constraints(c, requirement, context, &assigned_ids, consumed))
                .collect();

            if survivors.is_empty() {
                let err = MatchError::constraint_violation(
                    &requirement.placeholder,
                    "all candidates removed by hard constraints",
                );
                log::warn!("{err}");
                outcome.issues.push(err.to_string());
                outcome.unmatched.push(UnmatchedRequirement {
                    placeholder: requirement.placeholder.clone(),
                    chapter_index: requirement.chapter_index,
                    reason: "all candidates removed by hard constraints".to_string(),
                });
                continue;
            }

            let best = self.select_best(&survivors, requirement);
            let score = self.soft_score(best, requirement);

            assigned_ids.insert(best.id().clone());
            *chapter_screen_time
                .entry(requirement.chapter_index)
                .or_insert(0) += best.max_screen_time() as u32;
            if !best.is_avatar() {
                outcome.used_pool_ids.push(best.id().clone());
            }

            outcome.assignments.push(CharacterAssignment {
                placeholder: requirement.placeholder.clone(),
                chapter_index: requirement.chapter_index,
                character: ResolvedCharacter::from(best),
                match_score: score,
            });
        }

        log::debug!(
            "matched {}/{} requirements ({} issues)",
            outcome.assignments.len(),
            requirements.len(),
            outcome.issues.len()
        );
        outcome
    }

    fn passes_hard_constraints(
        candidate: &Candidate,
        requirement: &CharacterRequirement,
        context: &MatchContext,
        assigned_ids: &HashSet<CharacterId>,
        consumed_screen_time: u32,
    ) -> bool {
        if assigned_ids.contains(candidate.id()) {
            return false;
        }
        if let Candidate::Pool(template) = candidate {
            if !template.is_active {
                return false;
            }
            if !template.fits_setting(&context.setting) {
                return false;
            }
            if !template.available_in_chapter(requirement.chapter_index) {
                return false;
            }
        }
        consumed_screen_time + candidate.max_screen_time() as u32 <= CHAPTER_SCREEN_TIME_BUDGET
    }

    /// Weighted soft score of one candidate against one requirement.
    fn soft_score(&self, candidate: &Candidate, requirement: &CharacterRequirement) -> f64 {
        let mut score = 0.0;
        let profile = candidate.visual_profile();

        if let Some(wanted) = requirement.hinted_species() {
            if profile.species_class() == wanted {
                score += self.weights.species;
            }
        }

        let wanted_age = requirement.effective_age_category().or_else(|| requirement.hinted_age());
        if let (Some(wanted), Some(actual)) = (wanted_age, profile.age_category()) {
            if wanted == actual {
                score += self.weights.age;
            }
        }

        if requirement.gender != super::requirements::GenderRequirement::Any
            && candidate.gender().satisfies(requirement.gender)
        {
            score += self.weights.gender;
        }

        score += self.weights.affinity * hint_affinity(&requirement.visual_hints, candidate);
        score
    }

    /// Pick the highest-scoring survivor. Ties break by lowest
    /// recent usage, then lowest total usage, then stable id order.
    fn select_best<'a>(
        &self,
        survivors: &[&'a Candidate],
        requirement: &CharacterRequirement,
    ) -> &'a Candidate {
        let mut ranked: Vec<(&Candidate, f64)> = survivors
            .iter()
            .map(|c| (*c, self.soft_score(c, requirement)))
            .collect();

        ranked.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.recent_usage_count().cmp(&b.recent_usage_count()))
                .then_with(|| a.total_usage_count().cmp(&b.total_usage_count()))
                .then_with(|| a.id().cmp(b.id()))
        });

        ranked[0].0
    }
}

// ============================================================================
// Hint Affinity
// ============================================================================

/// Fuzzy 0.0-1.0 affinity between the requirement's free-text hints
/// and a candidate's archetype descriptors. Tokens under four
/// characters are skipped; each hint token contributes its best
/// Jaro-Winkler match against the descriptor tokens.
fn hint_affinity(hints: &str, candidate: &Candidate) -> f64 {
    let haystack = match candidate {
        Candidate::Pool(t) => format!(
            "{} {} {}",
            t.archetype,
            t.emotional_nature,
            t.visual_profile.species_descriptor()
        ),
        Candidate::Avatar(a) => {
            format!("{} {}", a.name, a.visual_profile.species_descriptor())
        }
    };
    let haystack = haystack.to_lowercase();
    let hay_tokens: Vec<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
        .collect();
    if hay_tokens.is_empty() {
        return 0.0;
    }

    let hints = hints.to_lowercase();
    let hint_tokens: Vec<&str> = hints
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
        .collect();
    if hint_tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = hint_tokens
        .iter()
        .map(|hint| {
            hay_tokens
                .iter()
                .map(|hay| strsim::jaro_winkler(hint, hay))
                .fold(0.0, f64::max)
        })
        .sum();
    total / hint_tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::characters::requirements::{AgeCategory, GenderRequirement};
    use crate::core::characters::types::{
        AvatarSnapshot, CharacterRole, CharacterTemplate, Gender, VisualProfile,
    };

    fn template(
        id: &str,
        profile: VisualProfile,
        recent: u32,
        total: u32,
    ) -> CharacterTemplate {
        CharacterTemplate {
            id: CharacterId::new(id),
            name: id.to_string(),
            role: CharacterRole::Companion,
            archetype: "friendly helper".to_string(),
            emotional_nature: "warm".to_string(),
            gender: Gender::Neutral,
            visual_profile: profile,
            image_url: None,
            max_screen_time: 30,
            available_chapters: vec![],
            canon_settings: vec![],
            recent_usage_count: recent,
            total_usage_count: total,
            last_used_at: None,
            is_active: true,
        }
    }

    fn human(age: u8) -> VisualProfile {
        VisualProfile::Human {
            age_years: age,
            hair: "grey".to_string(),
            eyes: "brown".to_string(),
            clothing: "a cloak".to_string(),
        }
    }

    fn animal(species: &str) -> VisualProfile {
        VisualProfile::Animal {
            species: species.to_string(),
            coat: "soft fur".to_string(),
            size: "small".to_string(),
        }
    }

    #[test]
    fn test_species_constraint_beats_usage() {
        // "{{GUIDE}}" with hints "alter mensch, weise" in a forest must
        // pick the human even though the fox was used less.
        let mut old_human = template("old-henrik", human(72), 5, 20);
        old_human.canon_settings = vec!["forest".to_string()];
        old_human.available_chapters = vec![1, 2, 3];
        old_human.archetype = "wise mentor".to_string();

        let fresh_fox = template("felix-fox", animal("fox"), 0, 0);

        let req = CharacterRequirement::new("{{GUIDE}}", 2)
            .with_hints("alter mensch, weise");
        let outcome = MatchingEngine::new().match_requirements(
            &[req],
            &[
                Candidate::Pool(fresh_fox),
                Candidate::Pool(old_human),
            ],
            &MatchContext::new("forest"),
        );

        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].character.id.as_str(), "old-henrik");
        assert!(outcome.unmatched.is_empty());
    }

    #[test]
    fn test_uniqueness_invariant() {
        let a = template("char-a", animal("fox"), 0, 0);
        let b = template("char-b", animal("owl"), 0, 0);
        let reqs = vec![
            CharacterRequirement::new("{{FIRST}}", 1).with_hints("ein tier"),
            CharacterRequirement::new("{{SECOND}}", 2).with_hints("ein tier"),
        ];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &[Candidate::Pool(a), Candidate::Pool(b)],
            &MatchContext::new("forest"),
        );

        assert_eq!(outcome.assignments.len(), 2);
        assert_ne!(
            outcome.assignments[0].character.id,
            outcome.assignments[1].character.id
        );
    }

    #[test]
    fn test_deterministic_tie_break() {
        // Equal scores and usage: stable id order decides, repeatably.
        let reqs = vec![CharacterRequirement::new("{{HELPER}}", 1)];
        let candidates = vec![
            Candidate::Pool(template("zeta", animal("owl"), 0, 0)),
            Candidate::Pool(template("alpha", animal("fox"), 0, 0)),
        ];
        let engine = MatchingEngine::new();
        for _ in 0..5 {
            let outcome = engine.match_requirements(
                &reqs,
                &candidates,
                &MatchContext::new("forest"),
            );
            assert_eq!(outcome.assignments[0].character.id.as_str(), "alpha");
        }
    }

    #[test]
    fn test_recent_usage_breaks_ties_before_id() {
        let reqs = vec![CharacterRequirement::new("{{HELPER}}", 1)];
        let candidates = vec![
            Candidate::Pool(template("alpha", animal("fox"), 3, 10)),
            Candidate::Pool(template("zeta", animal("fox"), 1, 10)),
        ];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &candidates,
            &MatchContext::new("forest"),
        );
        assert_eq!(outcome.assignments[0].character.id.as_str(), "zeta");
    }

    #[test]
    fn test_invalid_placeholder_skipped_with_issue() {
        let reqs = vec![CharacterRequirement::new("{{not_valid}}", 1)];
        let candidates = vec![Candidate::Pool(template("a", animal("fox"), 0, 0))];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &candidates,
            &MatchContext::new("forest"),
        );
        assert!(outcome.assignments.is_empty());
        // Invalid placeholders are skipped, not unmatched
        assert!(outcome.unmatched.is_empty());
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].contains("{{not_valid}}"));
    }

    #[test]
    fn test_hard_filter_empties_pool_reports_unmatched() {
        let mut restricted = template("castle-only", human(40), 0, 0);
        restricted.canon_settings = vec!["castle".to_string()];
        let reqs = vec![CharacterRequirement::new("{{GUIDE}}", 1)];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &[Candidate::Pool(restricted)],
            &MatchContext::new("forest"),
        );
        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
        assert_eq!(outcome.unmatched[0].placeholder, "{{GUIDE}}");
    }

    #[test]
    fn test_inactive_candidates_filtered() {
        let mut inactive = template("gone", animal("fox"), 0, 0);
        inactive.is_active = false;
        let reqs = vec![CharacterRequirement::new("{{HELPER}}", 1)];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &[Candidate::Pool(inactive)],
            &MatchContext::new("forest"),
        );
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[test]
    fn test_chapter_screen_time_budget() {
        let mut heavy_a = template("heavy-a", animal("bear"), 0, 0);
        heavy_a.max_screen_time = 60;
        let mut heavy_b = template("heavy-b", animal("wolf"), 0, 0);
        heavy_b.max_screen_time = 60;

        // Both in chapter 1: second assignment would exceed 100
        let reqs = vec![
            CharacterRequirement::new("{{FIRST}}", 1),
            CharacterRequirement::new("{{SECOND}}", 1),
        ];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &[Candidate::Pool(heavy_a.clone()), Candidate::Pool(heavy_b.clone())],
            &MatchContext::new("forest"),
        );
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.unmatched.len(), 1);

        // Different chapters: both fit
        let reqs = vec![
            CharacterRequirement::new("{{FIRST}}", 1),
            CharacterRequirement::new("{{SECOND}}", 2),
        ];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &[Candidate::Pool(heavy_a), Candidate::Pool(heavy_b)],
            &MatchContext::new("forest"),
        );
        assert_eq!(outcome.assignments.len(), 2);
    }

    #[test]
    fn test_gender_requirement_scores() {
        let mut female = template("anna", human(30), 0, 0);
        female.gender = Gender::Female;
        let mut male = template("bert", human(30), 0, 0);
        male.gender = Gender::Male;

        let req = CharacterRequirement::new("{{TEACHER}}", 1)
            .with_gender(GenderRequirement::Female);
        let outcome = MatchingEngine::new().match_requirements(
            &[req],
            &[Candidate::Pool(male), Candidate::Pool(female)],
            &MatchContext::new("forest"),
        );
        assert_eq!(outcome.assignments[0].character.id.as_str(), "anna");
    }

    #[test]
    fn test_avatar_candidate_assignable() {
        let avatar = Candidate::Avatar(AvatarSnapshot {
            id: CharacterId::new("avatar-mia"),
            name: "Mia".to_string(),
            gender: Gender::Female,
            visual_profile: human(7),
            image_url: None,
        });
        let req = CharacterRequirement::new("{{HERO}}", 0)
            .with_hints("junges mädchen")
            .with_age_category(AgeCategory::Child);
        let outcome = MatchingEngine::new().match_requirements(
            &[req],
            &[avatar, Candidate::Pool(template("adult", human(40), 0, 0))],
            &MatchContext::new("forest"),
        );
        assert_eq!(outcome.assignments[0].character.id.as_str(), "avatar-mia");
        assert!(outcome.assignments[0].character.is_avatar);
        // Avatars do not get usage commits
        assert!(outcome.used_pool_ids.is_empty());
    }

    #[test]
    fn test_used_pool_ids_collected() {
        let reqs = vec![CharacterRequirement::new("{{HELPER}}", 1)];
        let outcome = MatchingEngine::new().match_requirements(
            &reqs,
            &[Candidate::Pool(template("a", animal("fox"), 0, 0))],
            &MatchContext::new("forest"),
        );
        assert_eq!(outcome.used_pool_ids, vec![CharacterId::new("a")]);
    }

    #[test]
    fn test_match_rate() {
        let outcome = MatchOutcome {
            assignments: vec![],
            unmatched: vec![],
            issues: vec![],
            used_pool_ids: vec![],
        };
        assert_eq!(outcome.match_rate(), 1.0);
    }
}
