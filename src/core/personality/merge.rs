//! Personality Trait Merge Engine
//!
//! The single mutation path for trait structures. Applies signed
//! deltas with clamping, recomputes parent aggregates from
//! subcategory sums, and supports exact reversal of recorded
//! applications.
//!
//! Clamp asymmetry to be aware of: `actual_delta` records the
//! realized (post-clamp) change. Re-applying the negated *requested*
//! delta is not a perfect inverse once a value hit a boundary; callers
//! must always reverse via `actual_delta`, which `revert_changes`
//! does.

use super::aliases;
use super::errors::TraitError;
use super::types::{AppliedChange, BaseTrait, PersonalityTraits, TraitChange, TraitState};

/// Subcategory name scalar deltas are routed to when a trait already
/// carries subcategories, so the sum invariant cannot break.
const GENERAL_SUBCATEGORY: &str = "general";

/// Result of one merge batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// The updated trait structure.
    pub traits: PersonalityTraits,
    /// Realized changes, in input order, skipping rejected entries.
    pub applied: Vec<AppliedChange>,
    /// Changes rejected per-entry, with the reason.
    pub rejected: Vec<(TraitChange, TraitError)>,
}

// ============================================================================
// Normalization
// ============================================================================

/// Upgrade a legacy or partial trait record to the full shape: every
/// base trait present, values non-negative, aggregates consistent with
/// subcategory sums. Existing subcategories are preserved.
///
/// Idempotent: normalizing a normalized structure changes nothing.
pub fn normalize(traits: &PersonalityTraits) -> PersonalityTraits {
    let mut normalized = PersonalityTraits::new();
    for base in BaseTrait::ALL {
        let mut state = traits.get(base).cloned().unwrap_or_default();
        if state.subcategories.is_empty() {
            state.value = state.value.clamp(0, base.max_value());
        } else {
            for value in state.subcategories.values_mut() {
                *value = (*value).clamp(0, base.max_value());
            }
            state.value = state.subcategories.values().sum();
        }
        normalized.traits.insert(base, state);
    }
    normalized
}

// ============================================================================
// Apply
// ============================================================================

/// Apply a batch of signed trait changes.
///
/// The input structure is normalized first. Each change is resolved
/// through the alias table; unresolvable entries are rejected
/// individually and the batch continues.
pub fn apply_changes(current: &PersonalityTraits, changes: &[TraitChange]) -> MergeResult {
    let mut traits = normalize(current);
    let mut applied = Vec::with_capacity(changes.len());
    let mut rejected = Vec::new();

    for change in changes {
        match aliases::resolve(&change.trait_id) {
            Err(err) => {
                log::warn!("Skipping trait change '{}': {err}", change.trait_id);
                rejected.push((change.clone(), err));
            }
            Ok((base, sub)) => {
                let state = traits.traits.get_mut(&base).expect("normalized");
                let record = match sub {
                    Some(sub) => apply_subcategory(state, base, &sub, change.delta),
                    // Scalar deltas on a trait that grew subcategories
                    // route to `general` to keep the sum invariant.
                    None if !state.subcategories.is_empty() => {
                        apply_subcategory(state, base, GENERAL_SUBCATEGORY, change.delta)
                    }
                    None => apply_scalar(state, base, change.delta),
                };
                applied.push(record);
            }
        }
    }

    MergeResult {
        traits,
        applied,
        rejected,
    }
}

fn apply_scalar(state: &mut TraitState, base: BaseTrait, delta: i64) -> AppliedChange {
    let old = state.value;
    state.value = (old + delta).clamp(0, base.max_value());
    AppliedChange {
        trait_id: base.as_str().to_string(),
        delta,
        actual_delta: state.value - old,
    }
}

fn apply_subcategory(
    state: &mut TraitState,
    base: BaseTrait,
    sub: &str,
    delta: i64,
) -> AppliedChange {
    let old = state.subcategories.get(sub).copied().unwrap_or(0);
    let new = (old + delta).clamp(0, base.max_value());
    state.subcategories.insert(sub.to_string(), new);
    state.value = state.subcategories.values().sum();
    AppliedChange {
        trait_id: format!("{}.{}", base.as_str(), sub),
        delta,
        actual_delta: new - old,
    }
}

// ============================================================================
// Revert
// ============================================================================

/// Reverse previously applied changes exactly, by negating their
/// recorded `actual_delta`s through the same clamp-and-recompute path.
///
/// Subcategories that land on exactly 0 are pruned from the map to
/// keep the structure minimal. (Forward application keeps explicit
/// zeros; only reversal prunes.)
pub fn revert_changes(current: &PersonalityTraits, applied: &[AppliedChange]) -> MergeResult {
    let inverted: Vec<TraitChange> = applied
        .iter()
        .map(|a| TraitChange::new(a.trait_id.clone(), -a.actual_delta))
        .collect();
    let mut result = apply_changes(current, &inverted);

    for state in result.traits.traits.values_mut() {
        state.subcategories.retain(|_, value| *value != 0);
        if !state.subcategories.is_empty() {
            state.value = state.subcategories.values().sum();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fills_all_bases() {
        let normalized = normalize(&PersonalityTraits::new());
        assert_eq!(normalized.traits.len(), 9);
        for base in BaseTrait::ALL {
            assert_eq!(normalized.value(base), 0);
            assert!(normalized.get(base).unwrap().subcategories.is_empty());
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut traits = PersonalityTraits::new();
        traits.traits.insert(
            BaseTrait::Courage,
            TraitState::scalar(-5), // legacy negative value
        );
        let mut knowledge = TraitState::scalar(999);
        knowledge.subcategories.insert("physics".to_string(), 30);
        knowledge.subcategories.insert("biology".to_string(), 12);
        traits.traits.insert(BaseTrait::Knowledge, knowledge);

        let once = normalize(&traits);
        let twice = normalize(&once);
        assert_eq!(once, twice);
        assert!(once.invariant_holds());
        // Aggregate recomputed from subcategories, not trusted
        assert_eq!(once.value(BaseTrait::Knowledge), 42);
        assert_eq!(once.value(BaseTrait::Courage), 0);
    }

    #[test]
    fn test_normalize_preserves_subcategories() {
        let mut traits = PersonalityTraits::new();
        let mut knowledge = TraitState::default();
        knowledge.subcategories.insert("astronomy".to_string(), 5);
        traits.traits.insert(BaseTrait::Knowledge, knowledge);

        let normalized = normalize(&traits);
        assert_eq!(
            normalized.subcategory(BaseTrait::Knowledge, "astronomy"),
            Some(5)
        );
    }

    #[test]
    fn test_hierarchical_apply() {
        // +30 to knowledge.physics on an empty record
        let result = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("knowledge.physics", 30)],
        );
        assert_eq!(
            result.traits.subcategory(BaseTrait::Knowledge, "physics"),
            Some(30)
        );
        assert_eq!(result.traits.value(BaseTrait::Knowledge), 30);
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.applied[0].actual_delta, 30);
        assert!(result.traits.invariant_holds());
    }

    #[test]
    fn test_scalar_apply_and_clamp_upper() {
        let first = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("courage", 90)],
        );
        let second = apply_changes(&first.traits, &[TraitChange::new("courage", 25)]);
        assert_eq!(second.traits.value(BaseTrait::Courage), 100);
        assert_eq!(second.applied[0].delta, 25);
        assert_eq!(second.applied[0].actual_delta, 10);
    }

    #[test]
    fn test_clamp_lower_bound() {
        let result = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("empathy", -10)],
        );
        assert_eq!(result.traits.value(BaseTrait::Empathy), 0);
        assert_eq!(result.applied[0].actual_delta, 0);
    }

    #[test]
    fn test_knowledge_family_max() {
        let result = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("knowledge.physics", 1500)],
        );
        assert_eq!(
            result.traits.subcategory(BaseTrait::Knowledge, "physics"),
            Some(1000)
        );
        assert_eq!(result.applied[0].actual_delta, 1000);
    }

    #[test]
    fn test_unknown_trait_rejected_batch_continues() {
        let result = apply_changes(
            &PersonalityTraits::new(),
            &[
                TraitChange::new("wisdom", 10),
                TraitChange::new("courage", 5),
            ],
        );
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].1, TraitError::unknown("wisdom"));
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.traits.value(BaseTrait::Courage), 5);
    }

    #[test]
    fn test_alias_resolution_in_batch() {
        let result = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("mut", 8)],
        );
        assert_eq!(result.traits.value(BaseTrait::Courage), 8);
        assert_eq!(result.applied[0].trait_id, "courage");
    }

    #[test]
    fn test_scalar_delta_routes_to_general_when_subcategories_exist() {
        let with_sub = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("knowledge.physics", 30)],
        );
        let result = apply_changes(&with_sub.traits, &[TraitChange::new("knowledge", 10)]);
        assert_eq!(
            result.traits.subcategory(BaseTrait::Knowledge, "general"),
            Some(10)
        );
        assert_eq!(result.traits.value(BaseTrait::Knowledge), 40);
        assert_eq!(result.applied[0].trait_id, "knowledge.general");
        assert!(result.traits.invariant_holds());
    }

    #[test]
    fn test_revert_prunes_zero_subcategories() {
        // Deleting the physics memory removes the subcategory
        // entirely instead of keeping an explicit zero.
        let applied = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("knowledge.physics", 30)],
        );
        let reverted = revert_changes(&applied.traits, &applied.applied);
        assert_eq!(
            reverted.traits.subcategory(BaseTrait::Knowledge, "physics"),
            None
        );
        assert_eq!(reverted.traits.value(BaseTrait::Knowledge), 0);
        assert!(reverted.traits.invariant_holds());
    }

    #[test]
    fn test_revert_uses_actual_delta_not_requested() {
        // Push courage to the cap, then revert: only the realized +10
        // comes back off, not the requested +25.
        let first = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("courage", 90)],
        );
        let second = apply_changes(&first.traits, &[TraitChange::new("courage", 25)]);
        let reverted = revert_changes(&second.traits, &second.applied);
        assert_eq!(reverted.traits.value(BaseTrait::Courage), 90);
    }

    #[test]
    fn test_forward_apply_keeps_explicit_zero() {
        // A forward change that lands a new subcategory on 0 keeps the
        // explicit zero entry; only reversal prunes.
        let result = apply_changes(
            &PersonalityTraits::new(),
            &[TraitChange::new("knowledge.chemistry", -5)],
        );
        assert_eq!(
            result.traits.subcategory(BaseTrait::Knowledge, "chemistry"),
            Some(0)
        );
    }

    #[test]
    fn test_partial_revert_keeps_other_subcategories() {
        let built = apply_changes(
            &PersonalityTraits::new(),
            &[
                TraitChange::new("knowledge.physics", 30),
                TraitChange::new("knowledge.biology", 20),
            ],
        );
        let physics_only: Vec<_> = built
            .applied
            .iter()
            .filter(|a| a.trait_id == "knowledge.physics")
            .cloned()
            .collect();
        let reverted = revert_changes(&built.traits, &physics_only);
        assert_eq!(
            reverted.traits.subcategory(BaseTrait::Knowledge, "physics"),
            None
        );
        assert_eq!(
            reverted.traits.subcategory(BaseTrait::Knowledge, "biology"),
            Some(20)
        );
        assert_eq!(reverted.traits.value(BaseTrait::Knowledge), 20);
    }
}
