//! Trait Alias Resolution
//!
//! Content sources label trait effects inconsistently: German and
//! English synonyms, legacy names from older content versions. The
//! alias table maps every known synonym to its canonical base trait
//! and is compiled once at first use. Unknown ids are a typed error,
//! never a silent null.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::errors::TraitError;
use super::types::BaseTrait;

/// Synonym table. Canonical ids resolve to themselves via
/// `BaseTrait::parse`, so only true aliases are listed here.
const ALIASES: &[(&str, BaseTrait)] = &[
    // German content labels
    ("wissen", BaseTrait::Knowledge),
    ("kreativität", BaseTrait::Creativity),
    ("wortschatz", BaseTrait::Vocabulary),
    ("mut", BaseTrait::Courage),
    ("neugier", BaseTrait::Curiosity),
    ("teamgeist", BaseTrait::Teamwork),
    ("empathie", BaseTrait::Empathy),
    ("ausdauer", BaseTrait::Persistence),
    ("logik", BaseTrait::Logic),
    // English synonyms seen in older content
    ("bravery", BaseTrait::Courage),
    ("imagination", BaseTrait::Creativity),
    ("words", BaseTrait::Vocabulary),
    ("cooperation", BaseTrait::Teamwork),
    ("compassion", BaseTrait::Empathy),
    ("perseverance", BaseTrait::Persistence),
    ("reasoning", BaseTrait::Logic),
];

static ALIAS_TABLE: OnceLock<HashMap<&'static str, BaseTrait>> = OnceLock::new();

fn alias_table() -> &'static HashMap<&'static str, BaseTrait> {
    ALIAS_TABLE.get_or_init(|| ALIASES.iter().copied().collect())
}

/// Resolve a base-trait id or alias to its canonical trait.
pub fn resolve_base(id: &str) -> Result<BaseTrait, TraitError> {
    let normalized = id.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(TraitError::malformed(id));
    }
    BaseTrait::parse(&normalized)
        .or_else(|| alias_table().get(normalized.as_str()).copied())
        .ok_or_else(|| TraitError::unknown(id))
}

/// Resolve a full trait id, which may be hierarchical
/// (`base.subcategory`). Returns the canonical base and the normalized
/// subcategory name, if present.
pub fn resolve(id: &str) -> Result<(BaseTrait, Option<String>), TraitError> {
    let trimmed = id.trim();
    match trimmed.split_once('.') {
        None => Ok((resolve_base(trimmed)?, None)),
        Some((base, sub)) => {
            let sub = sub.trim().to_lowercase();
            if sub.is_empty() || sub.contains('.') {
                return Err(TraitError::malformed(id));
            }
            Ok((resolve_base(base)?, Some(sub)))
        }
    }
}
