//! Character Pool and Matching
//!
//! Provides the shared character pool types, requirement extraction
//! from story skeletons, and the constrained matching engine that
//! assigns pool characters and user avatars to skeleton placeholders.

pub mod catalog;
pub mod errors;
pub mod matching;
pub mod requirements;
pub mod types;

pub use errors::MatchError;
pub use matching::{MatchContext, MatchOutcome, MatchingEngine, UnmatchedRequirement};
pub use requirements::{AgeCategory, CharacterRequirement, GenderRequirement};
pub use types::{
    Candidate, CharacterAssignment, CharacterId, CharacterRole, CharacterTemplate, Gender,
    ResolvedCharacter, SpeciesClass, VisualProfile,
};
