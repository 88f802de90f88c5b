//! Prompt Construction
//!
//! Builds the prompts sent to the generation collaborators. The
//! structural markers defined here (the character-consistency block,
//! age descriptors, genre costume keywords) are also what the scoring
//! engine checks image prompts for, so both sides share these
//! definitions.

use crate::core::characters::types::CharacterAssignment;

use super::context::{ChildProfile, StoryConfig, StoryRequest};
use super::skeleton::{ChapterOutline, FairyTaleSelection, StorySkeleton};

/// Header of the character-consistency block embedded in every image
/// prompt. Scoring checks prompts for this marker.
pub const CONSISTENCY_HEADER: &str = "CHARACTER CONSISTENCY:";

/// Age descriptor ("7-year-old") included in image prompts so faces
/// and proportions stay age-appropriate.
pub fn age_descriptor(age_years: u8) -> String {
    format!("{age_years}-year-old")
}

/// Costume/wardrobe keywords per genre, checked by the scoring engine.
pub fn genre_costume_keywords(genre: &str) -> &'static [&'static str] {
    match genre.to_lowercase().as_str() {
        "adventure" => &["explorer outfit", "sturdy boots", "satchel"],
        "friendship" => &["cozy sweater", "bright scarf"],
        "mystery" => &["detective coat", "magnifying glass"],
        "wonder" | "fantasy" => &["starry cloak", "glowing trim"],
        "nature" => &["rain jacket", "field hat"],
        _ => &["storybook clothes"],
    }
}

// ============================================================================
// Text Prompts
// ============================================================================

/// Phase 0: ask the service to pick the best-fitting fairy tale.
pub fn fairy_tale_selection_prompt(request: &StoryRequest) -> String {
    format!(
        "Select the fairy tale best suited as a template for a personalized \
         children's story.\n\
         Child age: {age}\n\
         Genre: {genre}\n\
         Setting: {setting}\n\
         Respond with JSON: {{\"fairyTaleId\", \"title\", \"matchScore\" (0.0-1.0), \
         \"matchReason\" (explain the fit in at least two sentences), \
         \"ageMin\", \"ageMax\", \"genre\"}}.",
        age = request.child.age_years,
        genre = request.config.genre,
        setting = request.config.setting,
    )
}

/// Phase 1: ask for the story skeleton.
pub fn skeleton_prompt(request: &StoryRequest, fairy_tale: Option<&FairyTaleSelection>) -> String {
    let chapters = request.config.length.expected_chapters();
    let template_line = match fairy_tale {
        Some(tale) => format!("Remix the fairy tale \"{}\" with a fresh twist.\n", tale.title),
        None => String::new(),
    };
    format!(
        "Create a children's story skeleton.\n\
         {template_line}\
         Hero: {hero}, age {age}.\n\
         Genre: {genre}. Setting: {setting}.\n\
         Use {min}-{max} chapters. Mark the hero as {{{{HERO}}}} and every \
         supporting character with its own {{{{UPPER_SNAKE}}}} placeholder.\n\
         Respond with JSON: {{\"title\", \"summary\", \"heroPlaceholder\", \
         \"supportingCharacterRequirements\": [{{\"placeholder\", \"visualHints\", \
         \"ageCategory\"?, \"gender\"?, \"chapterIndex\"}}], \
         \"chapters\": [{{\"index\", \"title\", \"synopsis\", \"placeholders\"}}]}}.",
        hero = request.child.name,
        age = request.child.age_years,
        genre = request.config.genre,
        setting = request.config.setting,
        min = chapters.start(),
        max = chapters.end(),
    )
}

/// Phase 3: finalize one chapter's prose.
pub fn chapter_prompt(
    request: &StoryRequest,
    skeleton: &StorySkeleton,
    outline: &ChapterOutline,
    assignments: &[CharacterAssignment],
) -> String {
    let mut cast = String::new();
    for assignment in assignments {
        cast.push_str(&format!(
            "- {} is {} ({})\n",
            assignment.placeholder,
            assignment.character.name,
            assignment.character.visual_profile.summary(),
        ));
    }
    format!(
        "Write chapter {index} of \"{title}\" for a {age}-year-old.\n\
         Synopsis: {synopsis}\n\
         Cast:\n{cast}\
         Use the characters' real names, include spoken dialogue, and vary \
         sentence length. Respond with JSON: {{\"title\", \"text\"}}.",
        index = outline.index + 1,
        title = skeleton.title,
        age = request.child.age_years,
        synopsis = outline.synopsis,
    )
}

// ============================================================================
// Image Prompts
// ============================================================================

/// The consistency block shared by all image prompts of one story, so
/// every illustration renders the same cast the same way.
pub fn consistency_block(child: &ChildProfile, assignments: &[CharacterAssignment]) -> String {
    let mut block = format!(
        "{CONSISTENCY_HEADER}\n- {name}: {age} child, the hero\n",
        name = child.name,
        age = age_descriptor(child.age_years),
    );
    for assignment in assignments {
        if assignment.character.is_avatar {
            continue;
        }
        block.push_str(&format!(
            "- {}: {}\n",
            assignment.character.name,
            assignment.character.visual_profile.summary(),
        ));
    }
    block
}

/// Illustration prompt for one chapter.
pub fn chapter_image_prompt(
    config: &StoryConfig,
    child: &ChildProfile,
    chapter_title: &str,
    assignments: &[CharacterAssignment],
) -> String {
    let costumes = genre_costume_keywords(&config.genre).join(", ");
    format!(
        "Children's book illustration, {setting} scene: {title}.\n\
         {consistency}\
         Wardrobe: {costumes}.\n\
         Soft colors, warm light, no text in the image.",
        setting = config.setting,
        title = chapter_title,
        consistency = consistency_block(child, assignments),
    )
}

/// Cover illustration prompt.
pub fn cover_image_prompt(
    config: &StoryConfig,
    child: &ChildProfile,
    story_title: &str,
    assignments: &[CharacterAssignment],
) -> String {
    let costumes = genre_costume_keywords(&config.genre).join(", ");
    format!(
        "Book cover illustration for \"{title}\", {setting} backdrop.\n\
         {consistency}\
         Wardrobe: {costumes}.\n\
         The hero front and center, warm inviting palette.",
        title = story_title,
        setting = config.setting,
        consistency = consistency_block(child, assignments),
    )
}
