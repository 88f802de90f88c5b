//! Phase 4 Rubric: Image Generation
//!
//! Criteria (max 10): chapter image completion (3), cover presence
//! (2), consistency-block coverage in prompts (2), age descriptors in
//! prompts (2), genre costume keywords (1).

use crate::core::pipeline::logs::PhaseLog;
use crate::core::pipeline::prompts::{genre_costume_keywords, CONSISTENCY_HEADER};
use crate::core::pipeline::skeleton::ImageManifest;

use super::types::{PhaseScore, ScoreContext};

/// Marker age descriptors share ("7-year-old").
const AGE_MARKER: &str = "-year-old";

pub fn score(log: Option<&PhaseLog>, context: &ScoreContext) -> PhaseScore {
    let mut sheet = PhaseScore::builder();

    let manifest: Option<ImageManifest> = log
        .and_then(|l| l.response.get("images"))
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    let Some(manifest) = manifest else {
        sheet.criterion("completion", 0.0, 3.0, "no image manifest recorded");
        sheet.criterion("cover", 0.0, 2.0, "no image manifest recorded");
        sheet.criterion("consistency", 0.0, 2.0, "no image manifest recorded");
        sheet.criterion("age_descriptors", 0.0, 2.0, "no image manifest recorded");
        sheet.criterion("genre_costumes", 0.0, 1.0, "no image manifest recorded");
        sheet.issue("Phase 4 produced no image manifest");
        return sheet.finalize();
    };

    // Completion ratio over chapter images.
    let total = manifest.total_images();
    let successful = manifest.successful_images();
    if total == 0 {
        sheet.criterion("completion", 0.0, 3.0, "no chapter images attempted");
        sheet.issue("No chapter images were generated");
    } else {
        let ratio = successful as f64 / total as f64;
        let completion = if successful == total {
            3.0
        } else if ratio >= 0.9 {
            2.5
        } else if ratio >= 0.75 {
            2.0
        } else {
            1.0
        };
        sheet.criterion(
            "completion",
            completion,
            3.0,
            format!("{successful}/{total} chapter images generated"),
        );
        if successful < total {
            sheet.issue(format!("{} chapter image(s) failed", total - successful));
        }
    }

    // Cover image.
    let has_cover = manifest.cover_url.is_some();
    sheet.criterion(
        "cover",
        if has_cover { 2.0 } else { 0.0 },
        2.0,
        if has_cover { "cover image present" } else { "cover image missing" },
    );
    if !has_cover {
        sheet.recommend("Regenerate the cover image; stories without covers underperform");
    }

    // Prompt checks run over every prompt we have (chapters + cover).
    let mut prompts: Vec<&str> = manifest
        .chapter_images
        .iter()
        .map(|i| i.prompt.as_str())
        .filter(|p| !p.is_empty())
        .collect();
    if let Some(cover_prompt) = manifest.cover_prompt.as_deref() {
        if !cover_prompt.is_empty() {
            prompts.push(cover_prompt);
        }
    }

    if prompts.is_empty() {
        sheet.criterion("consistency", 0.0, 2.0, "no prompts recorded");
        sheet.criterion("age_descriptors", 0.0, 2.0, "no prompts recorded");
        sheet.criterion("genre_costumes", 0.0, 1.0, "no prompts recorded");
        sheet.issue("Image prompts were not recorded; consistency cannot be verified");
        return sheet.finalize();
    }

    let with_block = prompts
        .iter()
        .filter(|p| p.contains(CONSISTENCY_HEADER))
        .count();
    let block_ratio = with_block as f64 / prompts.len() as f64;
    sheet.criterion(
        "consistency",
        block_ratio * 2.0,
        2.0,
        format!("{with_block}/{} prompts carry the consistency block", prompts.len()),
    );
    if with_block < prompts.len() {
        sheet.issue("Some image prompts lack the character-consistency block");
    }

    let with_age = prompts.iter().filter(|p| p.contains(AGE_MARKER)).count();
    let age_ratio = with_age as f64 / prompts.len() as f64;
    sheet.criterion(
        "age_descriptors",
        age_ratio * 2.0,
        2.0,
        format!("{with_age}/{} prompts carry an age descriptor", prompts.len()),
    );
    if with_age < prompts.len() {
        sheet.issue("Some image prompts lack an age descriptor for the hero");
    }

    let keywords = genre_costume_keywords(&context.genre);
    let with_costume = prompts
        .iter()
        .filter(|p| keywords.iter().any(|k| p.contains(k)))
        .count();
    let costume_ratio = with_costume as f64 / prompts.len() as f64;
    sheet.criterion(
        "genre_costumes",
        if costume_ratio >= 0.5 { 1.0 } else { 0.0 },
        1.0,
        format!("{with_costume}/{} prompts carry genre wardrobe keywords", prompts.len()),
    );
    if costume_ratio < 0.5 {
        sheet.recommend(format!(
            "Work {} wardrobe cues into the image prompts",
            context.genre
        ));
    }

    sheet.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::phase::GenerationPhase;
    use crate::core::pipeline::skeleton::ChapterImage;
    use serde_json::json;

    fn context() -> ScoreContext {
        ScoreContext {
            story_id: "s".to_string(),
            story_title: "T".to_string(),
            child_age: 7,
            genre: "adventure".to_string(),
            length: Default::default(),
            config: json!({}),
        }
    }

    fn good_prompt() -> String {
        format!(
            "Children's book illustration. {CONSISTENCY_HEADER}\n- Mia: 7-year-old child\n\
             Wardrobe: explorer outfit."
        )
    }

    fn manifest(total: usize, successful: usize) -> ImageManifest {
        ImageManifest {
            cover_url: Some("https://img.example/cover.png".to_string()),
            cover_prompt: Some(good_prompt()),
            chapter_images: (0..total)
                .map(|i| ChapterImage {
                    chapter_index: i as u32,
                    prompt: good_prompt(),
                    url: if i < successful {
                        Some(format!("https://img.example/{i}.png"))
                    } else {
                        None
                    },
                    error: if i < successful { None } else { Some("timeout".to_string()) },
                })
                .collect(),
        }
    }

    fn log_for(manifest: &ImageManifest) -> PhaseLog {
        PhaseLog::live(
            "story-1",
            GenerationPhase::ImageGeneration,
            json!({}),
            json!({ "images": manifest }),
            60_000,
        )
    }

    #[test]
    fn test_perfect_manifest_scores_ten() {
        // 5/5 images, cover present, every prompt with the consistency
        // block and age markers, genre keywords in at least half.
        let result = score(Some(&log_for(&manifest(5, 5))), &context());
        assert_eq!(result.score, 10.0, "details: {:?}", result.details);
    }

    #[test]
    fn test_completion_tiers() {
        for (total, ok, expected) in [(10, 10, 3.0), (10, 9, 2.5), (10, 8, 2.0), (10, 5, 1.0)] {
            let result = score(Some(&log_for(&manifest(total, ok))), &context());
            assert_eq!(result.details["completion"].score, expected, "{ok}/{total}");
        }
    }

    #[test]
    fn test_missing_cover() {
        let mut m = manifest(5, 5);
        m.cover_url = None;
        let result = score(Some(&log_for(&m)), &context());
        assert_eq!(result.details["cover"].score, 0.0);
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_consistency_ratio() {
        let mut m = manifest(4, 4);
        m.chapter_images[0].prompt = "plain prompt with explorer outfit for a 7-year-old".to_string();
        let result = score(Some(&log_for(&m)), &context());
        // 4 of 5 prompts (incl. cover) carry the block
        assert_eq!(result.details["consistency"].score, 1.6);
        assert!(result.issues.iter().any(|i| i.contains("consistency")));
    }

    #[test]
    fn test_genre_costume_threshold() {
        let mut m = manifest(4, 4);
        for image in &mut m.chapter_images {
            image.prompt = format!("{CONSISTENCY_HEADER} 7-year-old, plain clothes");
        }
        m.cover_prompt = Some(format!("{CONSISTENCY_HEADER} 7-year-old, plain clothes"));
        let result = score(Some(&log_for(&m)), &context());
        assert_eq!(result.details["genre_costumes"].score, 0.0);
    }

    #[test]
    fn test_missing_manifest() {
        let result = score(None, &context());
        assert_eq!(result.score, 0.0);
        assert!(!result.issues.is_empty());
    }
}
