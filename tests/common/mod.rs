//! Shared fixtures and mock collaborators for integration tests.

use async_trait::async_trait;
use serde_json::json;

use fableweaver::core::characters::types::{AvatarSnapshot, CharacterId, Gender, VisualProfile};
use fableweaver::core::pipeline::context::{ChildProfile, StoryConfig, StoryLength, StoryRequest};
use fableweaver::core::services::{
    GeneratedImage, GenerationRequest, GenerationResponse, ImageDimensions,
    ImageGenerationService, ServiceError, SpeechItem, SpeechResult, SpeechService,
    TextGenerationService, TokenUsage,
};

pub fn avatar() -> AvatarSnapshot {
    AvatarSnapshot {
        id: CharacterId::new("avatar-mia"),
        name: "Mia".to_string(),
        gender: Gender::Female,
        visual_profile: VisualProfile::Human {
            age_years: 7,
            hair: "brown".to_string(),
            eyes: "green".to_string(),
            clothing: "a yellow raincoat".to_string(),
        },
        image_url: Some("https://img.example/mia.png".to_string()),
    }
}

pub fn request(use_fairy_tale_template: bool) -> StoryRequest {
    StoryRequest {
        avatar: avatar(),
        child: ChildProfile {
            name: "Mia".to_string(),
            age_years: 7,
        },
        config: StoryConfig {
            genre: "adventure".to_string(),
            setting: "forest".to_string(),
            length: StoryLength::Medium,
            use_fairy_tale_template,
        },
    }
}

// ============================================================================
// Mock Text Generation
// ============================================================================

/// Deterministic text service: answers by prompt shape, optionally
/// failing on prompts containing a marker.
pub struct MockTextService {
    pub fail_on: Option<&'static str>,
}

impl MockTextService {
    pub fn reliable() -> Self {
        Self { fail_on: None }
    }

    pub fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_on: Some(marker),
        }
    }
}

#[async_trait]
impl TextGenerationService for MockTextService {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError> {
        if let Some(marker) = self.fail_on {
            if request.prompt.contains(marker) {
                return Err(ServiceError::http(503, "mock outage"));
            }
        }

        let text = if request.prompt.contains("Select the fairy tale") {
            json!({
                "fairyTaleId": "ft-star-coins",
                "title": "The Star Coins",
                "matchScore": 0.93,
                "matchReason": "The template's nighttime forest journey mirrors the requested setting and suits a seven year old hero well.",
                "ageMin": 4,
                "ageMax": 9,
                "genre": "adventure",
            })
            .to_string()
        } else if request.prompt.contains("story skeleton") {
            json!({
                "title": "Mia and the Moon Fox",
                "summary": "Mia follows a silver fox deep into the night forest to bring the stars home.",
                "heroPlaceholder": "{{HERO}}",
                "supportingCharacterRequirements": [
                    {
                        "placeholder": "{{GUIDE}}",
                        "visualHints": "alter mensch, weise",
                        "chapterIndex": 1
                    },
                    {
                        "placeholder": "{{COMPANION}}",
                        "visualHints": "ein fuchs mit rotem fell",
                        "chapterIndex": 0
                    }
                ],
                "chapters": (0..5).map(|i| json!({
                    "index": i,
                    "title": format!("Chapter {}", i + 1),
                    "synopsis": "Mia and her companions press deeper into the forest.",
                    "placeholders": ["{{HERO}}"],
                })).collect::<Vec<_>>(),
            })
            .to_string()
        } else if request.prompt.contains("Write chapter") {
            json!({
                "title": "Deeper Into the Woods",
                "text": "\"Look!\" whispered Mia. The fox stopped at the edge of the clearing. \
                         Far beyond the silver birches, where the moonlight pooled like spilled milk, \
                         something glittered between the roots of the oldest tree in the forest. \
                         She crept closer. Every step crackled in the frosty leaves, and every \
                         crackle made her heart drum faster against her ribs.",
            })
            .to_string()
        } else {
            json!({ "text": "unrecognized prompt" }).to_string()
        };

        Ok(GenerationResponse {
            text,
            usage: TokenUsage {
                prompt_tokens: 250,
                completion_tokens: 600,
            },
            duration_ms: 12_000,
        })
    }
}

// ============================================================================
// Mock Image Generation
// ============================================================================

/// Image service that succeeds, optionally failing every nth call.
pub struct MockImageService {
    pub fail_all: bool,
}

impl MockImageService {
    pub fn reliable() -> Self {
        Self { fail_all: false }
    }
}

#[async_trait]
impl ImageGenerationService for MockImageService {
    async fn generate(
        &self,
        prompt: &str,
        dimensions: ImageDimensions,
    ) -> Result<GeneratedImage, ServiceError> {
        if self.fail_all {
            return Err(ServiceError::http(500, "mock render farm down"));
        }
        Ok(GeneratedImage {
            url: format!(
                "https://img.example/{}x{}/{}.png",
                dimensions.width,
                dimensions.height,
                prompt.len()
            ),
            duration_ms: 4_000,
        })
    }
}

// ============================================================================
// Mock Speech Synthesis
// ============================================================================

/// Speech service where the last item of every batch fails, to
/// exercise per-item error handling.
pub struct MockSpeechService;

#[async_trait]
impl SpeechService for MockSpeechService {
    async fn synthesize(&self, items: Vec<SpeechItem>) -> Result<Vec<SpeechResult>, ServiceError> {
        let last = items.len().saturating_sub(1);
        Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                if i == last && last > 0 {
                    SpeechResult {
                        id: item.id,
                        audio_url: None,
                        error: Some("mock voice unavailable".to_string()),
                    }
                } else {
                    SpeechResult {
                        id: item.id.clone(),
                        audio_url: Some(format!("https://audio.example/{}.mp3", item.id)),
                        error: None,
                    }
                }
            })
            .collect())
    }
}
