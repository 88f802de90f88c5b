//! Database Records
//!
//! Row-level records for every persisted entity, with conversions to
//! and from the domain types. Structured fields (visual profiles,
//! traits, applied deltas) are stored as JSON text columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::characters::types::{
    CharacterId, CharacterRole, CharacterTemplate, Gender, VisualProfile,
};
use crate::core::pipeline::context::StoryRequest;

use super::decode_err;

// ============================================================================
// Pool Character Record
// ============================================================================

/// Pool character database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PoolCharacterRecord {
    pub id: String,
    pub name: String,
    pub role: String,
    pub archetype: String,
    pub emotional_nature: String,
    pub gender: String,
    pub visual_profile: String, // JSON
    pub image_url: Option<String>,
    pub max_screen_time: i64,
    pub available_chapters: String, // JSON
    pub canon_settings: String,     // JSON
    pub recent_usage_count: i64,
    pub total_usage_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl PoolCharacterRecord {
    pub fn from_template(template: &CharacterTemplate) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: template.id.to_string(),
            name: template.name.clone(),
            role: template.role.to_string(),
            archetype: template.archetype.clone(),
            emotional_nature: template.emotional_nature.clone(),
            gender: serde_json::to_value(template.gender)?
                .as_str()
                .unwrap_or("neutral")
                .to_string(),
            visual_profile: serde_json::to_string(&template.visual_profile)?,
            image_url: template.image_url.clone(),
            max_screen_time: template.max_screen_time as i64,
            available_chapters: serde_json::to_string(&template.available_chapters)?,
            canon_settings: serde_json::to_string(&template.canon_settings)?,
            recent_usage_count: template.recent_usage_count as i64,
            total_usage_count: template.total_usage_count as i64,
            last_used_at: template.last_used_at,
            is_active: template.is_active,
        })
    }

    pub fn into_template(self) -> Result<CharacterTemplate, sqlx::Error> {
        let visual_profile: VisualProfile =
            serde_json::from_str(&self.visual_profile).map_err(decode_err)?;
        let gender: Gender =
            serde_json::from_value(serde_json::Value::String(self.gender)).map_err(decode_err)?;
        Ok(CharacterTemplate {
            id: CharacterId::new(self.id),
            name: self.name,
            role: CharacterRole::parse(&self.role).unwrap_or(CharacterRole::Support),
            archetype: self.archetype,
            emotional_nature: self.emotional_nature,
            gender,
            visual_profile,
            image_url: self.image_url,
            max_screen_time: self.max_screen_time.clamp(0, 100) as u8,
            available_chapters: serde_json::from_str(&self.available_chapters)
                .map_err(decode_err)?,
            canon_settings: serde_json::from_str(&self.canon_settings).map_err(decode_err)?,
            recent_usage_count: self.recent_usage_count.max(0) as u32,
            total_usage_count: self.total_usage_count.max(0) as u32,
            last_used_at: self.last_used_at,
            is_active: self.is_active,
        })
    }
}

// ============================================================================
// Avatar Record
// ============================================================================

/// Avatar database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvatarRecord {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub visual_profile: String, // JSON
    pub image_url: Option<String>,
    pub traits: String, // JSON
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Avatar Memory Record
// ============================================================================

/// Avatar memory database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvatarMemoryRecord {
    pub id: String,
    pub avatar_id: String,
    pub content_id: String,
    pub content_type: String,
    pub applied: String, // JSON
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Story Record
// ============================================================================

/// Story database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoryRecord {
    pub id: String,
    pub avatar_id: String,
    pub title: String,
    pub genre: String,
    pub setting: String,
    pub length: String,
    pub status: String, // "generating", "complete", "error"
    pub fairy_tale_title: Option<String>,
    pub planned_chapters: i64,
    pub child_age: i64,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryRecord {
    /// Fresh row for a run that is about to start.
    pub fn new_generating(id: &str, request: &StoryRequest) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            avatar_id: request.avatar.id.to_string(),
            title: String::new(),
            genre: request.config.genre.clone(),
            setting: request.config.setting.clone(),
            length: request.config.length.as_str().to_string(),
            status: "generating".to_string(),
            fairy_tale_title: None,
            planned_chapters: 0,
            child_age: request.child.age_years as i64,
            cover_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Chapter Record
// ============================================================================

/// Chapter database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChapterRecord {
    pub id: String,
    pub story_id: String,
    pub chapter_index: i64,
    pub title: String,
    pub text: String,
    pub image_url: Option<String>,
    pub image_prompt: Option<String>,
    pub audio_url: Option<String>,
}

// ============================================================================
// Phase Log Record
// ============================================================================

/// Phase log database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhaseLogRecord {
    pub id: String,
    pub story_id: String,
    pub phase: String,
    pub provenance: String,
    pub request: String,  // JSON
    pub response: String, // JSON
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Score Report Record
// ============================================================================

/// Score report database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoreReportRecord {
    pub test_id: String,
    pub story_id: String,
    pub overall_score: f64,
    pub report: String, // JSON
    pub created_at: DateTime<Utc>,
}
