//! Avatar database operations
//!
//! Stores avatars with their evolving trait structures and the
//! append-only memory records. The memory natural key
//! (avatar, content, content type) is enforced by a unique index, and
//! deleting a memory reverses its recorded deltas through the merge
//! engine before the row goes away.

use chrono::Utc;

use crate::core::characters::types::{AvatarSnapshot, CharacterId, Gender, VisualProfile};
use crate::core::personality::memory::{AvatarMemory, ContentType};
use crate::core::personality::merge;
use crate::core::personality::types::{AppliedChange, PersonalityTraits};

use super::models::{AvatarMemoryRecord, AvatarRecord};
use super::{decode_err, Database};

/// Extension trait for avatar-related database operations
pub trait AvatarOps {
    fn save_avatar(
        &self,
        snapshot: &AvatarSnapshot,
        traits: &PersonalityTraits,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn get_avatar(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<(AvatarSnapshot, PersonalityTraits)>, sqlx::Error>>
           + Send;

    fn update_traits(
        &self,
        id: &str,
        traits: &PersonalityTraits,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Append a memory. Returns false when the natural key already
    /// exists (the content's effects were applied before).
    fn append_memory(
        &self,
        memory: &AvatarMemory,
    ) -> impl std::future::Future<Output = Result<bool, sqlx::Error>> + Send;

    fn list_memories(
        &self,
        avatar_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<AvatarMemory>, sqlx::Error>> + Send;

    /// Delete a memory and reverse its recorded trait deltas exactly.
    /// Returns the removed memory, or None when the id is unknown.
    fn delete_memory_and_revert(
        &self,
        memory_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<AvatarMemory>, sqlx::Error>> + Send;
}

impl AvatarOps for Database {
    async fn save_avatar(
        &self,
        snapshot: &AvatarSnapshot,
        traits: &PersonalityTraits,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO avatars
            (id, name, gender, visual_profile, image_url, traits, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, COALESCE((SELECT created_at FROM avatars WHERE id = ?), ?), ?)
            "#,
        )
        .bind(snapshot.id.as_str())
        .bind(&snapshot.name)
        .bind(gender_str(snapshot.gender))
        .bind(serde_json::to_string(&snapshot.visual_profile).map_err(decode_err)?)
        .bind(&snapshot.image_url)
        .bind(serde_json::to_string(traits).map_err(decode_err)?)
        .bind(snapshot.id.as_str())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_avatar(
        &self,
        id: &str,
    ) -> Result<Option<(AvatarSnapshot, PersonalityTraits)>, sqlx::Error> {
        let record = sqlx::query_as::<_, AvatarRecord>("SELECT * FROM avatars WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let Some(record) = record else {
            return Ok(None);
        };

        let visual_profile: VisualProfile =
            serde_json::from_str(&record.visual_profile).map_err(decode_err)?;
        let gender: Gender =
            serde_json::from_value(serde_json::Value::String(record.gender)).map_err(decode_err)?;
        let traits: PersonalityTraits =
            serde_json::from_str(&record.traits).map_err(decode_err)?;

        Ok(Some((
            AvatarSnapshot {
                id: CharacterId::new(record.id),
                name: record.name,
                gender,
                visual_profile,
                image_url: record.image_url,
            },
            traits,
        )))
    }

    async fn update_traits(&self, id: &str, traits: &PersonalityTraits) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE avatars SET traits = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(traits).map_err(decode_err)?)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn append_memory(&self, memory: &AvatarMemory) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO avatar_memories
            (id, avatar_id, content_id, content_type, applied, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&memory.id)
        .bind(&memory.avatar_id)
        .bind(&memory.content_id)
        .bind(memory.content_type.as_str())
        .bind(serde_json::to_string(&memory.applied).map_err(decode_err)?)
        .bind(memory.created_at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_memories(&self, avatar_id: &str) -> Result<Vec<AvatarMemory>, sqlx::Error> {
        let records = sqlx::query_as::<_, AvatarMemoryRecord>(
            "SELECT * FROM avatar_memories WHERE avatar_id = ? ORDER BY created_at",
        )
        .bind(avatar_id)
        .fetch_all(self.pool())
        .await?;
        records.into_iter().map(memory_from_record).collect()
    }

    async fn delete_memory_and_revert(
        &self,
        memory_id: &str,
    ) -> Result<Option<AvatarMemory>, sqlx::Error> {
        let record = sqlx::query_as::<_, AvatarMemoryRecord>(
            "SELECT * FROM avatar_memories WHERE id = ?",
        )
        .bind(memory_id)
        .fetch_optional(self.pool())
        .await?;
        let Some(record) = record else {
            return Ok(None);
        };
        let memory = memory_from_record(record)?;

        if let Some((_, traits)) = self.get_avatar(&memory.avatar_id).await? {
            let reverted = merge::revert_changes(&traits, &memory.applied);
            self.update_traits(&memory.avatar_id, &reverted.traits).await?;
        }

        sqlx::query("DELETE FROM avatar_memories WHERE id = ?")
            .bind(memory_id)
            .execute(self.pool())
            .await?;
        Ok(Some(memory))
    }
}

fn gender_str(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Neutral => "neutral",
    }
}

fn memory_from_record(record: AvatarMemoryRecord) -> Result<AvatarMemory, sqlx::Error> {
    let applied: Vec<AppliedChange> =
        serde_json::from_str(&record.applied).map_err(decode_err)?;
    let content_type = ContentType::parse(&record.content_type).ok_or_else(|| {
        sqlx::Error::Decode(format!("unknown content type '{}'", record.content_type).into())
    })?;
    Ok(AvatarMemory {
        id: record.id,
        avatar_id: record.avatar_id,
        content_id: record.content_id,
        content_type,
        applied,
        created_at: record.created_at,
    })
}
