//! Character pool database operations
//!
//! Pool templates are seeded once and never hard-deleted; usage
//! counters are the only mutable state and are incremented with a
//! single atomic UPDATE so concurrent runs cannot lose updates.

use chrono::Utc;

use crate::core::characters::types::{CharacterId, CharacterTemplate};

use super::models::PoolCharacterRecord;
use super::{decode_err, Database};

/// Extension trait for character-pool database operations
pub trait CharacterPoolOps {
    /// Seed the pool from the fixed catalog. Idempotent: writes only
    /// when the pool table is empty. Returns the number of rows
    /// inserted.
    fn seed(
        &self,
        catalog: Vec<CharacterTemplate>,
    ) -> impl std::future::Future<Output = Result<usize, sqlx::Error>> + Send;

    /// All active pool characters, optionally narrowed to those whose
    /// canon settings allow the given story setting.
    fn list_active(
        &self,
        setting: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<CharacterTemplate>, sqlx::Error>> + Send;

    fn get_character(
        &self,
        id: &CharacterId,
    ) -> impl std::future::Future<Output = Result<Option<CharacterTemplate>, sqlx::Error>> + Send;

    /// Atomically bump both usage counters and stamp `last_used_at`.
    fn increment_usage(
        &self,
        id: &CharacterId,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Housekeeping hook: zero every `recent_usage_count` at the end
    /// of a rolling window. Returns the number of rows touched.
    fn reset_recent_usage(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, sqlx::Error>> + Send;

    /// Soft-activate or deactivate a pool character.
    fn set_active(
        &self,
        id: &CharacterId,
        active: bool,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
}

impl CharacterPoolOps for Database {
    async fn seed(&self, catalog: Vec<CharacterTemplate>) -> Result<usize, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pool_characters")
            .fetch_one(self.pool())
            .await?;
        if count > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for template in &catalog {
            let record = PoolCharacterRecord::from_template(template).map_err(decode_err)?;
            sqlx::query(
                r#"
                INSERT INTO pool_characters
                (id, name, role, archetype, emotional_nature, gender, visual_profile,
                 image_url, max_screen_time, available_chapters, canon_settings,
                 recent_usage_count, total_usage_count, last_used_at, is_active)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&record.name)
            .bind(&record.role)
            .bind(&record.archetype)
            .bind(&record.emotional_nature)
            .bind(&record.gender)
            .bind(&record.visual_profile)
            .bind(&record.image_url)
            .bind(record.max_screen_time)
            .bind(&record.available_chapters)
            .bind(&record.canon_settings)
            .bind(record.recent_usage_count)
            .bind(record.total_usage_count)
            .bind(record.last_used_at)
            .bind(record.is_active)
            .execute(self.pool())
            .await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn list_active(
        &self,
        setting: Option<&str>,
    ) -> Result<Vec<CharacterTemplate>, sqlx::Error> {
        let records = sqlx::query_as::<_, PoolCharacterRecord>(
            "SELECT * FROM pool_characters WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        let mut templates = Vec::with_capacity(records.len());
        for record in records {
            let template = record.into_template()?;
            if setting.map_or(true, |s| template.fits_setting(s)) {
                templates.push(template);
            }
        }
        Ok(templates)
    }

    async fn get_character(
        &self,
        id: &CharacterId,
    ) -> Result<Option<CharacterTemplate>, sqlx::Error> {
        let record = sqlx::query_as::<_, PoolCharacterRecord>(
            "SELECT * FROM pool_characters WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await?;
        record.map(PoolCharacterRecord::into_template).transpose()
    }

    async fn increment_usage(&self, id: &CharacterId) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE pool_characters
            SET recent_usage_count = recent_usage_count + 1,
                total_usage_count = total_usage_count + 1,
                last_used_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn reset_recent_usage(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pool_characters SET recent_usage_count = 0 WHERE recent_usage_count > 0",
        )
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn set_active(&self, id: &CharacterId, active: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE pool_characters SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
