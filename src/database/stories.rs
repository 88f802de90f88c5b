//! Story and chapter database operations
//!
//! Stories keep their status (`generating`, `complete`, `error`)
//! through the whole run. A failed run leaves its partial chapters
//! visible under the `error` status instead of rolling them back.

use chrono::Utc;

use super::models::{ChapterRecord, StoryRecord};
use super::Database;

/// Extension trait for story-related database operations
pub trait StoryOps {
    fn create_story(
        &self,
        story: &StoryRecord,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn get_story(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<StoryRecord>, sqlx::Error>> + Send;

    fn set_story_status(
        &self,
        id: &str,
        status: &str,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Fill in the fields phase 1 decides: title, planned chapter
    /// count, and the fairy tale title when a template was used.
    fn set_story_details(
        &self,
        id: &str,
        title: &str,
        planned_chapters: i64,
        fairy_tale_title: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn set_cover(
        &self,
        id: &str,
        url: &str,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn upsert_chapter(
        &self,
        chapter: &ChapterRecord,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn set_chapter_image(
        &self,
        story_id: &str,
        chapter_index: i64,
        url: &str,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn set_chapter_audio(
        &self,
        story_id: &str,
        chapter_index: i64,
        url: &str,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn list_chapters(
        &self,
        story_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChapterRecord>, sqlx::Error>> + Send;

    /// Most recent stories first, excluding runs still in flight.
    fn list_recent_stories(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<StoryRecord>, sqlx::Error>> + Send;
}

impl StoryOps for Database {
    async fn create_story(&self, story: &StoryRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO stories
            (id, avatar_id, title, genre, setting, length, status, fairy_tale_title,
             planned_chapters, child_age, cover_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&story.id)
        .bind(&story.avatar_id)
        .bind(&story.title)
        .bind(&story.genre)
        .bind(&story.setting)
        .bind(&story.length)
        .bind(&story.status)
        .bind(&story.fairy_tale_title)
        .bind(story.planned_chapters)
        .bind(story.child_age)
        .bind(&story.cover_url)
        .bind(story.created_at)
        .bind(story.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_story(&self, id: &str) -> Result<Option<StoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, StoryRecord>("SELECT * FROM stories WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn set_story_status(&self, id: &str, status: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE stories SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn set_story_details(
        &self,
        id: &str,
        title: &str,
        planned_chapters: i64,
        fairy_tale_title: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE stories
            SET title = ?, planned_chapters = ?, fairy_tale_title = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(planned_chapters)
        .bind(fairy_tale_title)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_cover(&self, id: &str, url: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE stories SET cover_url = ?, updated_at = ? WHERE id = ?")
            .bind(url)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn upsert_chapter(&self, chapter: &ChapterRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO chapters
            (id, story_id, chapter_index, title, text, image_url, image_prompt, audio_url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chapter.id)
        .bind(&chapter.story_id)
        .bind(chapter.chapter_index)
        .bind(&chapter.title)
        .bind(&chapter.text)
        .bind(&chapter.image_url)
        .bind(&chapter.image_prompt)
        .bind(&chapter.audio_url)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_chapter_image(
        &self,
        story_id: &str,
        chapter_index: i64,
        url: &str,
        prompt: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE chapters SET image_url = ?, image_prompt = ? WHERE story_id = ? AND chapter_index = ?",
        )
        .bind(url)
        .bind(prompt)
        .bind(story_id)
        .bind(chapter_index)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_chapter_audio(
        &self,
        story_id: &str,
        chapter_index: i64,
        url: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chapters SET audio_url = ? WHERE story_id = ? AND chapter_index = ?")
            .bind(url)
            .bind(story_id)
            .bind(chapter_index)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn list_chapters(&self, story_id: &str) -> Result<Vec<ChapterRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChapterRecord>(
            "SELECT * FROM chapters WHERE story_id = ? ORDER BY chapter_index",
        )
        .bind(story_id)
        .fetch_all(self.pool())
        .await
    }

    async fn list_recent_stories(&self, limit: u32) -> Result<Vec<StoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, StoryRecord>(
            r#"
            SELECT * FROM stories
            WHERE status != 'generating'
            ORDER BY created_at DESC, id
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::characters::types::{AvatarSnapshot, CharacterId, Gender, VisualProfile};
    use crate::core::pipeline::context::{ChildProfile, StoryConfig, StoryRequest};

    fn request() -> StoryRequest {
        StoryRequest {
            avatar: AvatarSnapshot {
                id: CharacterId::new("avatar-mia"),
                name: "Mia".to_string(),
                gender: Gender::Female,
                visual_profile: VisualProfile::Human {
                    age_years: 7,
                    hair: "brown".to_string(),
                    eyes: "green".to_string(),
                    clothing: "raincoat".to_string(),
                },
                image_url: None,
            },
            child: ChildProfile {
                name: "Mia".to_string(),
                age_years: 7,
            },
            config: StoryConfig {
                genre: "adventure".to_string(),
                setting: "forest".to_string(),
                length: Default::default(),
                use_fairy_tale_template: false,
            },
        }
    }

    #[tokio::test]
    async fn test_story_lifecycle() {
        let db = Database::open_in_memory().await.unwrap();
        let record = StoryRecord::new_generating("story-1", &request());
        db.create_story(&record).await.unwrap();

        db.set_story_details("story-1", "Mia and the Moon Fox", 5, None)
            .await
            .unwrap();
        db.set_story_status("story-1", "error").await.unwrap();

        let stored = db.get_story("story-1").await.unwrap().unwrap();
        assert_eq!(stored.title, "Mia and the Moon Fox");
        assert_eq!(stored.status, "error");
        assert_eq!(stored.planned_chapters, 5);
        assert_eq!(stored.child_age, 7);
    }

    #[tokio::test]
    async fn test_chapter_upsert_and_media() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_story(&StoryRecord::new_generating("story-1", &request()))
            .await
            .unwrap();

        let chapter = ChapterRecord {
            id: "story-1-0".to_string(),
            story_id: "story-1".to_string(),
            chapter_index: 0,
            title: "The Silver Trail".to_string(),
            text: "Once upon a time...".to_string(),
            image_url: None,
            image_prompt: None,
            audio_url: None,
        };
        db.upsert_chapter(&chapter).await.unwrap();
        db.set_chapter_image("story-1", 0, "https://img.example/0.png", "a forest")
            .await
            .unwrap();
        db.set_chapter_audio("story-1", 0, "https://audio.example/0.mp3")
            .await
            .unwrap();

        let chapters = db.list_chapters("story-1").await.unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].image_url.as_deref(), Some("https://img.example/0.png"));
        assert_eq!(chapters[0].audio_url.as_deref(), Some("https://audio.example/0.mp3"));
    }

    #[tokio::test]
    async fn test_recent_stories_exclude_in_flight() {
        let db = Database::open_in_memory().await.unwrap();
        let mut a = StoryRecord::new_generating("story-a", &request());
        a.status = "complete".to_string();
        db.create_story(&a).await.unwrap();
        db.create_story(&StoryRecord::new_generating("story-b", &request()))
            .await
            .unwrap();

        let recent = db.list_recent_stories(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "story-a");
    }
}
