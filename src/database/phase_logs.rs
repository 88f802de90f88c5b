//! Phase log database operations
//!
//! Append-only: one row per phase per run. Point queries serve
//! scoring; the recent-N query serves best-effort enrichment and
//! debugging.

use crate::core::pipeline::logs::{LogProvenance, PhaseLog};

use super::models::PhaseLogRecord;
use super::{decode_err, Database};

/// Extension trait for phase-log database operations
pub trait PhaseLogOps {
    fn append_log(
        &self,
        log: &PhaseLog,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn logs_for_story(
        &self,
        story_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<PhaseLog>, sqlx::Error>> + Send;

    /// The most recent `limit` logs of one phase across all stories.
    fn recent_logs(
        &self,
        phase: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<PhaseLog>, sqlx::Error>> + Send;
}

impl PhaseLogOps for Database {
    async fn append_log(&self, log: &PhaseLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO phase_logs
            (id, story_id, phase, provenance, request, response, duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.story_id)
        .bind(&log.phase)
        .bind(provenance_str(log.provenance))
        .bind(serde_json::to_string(&log.request).map_err(decode_err)?)
        .bind(serde_json::to_string(&log.response).map_err(decode_err)?)
        .bind(log.duration_ms as i64)
        .bind(log.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn logs_for_story(&self, story_id: &str) -> Result<Vec<PhaseLog>, sqlx::Error> {
        let records = sqlx::query_as::<_, PhaseLogRecord>(
            "SELECT * FROM phase_logs WHERE story_id = ? ORDER BY created_at, phase",
        )
        .bind(story_id)
        .fetch_all(self.pool())
        .await?;
        records.into_iter().map(log_from_record).collect()
    }

    async fn recent_logs(&self, phase: &str, limit: u32) -> Result<Vec<PhaseLog>, sqlx::Error> {
        let records = sqlx::query_as::<_, PhaseLogRecord>(
            "SELECT * FROM phase_logs WHERE phase = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(phase)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        records.into_iter().map(log_from_record).collect()
    }
}

fn provenance_str(provenance: LogProvenance) -> &'static str {
    match provenance {
        LogProvenance::Live => "live",
        LogProvenance::Reconstructed => "reconstructed",
    }
}

fn log_from_record(record: PhaseLogRecord) -> Result<PhaseLog, sqlx::Error> {
    Ok(PhaseLog {
        id: record.id,
        story_id: record.story_id,
        phase: record.phase,
        provenance: match record.provenance.as_str() {
            "reconstructed" => LogProvenance::Reconstructed,
            _ => LogProvenance::Live,
        },
        request: serde_json::from_str(&record.request).map_err(decode_err)?,
        response: serde_json::from_str(&record.response).map_err(decode_err)?,
        duration_ms: record.duration_ms.max(0) as u64,
        created_at: record.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::phase::GenerationPhase;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let log = PhaseLog::live(
            "story-1",
            GenerationPhase::SkeletonGeneration,
            json!({ "prompt": "..." }),
            json!({ "skeleton": { "title": "T" } }),
            32_000,
        );
        db.append_log(&log).await.unwrap();

        let logs = db.logs_for_story("story-1").await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].phase, "phase1");
        assert_eq!(logs[0].duration_ms, 32_000);
        assert_eq!(logs[0].provenance, LogProvenance::Live);
        assert_eq!(logs[0].response["skeleton"]["title"], "T");
    }

    #[tokio::test]
    async fn test_recent_logs_filter_by_phase() {
        let db = Database::open_in_memory().await.unwrap();
        for story in ["a", "b", "c"] {
            db.append_log(&PhaseLog::live(
                story,
                GenerationPhase::ImageGeneration,
                json!({}),
                json!({}),
                1,
            ))
            .await
            .unwrap();
            db.append_log(&PhaseLog::live(
                story,
                GenerationPhase::SkeletonGeneration,
                json!({}),
                json!({}),
                1,
            ))
            .await
            .unwrap();
        }

        let recent = db.recent_logs("phase4", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|l| l.phase == "phase4"));
    }

    #[tokio::test]
    async fn test_reconstructed_provenance_survives() {
        let db = Database::open_in_memory().await.unwrap();
        let log = PhaseLog::reconstructed(
            "story-1",
            GenerationPhase::FairyTaleSelection,
            json!({}),
            json!({ "selection": null }),
        );
        db.append_log(&log).await.unwrap();

        let logs = db.logs_for_story("story-1").await.unwrap();
        assert!(logs[0].is_reconstructed());
    }
}
