//! Score report database operations
//!
//! Persists the externally visible report artifact. The JSON column
//! holds the full stable-schema report; the scalar columns exist for
//! cheap filtering and trend queries.

use chrono::Utc;

use crate::core::scoring::report::OverallScoreReport;

use super::models::ScoreReportRecord;
use super::{decode_err, Database};

/// Extension trait for score-report database operations
pub trait ScoreReportOps {
    fn save_report(
        &self,
        report: &OverallScoreReport,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn get_report(
        &self,
        test_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<OverallScoreReport>, sqlx::Error>> + Send;

    fn reports_for_story(
        &self,
        story_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<OverallScoreReport>, sqlx::Error>> + Send;
}

impl ScoreReportOps for Database {
    async fn save_report(&self, report: &OverallScoreReport) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO score_reports
            (test_id, story_id, overall_score, report, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.test_id)
        .bind(&report.story_id)
        .bind(report.overall_score)
        .bind(serde_json::to_string(report).map_err(decode_err)?)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_report(&self, test_id: &str) -> Result<Option<OverallScoreReport>, sqlx::Error> {
        let record = sqlx::query_as::<_, ScoreReportRecord>(
            "SELECT * FROM score_reports WHERE test_id = ?",
        )
        .bind(test_id)
        .fetch_optional(self.pool())
        .await?;
        record
            .map(|r| serde_json::from_str(&r.report).map_err(decode_err))
            .transpose()
    }

    async fn reports_for_story(
        &self,
        story_id: &str,
    ) -> Result<Vec<OverallScoreReport>, sqlx::Error> {
        let records = sqlx::query_as::<_, ScoreReportRecord>(
            "SELECT * FROM score_reports WHERE story_id = ? ORDER BY created_at DESC",
        )
        .bind(story_id)
        .fetch_all(self.pool())
        .await?;
        records
            .into_iter()
            .map(|r| serde_json::from_str(&r.report).map_err(decode_err))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::report::aggregate;
    use crate::core::scoring::types::{PhaseScore, ScoreContext};
    use indexmap::IndexMap;
    use serde_json::json;

    fn report() -> OverallScoreReport {
        let mut phases = IndexMap::new();
        let mut sheet = PhaseScore::builder();
        sheet.criterion("only", 8.0, 10.0, "fixture");
        phases.insert("phase0".to_string(), sheet.finalize());
        aggregate(
            phases,
            &ScoreContext {
                story_id: "story-1".to_string(),
                story_title: "T".to_string(),
                child_age: 7,
                genre: "adventure".to_string(),
                length: Default::default(),
                config: json!({}),
            },
        )
    }

    #[tokio::test]
    async fn test_report_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let report = report();
        db.save_report(&report).await.unwrap();

        let stored = db.get_report(&report.test_id).await.unwrap().unwrap();
        assert_eq!(stored.story_id, "story-1");
        assert_eq!(stored.overall_score, report.overall_score);
        assert_eq!(stored.summary, report.summary);

        let by_story = db.reports_for_story("story-1").await.unwrap();
        assert_eq!(by_story.len(), 1);
    }
}
