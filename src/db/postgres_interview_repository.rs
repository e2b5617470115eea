use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::interview_repository::InterviewRepository;
use crate::models::interview::{
    Interview, InterviewResults, INTERVIEW_STATUS_COMPLETED, INTERVIEW_STATUS_EXPIRED,
    INTERVIEW_STATUS_STARTED,
};

pub struct PostgresInterviewRepository {
    pub pool: PgPool,
}

const INTERVIEW_COLUMNS: &str = "id, owner, transcript, analysis, status, room_name, \
     audio_signed_url, video_signed_url, credit_consumed, created_at, updated_at";

#[async_trait]
impl InterviewRepository for PostgresInterviewRepository {
    async fn create_interview(
        &self,
        id: &str,
        owner: &str,
        room_name: &str,
        credit_consumed: bool,
    ) -> Result<Interview, sqlx::Error> {
        let sql = format!(
            "INSERT INTO interviews (id, owner, status, room_name, credit_consumed) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {INTERVIEW_COLUMNS}"
        );
        sqlx::query_as::<_, Interview>(&sql)
            .bind(id)
            .bind(owner)
            .bind(INTERVIEW_STATUS_STARTED)
            .bind(room_name)
            .bind(credit_consumed)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_interview(&self, id: &str) -> Result<Option<Interview>, sqlx::Error> {
        let sql = format!("SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE id = $1");
        sqlx::query_as::<_, Interview>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn count_interviews_since(
        &self,
        owner: &str,
        since: OffsetDateTime,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM interviews WHERE owner = $1 AND created_at >= $2",
        )
        .bind(owner)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_interviews(&self, owner: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM interviews WHERE owner = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_stale_started(
        &self,
        cutoff: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Interview>, sqlx::Error> {
        let sql = format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews \
             WHERE status = $1 AND created_at < $2 \
             ORDER BY created_at ASC LIMIT $3"
        );
        sqlx::query_as::<_, Interview>(&sql)
            .bind(INTERVIEW_STATUS_STARTED)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn expire_if_started(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET status = $2, updated_at = now()
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(id)
        .bind(INTERVIEW_STATUS_EXPIRED)
        .bind(INTERVIEW_STATUS_STARTED)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn save_results(
        &self,
        id: &str,
        results: InterviewResults,
    ) -> Result<Option<Interview>, sqlx::Error> {
        let sql = format!(
            "UPDATE interviews \
             SET transcript = COALESCE($2, transcript), \
                 analysis = COALESCE($3, analysis), \
                 audio_signed_url = COALESCE($4, audio_signed_url), \
                 video_signed_url = COALESCE($5, video_signed_url), \
                 status = $6, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {INTERVIEW_COLUMNS}"
        );
        sqlx::query_as::<_, Interview>(&sql)
            .bind(id)
            .bind(&results.transcript)
            .bind(&results.analysis)
            .bind(&results.audio_signed_url)
            .bind(&results.video_signed_url)
            .bind(INTERVIEW_STATUS_COMPLETED)
            .fetch_optional(&self.pool)
            .await
    }
}
