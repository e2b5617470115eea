use async_trait::async_trait;
use time::OffsetDateTime;

use crate::models::interview::{Interview, InterviewResults};

#[async_trait]
pub trait InterviewRepository: Send + Sync {
    async fn create_interview(
        &self,
        id: &str,
        owner: &str,
        room_name: &str,
        credit_consumed: bool,
    ) -> Result<Interview, sqlx::Error>;

    async fn find_interview(&self, id: &str) -> Result<Option<Interview>, sqlx::Error>;

    async fn count_interviews_since(
        &self,
        owner: &str,
        since: OffsetDateTime,
    ) -> Result<i64, sqlx::Error>;

    async fn count_interviews(&self, owner: &str) -> Result<i64, sqlx::Error>;

    /// Interviews still `started` that were created before `cutoff`.
    async fn list_stale_started(
        &self,
        cutoff: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Interview>, sqlx::Error>;

    /// `started -> expired`, guarded on the current status. Returns whether this
    /// call performed the transition.
    async fn expire_if_started(&self, id: &str) -> Result<bool, sqlx::Error>;

    async fn save_results(
        &self,
        id: &str,
        results: InterviewResults,
    ) -> Result<Option<Interview>, sqlx::Error>;
}
