use async_trait::async_trait;
use time::OffsetDateTime;

use crate::models::profile::{Profile, ProUpdate};

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>, sqlx::Error>;

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, sqlx::Error>;

    /// Overwrites the Pro columns, creating the profile row when it is missing.
    async fn set_pro(&self, user_id: &str, update: ProUpdate) -> Result<(), sqlx::Error>;

    /// Adds `delta` credits (negative to remove), never going below zero.
    async fn add_credits(&self, user_id: &str, delta: i32) -> Result<(), sqlx::Error>;

    /// Takes one credit if the balance allows it. Returns whether a credit was taken.
    async fn consume_credit(&self, user_id: &str) -> Result<bool, sqlx::Error>;

    /// Clears the Pro flag on every profile whose expiry has passed.
    async fn expire_lapsed_pro(&self, now: OffsetDateTime) -> Result<u64, sqlx::Error>;
}
