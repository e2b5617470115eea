use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::profile_repository::ProfileRepository;
use crate::models::profile::{Profile, ProUpdate};

pub struct PostgresProfileRepository {
    pub pool: PgPool,
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, credits, pro, pro_expires_at, is_admin
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, credits, pro, pro_expires_at, is_admin
            FROM profiles
            WHERE lower(email) = lower($1)
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_pro(&self, user_id: &str, update: ProUpdate) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, pro, pro_expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET pro = EXCLUDED.pro,
                pro_expires_at = EXCLUDED.pro_expires_at
            "#,
        )
        .bind(user_id)
        .bind(update.pro)
        .bind(update.pro_expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_credits(&self, user_id: &str, delta: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, credits)
            VALUES ($1, GREATEST($2, 0))
            ON CONFLICT (id) DO UPDATE
            SET credits = GREATEST(profiles.credits + $2, 0)
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_credit(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET credits = credits - 1
            WHERE id = $1 AND credits > 0
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn expire_lapsed_pro(&self, now: OffsetDateTime) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET pro = false
            WHERE pro = true
              AND pro_expires_at IS NOT NULL
              AND pro_expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
