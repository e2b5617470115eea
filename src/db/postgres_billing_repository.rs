use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::billing_repository::{BillingRepository, NewCheckoutSession};
use crate::models::{
    checkout_session::{CheckoutSession, CHECKOUT_STATUS_COMPLETED, CHECKOUT_STATUS_CREATED},
    payment::{Payment, PaymentUpsert},
    subscription::{Subscription, SubscriptionUpsert},
    subscription_event::NewSubscriptionEvent,
};

pub struct PostgresBillingRepository {
    pub pool: PgPool,
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn record_event(&self, event: NewSubscriptionEvent) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscription_events (id, event_type, user_id, raw)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .bind(&event.user_id)
        .bind(&event.raw)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_payment(&self, id: &str) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, customer_id, provider, amount, currency, status, raw,
                   created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_payment(&self, payment: PaymentUpsert) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, customer_id, provider, amount, currency, status, raw)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET user_id = COALESCE(EXCLUDED.user_id, payments.user_id),
                customer_id = COALESCE(EXCLUDED.customer_id, payments.customer_id),
                amount = COALESCE(EXCLUDED.amount, payments.amount),
                currency = COALESCE(EXCLUDED.currency, payments.currency),
                status = EXCLUDED.status,
                raw = EXCLUDED.raw,
                updated_at = now()
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.user_id)
        .bind(&payment.customer_id)
        .bind(payment.provider)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_subscription(&self, id: &str) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, customer_id, provider, product_id, status,
                   next_bill_date, cancel_at, updated_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_subscription(&self, sub: SubscriptionUpsert) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (id, user_id, customer_id, provider, product_id, status, next_bill_date, cancel_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET user_id = COALESCE(EXCLUDED.user_id, subscriptions.user_id),
                customer_id = COALESCE(EXCLUDED.customer_id, subscriptions.customer_id),
                product_id = COALESCE(EXCLUDED.product_id, subscriptions.product_id),
                status = EXCLUDED.status,
                next_bill_date = EXCLUDED.next_bill_date,
                cancel_at = EXCLUDED.cancel_at,
                updated_at = now()
            "#,
        )
        .bind(&sub.id)
        .bind(&sub.user_id)
        .bind(&sub.customer_id)
        .bind(sub.provider)
        .bind(&sub.product_id)
        .bind(sub.status.as_str())
        .bind(sub.next_bill_date)
        .bind(sub.cancel_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active_subscription_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, customer_id, provider, product_id, status,
                   next_bill_date, cancel_at, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND status IN ('active', 'trialing')
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_id_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT user_id FROM (
                SELECT user_id, updated_at FROM subscriptions
                WHERE customer_id = $1 AND user_id IS NOT NULL
                UNION ALL
                SELECT user_id, updated_at FROM payments
                WHERE customer_id = $1 AND user_id IS NOT NULL
            ) known
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CheckoutSession, sqlx::Error> {
        sqlx::query_as::<_, CheckoutSession>(
            r#"
            INSERT INTO checkout_sessions (id, user_id, product_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, product_id, amount, currency, status, created_at
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.product_id)
        .bind(session.amount)
        .bind(&session.currency)
        .bind(CHECKOUT_STATUS_CREATED)
        .fetch_one(&self.pool)
        .await
    }

    async fn complete_checkout_session(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE checkout_sessions SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(CHECKOUT_STATUS_COMPLETED)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
