use async_trait::async_trait;

use crate::models::{
    checkout_session::CheckoutSession,
    payment::{Payment, PaymentUpsert},
    subscription::{Subscription, SubscriptionUpsert},
    subscription_event::NewSubscriptionEvent,
};

#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// Ledger tables: raw events, payments, subscriptions and checkout sessions.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    /// Stores the raw event. Returns `false` when the id was already recorded.
    async fn record_event(&self, event: NewSubscriptionEvent) -> Result<bool, sqlx::Error>;

    async fn find_payment(&self, id: &str) -> Result<Option<Payment>, sqlx::Error>;

    async fn upsert_payment(&self, payment: PaymentUpsert) -> Result<(), sqlx::Error>;

    async fn find_subscription(&self, id: &str) -> Result<Option<Subscription>, sqlx::Error>;

    async fn upsert_subscription(&self, sub: SubscriptionUpsert) -> Result<(), sqlx::Error>;

    /// Most recently updated active or trialing subscription for the user.
    async fn find_active_subscription_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    async fn find_user_id_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, sqlx::Error>;

    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CheckoutSession, sqlx::Error>;

    async fn complete_checkout_session(&self, id: &str) -> Result<bool, sqlx::Error>;
}
