use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Raw audit copy of every verified webhook delivery.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct SubscriptionEvent {
    pub id: String,
    pub event_type: String,
    pub user_id: Option<String>,
    pub raw: String,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewSubscriptionEvent {
    pub id: String,
    pub event_type: String,
    pub user_id: Option<String>,
    pub raw: String,
}
