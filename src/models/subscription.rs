use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Paused,
    Canceled,
    Other(String),
}

impl SubscriptionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "paused" => Self::Paused,
            // Classic reports a cancelled subscription as "deleted"
            "canceled" | "cancelled" | "deleted" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Paused => "paused",
            Self::Canceled => "canceled",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Subscription {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub provider: String,
    pub product_id: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_bill_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancel_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Subscription {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::parse(&self.status)
    }

    /// Active and neither the paid period nor a scheduled cancellation has passed.
    pub fn is_current(&self, now: OffsetDateTime) -> bool {
        self.status().grants_access()
            && self.next_bill_date.map(|d| d > now).unwrap_or(true)
            && self.cancel_at.map(|d| d > now).unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub provider: &'static str,
    pub product_id: Option<String>,
    pub status: SubscriptionStatus,
    pub next_bill_date: Option<OffsetDateTime>,
    pub cancel_at: Option<OffsetDateTime>,
}
