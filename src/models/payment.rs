use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub const PAYMENT_PROVIDER_PADDLE: &str = "paddle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "paid" => Some(PaymentStatus::Paid),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// Lifecycle position. A stored status is never replaced by a lower one.
    pub fn rank(self) -> u8 {
        match self {
            PaymentStatus::Failed => 0,
            PaymentStatus::Paid => 1,
            PaymentStatus::Completed => 2,
            PaymentStatus::Refunded => 3,
        }
    }
}

impl Payment {
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        PaymentStatus::parse(&self.status)
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Payment {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub provider: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: String,
    pub raw: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields written by a payment upsert, keyed by the provider transaction id.
#[derive(Debug, Clone)]
pub struct PaymentUpsert {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub provider: &'static str,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: PaymentStatus,
    pub raw: String,
}
