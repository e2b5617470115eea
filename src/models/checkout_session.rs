use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub const CHECKOUT_STATUS_CREATED: &str = "created";
pub const CHECKOUT_STATUS_COMPLETED: &str = "completed";

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
