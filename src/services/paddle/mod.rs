pub mod live;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

pub use live::LivePaddleService;

#[derive(Debug, thiserror::Error)]
pub enum PaddleServiceError {
    #[error("paddle api key is not configured")]
    NotConfigured,
    #[error("paddle request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("paddle api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid paddle response: {0}")]
    InvalidResponse(String),
}

/// Read-only calls into the Paddle Billing API.
#[async_trait]
pub trait PaddleService: Send + Sync {
    /// Email on the Paddle customer record, `None` when the customer is unknown.
    async fn customer_email(&self, customer_id: &str)
        -> Result<Option<String>, PaddleServiceError>;
}
