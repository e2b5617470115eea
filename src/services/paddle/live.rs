use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::warn;

use super::{PaddleService, PaddleServiceError};
use crate::config::PaddleSettings;

pub struct LivePaddleService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl LivePaddleService {
    pub fn from_settings(settings: &PaddleSettings) -> Result<Self, PaddleServiceError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff,
        })
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// GET with bounded retries on transport errors, 429 and 5xx. A 404 is
    /// reported as `Ok(None)`.
    async fn get_json(&self, path: &str) -> Result<Option<Value>, PaddleServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(PaddleServiceError::NotConfigured)?;
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut attempt = 0u32;
        let mut backoff = self.retry_backoff;
        loop {
            let result = self
                .client
                .get(&url)
                .bearer_auth(api_key)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await;

            let retry = match &result {
                Err(err) => Some(err.to_string()),
                Ok(response) if Self::is_retryable(response.status()) => {
                    Some(format!("status {}", response.status()))
                }
                Ok(_) => None,
            };
            if let Some(reason) = retry {
                if attempt < self.max_retries {
                    attempt += 1;
                    warn!(%url, attempt, %reason, "paddle request failed; retrying");
                    sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    continue;
                }
            }

            let response = result?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let body = response.text().await?;
            if !status.is_success() {
                let message = match body.trim() {
                    "" => "Paddle API request failed".to_string(),
                    trimmed => trimmed.to_string(),
                };
                return Err(PaddleServiceError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            return serde_json::from_str(&body)
                .map(Some)
                .map_err(|err| PaddleServiceError::InvalidResponse(err.to_string()));
        }
    }
}

#[async_trait]
impl PaddleService for LivePaddleService {
    async fn customer_email(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, PaddleServiceError> {
        let Some(body) = self.get_json(&format!("customers/{customer_id}")).await? else {
            return Ok(None);
        };
        Ok(body
            .pointer("/data/email")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string))
    }
}
