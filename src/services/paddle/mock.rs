use super::{PaddleService, PaddleServiceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockPaddleService {
    pub customers: Arc<Mutex<HashMap<String, String>>>,
    pub lookups: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl MockPaddleService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(self, customer_id: &str, email: &str) -> Self {
        self.customers
            .lock()
            .unwrap()
            .insert(customer_id.to_string(), email.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PaddleService for MockPaddleService {
    async fn customer_email(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, PaddleServiceError> {
        self.lookups.lock().unwrap().push(customer_id.to_string());
        if self.fail {
            return Err(PaddleServiceError::Api {
                status: 503,
                message: "mock outage".into(),
            });
        }
        Ok(self.customers.lock().unwrap().get(customer_id).cloned())
    }
}
