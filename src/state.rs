use crate::config::Config;
use crate::db::{
    billing_repository::BillingRepository, interview_repository::InterviewRepository,
    profile_repository::ProfileRepository,
};
use crate::services::paddle::PaddleService;
use crate::utils::jwt::JwtKeys;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<dyn ProfileRepository>,
    pub billing: Arc<dyn BillingRepository>,
    pub interviews: Arc<dyn InterviewRepository>,
    pub paddle: Arc<dyn PaddleService>,
    pub config: Arc<Config>,
    pub jwt_keys: Arc<JwtKeys>,
}
