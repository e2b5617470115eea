pub mod billing_repository;
pub mod interview_repository;
#[cfg(test)]
pub mod mock_db;
pub mod postgres_billing_repository;
pub mod postgres_interview_repository;
pub mod postgres_profile_repository;
pub mod profile_repository;
