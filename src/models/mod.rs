pub mod checkout_session;
pub mod interview;
pub mod payment;
pub mod profile;
pub mod subscription;
pub mod subscription_event;
