pub mod jwt;
pub mod livekit;
pub mod paddle_signature;
pub mod plan_limits;
