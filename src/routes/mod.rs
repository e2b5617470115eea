pub mod admin;
pub mod auth;
pub mod checkout;
pub mod interviews;
pub mod paddle;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};

use crate::responses::JsonResponse;
use crate::state::AppState;

/// A simple root route.
pub async fn root() -> Response {
    JsonResponse::success("Interview billing backend is running").into_response()
}

/// Every HTTP route the service exposes. Transport layers (CORS, tracing)
/// are added by the binary.
pub fn app(state: AppState) -> Router {
    // Paddle posts to whichever URL is configured in the dashboard; keep the
    // short path for older notification settings.
    let webhook_routes = Router::new()
        .route("/webhook", post(paddle::webhook))
        .route("/api/paddle/webhook", post(paddle::webhook));

    let interview_routes = Router::new()
        .route("/", post(interviews::start_interview))
        .route("/limits", get(interviews::get_limits))
        .route("/cleanup", post(interviews::cleanup))
        .route("/{interview_id}", get(interviews::get_interview))
        .route("/{interview_id}/results", put(interviews::save_results));

    Router::new()
        .route("/", get(root))
        .merge(webhook_routes)
        .nest("/api/interviews", interview_routes)
        .route("/api/checkout/sessions", post(checkout::create_checkout_session))
        .route("/api/admin/promote", post(admin::promote))
        .route("/api/entitlements/expire", post(admin::expire_entitlements))
        .with_state(state)
}
