use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::billing::{PaymentEvent, Reconciler};
use crate::responses::JsonResponse;
use crate::state::AppState;
use crate::utils::paddle_signature::{check_delivery, SIGNATURE_HEADER};

/// Paddle webhook receiver for both Billing and Classic notifications.
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let now = OffsetDateTime::now_utc();
    let paddle = &state.config.paddle;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Err(err) = check_delivery(
        &paddle.verification,
        signature,
        &body,
        paddle.signature_tolerance,
        now.unix_timestamp(),
    ) {
        warn!(%err, "paddle webhook rejected");
        return JsonResponse::unauthorized("Invalid signature").into_response();
    }

    let event = match PaymentEvent::parse(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(?err, "paddle webhook body is not valid JSON");
            return JsonResponse::bad_request("Invalid JSON payload").into_response();
        }
    };

    let reconciler = Reconciler {
        profiles: state.profiles.as_ref(),
        billing: state.billing.as_ref(),
        paddle: state.paddle.as_ref(),
        settings: &state.config.entitlements,
    };
    let report = reconciler.reconcile(&event, &body, now).await;

    if report.needs_redelivery() {
        error!(
            event_id = %report.event_id,
            event_type = %report.event_type,
            failures = report.failures.len(),
            "paddle webhook could not be persisted"
        );
        return JsonResponse::server_error("Failed to process webhook").into_response();
    }
    if !report.failures.is_empty() {
        let steps: Vec<&str> = report.failures.iter().map(|f| f.step).collect();
        warn!(event_id = %report.event_id, ?steps, "paddle webhook accepted with failed steps");
    } else {
        info!(
            event_id = %report.event_id,
            event_type = %report.event_type,
            user_id = ?report.user_id,
            duplicate = report.duplicate,
            "paddle webhook processed"
        );
    }

    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}
