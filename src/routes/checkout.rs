use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::billing_repository::NewCheckoutSession;
use crate::responses::JsonResponse;
use crate::routes::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    /// Paddle price or product id; must be in the configured catalog.
    pub product_id: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// Forwarded verbatim by the front-end as Paddle Checkout `customData`, and
/// echoed back on the transaction webhooks. It only identifies the buyer.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCustomData {
    pub user_id: String,
    pub checkout_session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub checkout_session_id: String,
    pub custom_data: CheckoutCustomData,
    /// Credits the product grants per unit, for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<i32>,
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCheckoutRequest>,
) -> Response {
    let product_id = payload.product_id.trim();
    if product_id.is_empty() {
        return JsonResponse::bad_request("productId is required").into_response();
    }
    let catalog = &state.config.entitlements.catalog;
    if !catalog.knows(product_id) {
        warn!(%product_id, user_id = %user.user_id, "checkout requested for unknown product");
        return JsonResponse::bad_request("Unknown productId").into_response();
    }
    let credits = catalog.credits_for(product_id);

    let session = NewCheckoutSession {
        id: format!("cs_{}", Uuid::new_v4().simple()),
        user_id: user.user_id.clone(),
        product_id: product_id.to_string(),
        amount: payload.amount,
        currency: payload.currency,
    };
    match state.billing.create_checkout_session(session).await {
        Ok(session) => {
            info!(
                checkout_session_id = %session.id,
                user_id = %user.user_id,
                "checkout session created"
            );
            (
                StatusCode::CREATED,
                Json(CheckoutSessionResponse {
                    custom_data: CheckoutCustomData {
                        user_id: user.user_id,
                        checkout_session_id: session.id.clone(),
                    },
                    checkout_session_id: session.id,
                    credits,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!(?err, user_id = %user.user_id, "failed to create checkout session");
            JsonResponse::server_error("Failed to create checkout session").into_response()
        }
    }
}
