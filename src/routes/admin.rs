use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};

use crate::jobs::expire_lapsed_entitlements;
use crate::models::profile::ProUpdate;
use crate::responses::JsonResponse;
use crate::routes::auth::{bearer_secret_matches, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub days: Option<i64>,
}

/// Grants Pro by hand. Only callers whose profile carries `is_admin`.
pub async fn promote(
    State(state): State<AppState>,
    admin: AuthUser,
    Json(payload): Json<PromoteRequest>,
) -> Response {
    match state.profiles.find_profile(&admin.user_id).await {
        Ok(Some(profile)) if profile.is_admin => {}
        Ok(_) => {
            warn!(user_id = %admin.user_id, "non-admin attempted promotion");
            return JsonResponse::forbidden("Admin access required").into_response();
        }
        Err(err) => {
            error!(?err, "failed to load admin profile");
            return JsonResponse::server_error("Failed to promote user").into_response();
        }
    }

    let days = payload
        .days
        .unwrap_or(state.config.entitlements.pro_duration_days);
    if days <= 0 {
        return JsonResponse::bad_request("days must be positive").into_response();
    }

    let lookup = match (payload.user_id, payload.email) {
        (Some(user_id), _) if !user_id.trim().is_empty() => {
            state.profiles.find_profile(user_id.trim()).await
        }
        (_, Some(email)) if !email.trim().is_empty() => {
            state.profiles.find_profile_by_email(email.trim()).await
        }
        _ => return JsonResponse::bad_request("userId or email is required").into_response(),
    };
    let target = match lookup {
        Ok(Some(profile)) => profile.id,
        Ok(None) => return JsonResponse::not_found("User not found").into_response(),
        Err(err) => {
            error!(?err, "failed to look up promotion target");
            return JsonResponse::server_error("Failed to promote user").into_response();
        }
    };

    let expires_at = OffsetDateTime::now_utc() + Duration::days(days);
    let update = ProUpdate {
        pro: true,
        pro_expires_at: Some(expires_at),
    };
    if let Err(err) = state.profiles.set_pro(&target, update).await {
        error!(?err, user_id = %target, "failed to promote user");
        return JsonResponse::server_error("Failed to promote user").into_response();
    }

    info!(admin = %admin.user_id, user_id = %target, days, "user promoted to pro");
    let expires_at = expires_at
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    Json(json!({ "ok": true, "userId": target, "proExpiresAt": expires_at })).into_response()
}

/// Cron entry point that flips `pro` off once `pro_expires_at` has passed.
pub async fn expire_entitlements(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !bearer_secret_matches(&headers, state.config.cron_secret.as_deref()) {
        return JsonResponse::unauthorized("Unauthorized").into_response();
    }

    match expire_lapsed_entitlements(state.profiles.as_ref(), OffsetDateTime::now_utc()).await {
        Ok(expired) => Json(json!({ "ok": true, "expired": expired })).into_response(),
        Err(err) => {
            error!(?err, "entitlement expiry job failed");
            JsonResponse::server_error("Expiry job failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::db::profile_repository::ProfileRepository;
    use crate::services::paddle::mock::MockPaddleService;
    use crate::state::test_support::{test_config, test_state, TEST_CRON_SECRET};
    use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
    use std::sync::Arc;

    fn user(id: &str) -> AuthUser {
        AuthUser {
            user_id: id.to_string(),
            email: None,
        }
    }

    fn admin_db() -> Arc<MockDb> {
        let db = Arc::new(MockDb::default());
        db.insert_profile("admin", 0);
        db.profiles.lock().unwrap().get_mut("admin").unwrap().is_admin = true;
        db.insert_profile("u1", 0);
        db
    }

    #[tokio::test]
    async fn admin_can_promote_by_email() {
        let db = admin_db();
        let state = test_state(db.clone(), MockPaddleService::new(), test_config());

        let resp = promote(
            State(state),
            user("admin"),
            Json(PromoteRequest {
                user_id: None,
                email: Some("u1@example.com".into()),
                days: Some(10),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let profile = db.profile("u1").unwrap();
        assert!(profile.pro);
        let remaining = profile.pro_expires_at.unwrap() - OffsetDateTime::now_utc();
        assert!(remaining > Duration::days(9) && remaining <= Duration::days(10));
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let db = admin_db();
        let state = test_state(db.clone(), MockPaddleService::new(), test_config());

        let resp = promote(
            State(state),
            user("u1"),
            Json(PromoteRequest {
                user_id: Some("u1".into()),
                email: None,
                days: None,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(!db.profile("u1").unwrap().pro);
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let db = admin_db();
        let state = test_state(db.clone(), MockPaddleService::new(), test_config());

        let resp = promote(
            State(state),
            user("admin"),
            Json(PromoteRequest {
                user_id: Some("ghost".into()),
                email: None,
                days: None,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(db.profile("ghost").is_none());
    }

    #[tokio::test]
    async fn expiry_job_is_cron_guarded() {
        let db = admin_db();
        db.set_pro(
            "u1",
            ProUpdate {
                pro: true,
                pro_expires_at: Some(OffsetDateTime::now_utc() - Duration::minutes(1)),
            },
        )
        .await
        .unwrap();
        let state = test_state(db.clone(), MockPaddleService::new(), test_config());

        let resp = expire_entitlements(State(state.clone()), HeaderMap::new()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {TEST_CRON_SECRET}")).unwrap(),
        );
        let resp = expire_entitlements(State(state), headers).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!db.profile("u1").unwrap().pro);
    }
}
