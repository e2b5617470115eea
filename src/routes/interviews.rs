use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::jobs::refund_stale_interviews;
use crate::models::interview::{parse_json_column, Interview, InterviewResults};
use crate::responses::JsonResponse;
use crate::routes::auth::{bearer_secret_matches, AuthUser, OptionalAuthUser};
use crate::state::AppState;
use crate::utils::livekit::room_join_token;
use crate::utils::plan_limits::{load_limits, InterviewLimits, QuotaTier};

const LIMIT_REACHED_CODE: &str = "interview_limit_reached";

pub async fn get_limits(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Response {
    let Some(user) = user else {
        return Json(InterviewLimits::anonymous(&state.config.limits)).into_response();
    };

    match load_limits(
        state.profiles.as_ref(),
        state.billing.as_ref(),
        state.interviews.as_ref(),
        &user.user_id,
        &state.config.limits,
        OffsetDateTime::now_utc(),
    )
    .await
    {
        Ok(limits) => Json(limits).into_response(),
        Err(err) => {
            error!(?err, user_id = %user.user_id, "failed to compute interview limits");
            JsonResponse::server_error("Failed to load interview limits").into_response()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedInterview {
    pub interview_id: String,
    pub room_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

/// Starts an interview if the caller has quota left. Credits are taken before
/// the row is created and handed back if creation fails.
pub async fn start_interview(State(state): State<AppState>, user: AuthUser) -> Response {
    let now = OffsetDateTime::now_utc();
    let limits = match load_limits(
        state.profiles.as_ref(),
        state.billing.as_ref(),
        state.interviews.as_ref(),
        &user.user_id,
        &state.config.limits,
        now,
    )
    .await
    {
        Ok(limits) => limits,
        Err(err) => {
            error!(?err, user_id = %user.user_id, "failed to compute interview limits");
            return JsonResponse::server_error("Failed to start interview").into_response();
        }
    };

    if !limits.can_start() {
        return JsonResponse::forbidden_with_code(
            "You have no interviews remaining",
            LIMIT_REACHED_CODE,
        )
        .into_response();
    }

    let used_credit = limits.tier == QuotaTier::Credits;
    if used_credit {
        match state.profiles.consume_credit(&user.user_id).await {
            Ok(true) => {}
            Ok(false) => {
                return JsonResponse::forbidden_with_code(
                    "You have no interviews remaining",
                    LIMIT_REACHED_CODE,
                )
                .into_response()
            }
            Err(err) => {
                error!(?err, user_id = %user.user_id, "failed to consume interview credit");
                return JsonResponse::server_error("Failed to start interview").into_response();
            }
        }
    }

    let interview_id = Uuid::new_v4().to_string();
    let room_name = format!("interview-{}", Uuid::new_v4());
    if let Err(err) = state
        .interviews
        .create_interview(&interview_id, &user.user_id, &room_name, used_credit)
        .await
    {
        error!(?err, user_id = %user.user_id, "failed to create interview");
        if used_credit {
            if let Err(err) = state.profiles.add_credits(&user.user_id, 1).await {
                error!(?err, user_id = %user.user_id, "failed to return consumed credit");
            }
        }
        return JsonResponse::server_error("Failed to start interview").into_response();
    }

    let (token, server_url) = match state.config.livekit.as_ref() {
        Some(livekit) => match room_join_token(livekit, &user.user_id, &room_name, now) {
            Ok(token) => (Some(token), Some(livekit.url.clone())),
            Err(err) => {
                // The started row is expired and refunded by the cleanup sweep.
                error!(?err, %interview_id, "failed to mint livekit token");
                return JsonResponse::server_error("Failed to start interview").into_response();
            }
        },
        None => (None, None),
    };

    info!(%interview_id, user_id = %user.user_id, tier = ?limits.tier, "interview started");
    (
        StatusCode::CREATED,
        Json(StartedInterview {
            interview_id,
            room_name,
            token,
            server_url,
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewView {
    pub id: String,
    pub status: String,
    pub room_name: String,
    pub transcript: Value,
    pub analysis: Value,
    pub audio_signed_url: Option<String>,
    pub video_signed_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Interview> for InterviewView {
    fn from(interview: Interview) -> Self {
        Self {
            transcript: parse_json_column(interview.transcript.as_deref()),
            analysis: parse_json_column(interview.analysis.as_deref()),
            id: interview.id,
            status: interview.status,
            room_name: interview.room_name,
            audio_signed_url: interview.audio_signed_url,
            video_signed_url: interview.video_signed_url,
            created_at: interview.created_at,
            updated_at: interview.updated_at,
        }
    }
}

pub async fn get_interview(
    State(state): State<AppState>,
    user: AuthUser,
    Path(interview_id): Path<String>,
) -> Response {
    match state.interviews.find_interview(&interview_id).await {
        Ok(Some(interview)) if interview.owner.as_deref() == Some(user.user_id.as_str()) => {
            Json(InterviewView::from(interview)).into_response()
        }
        Ok(_) => JsonResponse::not_found("Interview not found").into_response(),
        Err(err) => {
            error!(?err, %interview_id, "failed to load interview");
            JsonResponse::server_error("Failed to load interview").into_response()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultsRequest {
    pub transcript: Option<Value>,
    pub analysis: Option<Value>,
    pub audio_signed_url: Option<String>,
    pub video_signed_url: Option<String>,
}

/// Results reported by the voice agent. Requires the agent secret; without one
/// configured every call is refused.
pub async fn save_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
    Json(payload): Json<SaveResultsRequest>,
) -> Response {
    let Some(secret) = state.config.agent_api_secret.as_deref() else {
        warn!("agent results rejected: AGENT_API_SECRET is not configured");
        return JsonResponse::unauthorized("Unauthorized").into_response();
    };
    if !bearer_secret_matches(&headers, Some(secret)) {
        return JsonResponse::unauthorized("Unauthorized").into_response();
    }

    let results = InterviewResults {
        transcript: payload.transcript.map(|v| v.to_string()),
        analysis: payload.analysis.map(|v| v.to_string()),
        audio_signed_url: payload.audio_signed_url,
        video_signed_url: payload.video_signed_url,
    };
    match state.interviews.save_results(&interview_id, results).await {
        Ok(Some(interview)) => {
            info!(%interview_id, "interview results saved");
            Json(InterviewView::from(interview)).into_response()
        }
        Ok(None) => JsonResponse::not_found("Interview not found").into_response(),
        Err(err) => {
            error!(?err, %interview_id, "failed to save interview results");
            JsonResponse::server_error("Failed to save interview results").into_response()
        }
    }
}

pub async fn cleanup(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !bearer_secret_matches(&headers, state.config.cron_secret.as_deref()) {
        return JsonResponse::unauthorized("Unauthorized").into_response();
    }

    match refund_stale_interviews(
        state.profiles.as_ref(),
        state.interviews.as_ref(),
        &state.config.limits,
        OffsetDateTime::now_utc(),
    )
    .await
    {
        Ok(refunded) => Json(json!({ "ok": true, "refunded": refunded })).into_response(),
        Err(err) => {
            error!(?err, "interview cleanup sweep failed");
            JsonResponse::server_error("Cleanup failed").into_response()
        }
    }
}
