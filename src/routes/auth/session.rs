use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

use crate::responses::JsonResponse;
use crate::state::AppState;
use crate::utils::jwt::decode_jwt;

/// Caller authenticated by a Supabase access token. `user_id` is the token's
/// `sub`, which is also the `profiles.id` key.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

fn unauthorized() -> Response {
    JsonResponse::unauthorized("Unauthorized").into_response()
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| unauthorized())?;

        let token = decode_jwt(bearer.token(), &state.jwt_keys, &state.config.jwt_audience)
            .map_err(|err| {
                debug!(?err, "rejected access token");
                unauthorized()
            })?;

        Ok(AuthUser {
            user_id: token.claims.sub,
            email: token.claims.email,
        })
    }
}

/// Like [`AuthUser`] but lets requests without an `Authorization` header
/// through as anonymous. A header that is present must still be valid.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalAuthUser(None));
        }
        AuthUser::from_request_parts(parts, state)
            .await
            .map(|user| OptionalAuthUser(Some(user)))
    }
}
