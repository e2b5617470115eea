use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::LiveKitSettings;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrant<'a> {
    room: &'a str,
    room_join: bool,
    can_publish: bool,
    can_subscribe: bool,
}

#[derive(Debug, Serialize)]
struct AccessTokenClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    nbf: i64,
    exp: i64,
    video: VideoGrant<'a>,
}

/// Mints a LiveKit access token that lets `identity` join `room`.
pub fn room_join_token(
    settings: &LiveKitSettings,
    identity: &str,
    room: &str,
    now: OffsetDateTime,
) -> Result<String, jsonwebtoken::errors::Error> {
    let issued = now.unix_timestamp();
    let claims = AccessTokenClaims {
        iss: &settings.api_key,
        sub: identity,
        nbf: issued,
        exp: issued + settings.token_ttl_secs,
        video: VideoGrant {
            room,
            room_join: true,
            can_publish: true,
            can_subscribe: true,
        },
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.api_secret.as_bytes()),
    )
}
