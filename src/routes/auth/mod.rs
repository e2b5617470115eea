pub mod session;

pub use session::{AuthUser, OptionalAuthUser};

use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use subtle::ConstantTimeEq;

/// Checks a machine-to-machine bearer secret (cron, agent). `None` means the
/// endpoint is open because no secret was configured.
pub fn bearer_secret_matches(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| bool::from(auth.token().as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    #[test]
    fn secret_must_match_exactly() {
        let mut headers = HeaderMap::new();
        assert!(!bearer_secret_matches(&headers, Some("s3cret")));
        assert!(bearer_secret_matches(&headers, None));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(bearer_secret_matches(&headers, Some("s3cret")));
        assert!(!bearer_secret_matches(&headers, Some("s3cret2")));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic s3cret"));
        assert!(!bearer_secret_matches(&headers, Some("s3cret")));
    }
}
