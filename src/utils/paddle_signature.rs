use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::WebhookVerification;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "paddle-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing paddle-signature header")]
    Missing,
    #[error("malformed paddle-signature header")]
    Malformed,
    #[error("signature timestamp outside the accepted window")]
    Stale,
    #[error("signature mismatch")]
    Mismatch,
    #[error("webhook secret is not configured")]
    Unconfigured,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedSignature<'a> {
    pub timestamp: &'a str,
    pub signatures: Vec<Vec<u8>>,
}

/// Parses `t=<unix-ts>;h1=<hex>[;h1=<hex>...]`. Several `h1` entries may be
/// present while a secret is being rotated.
pub fn parse_header(header: &str) -> Result<ParsedSignature<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(';') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key.trim() {
            "t" => timestamp = Some(value.trim()),
            "h1" => {
                if let Some(bytes) = decode_lower_hex(value.trim()) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .filter(|ts| !ts.is_empty() && ts.bytes().all(|b| b.is_ascii_digit()))
        .ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }

    Ok(ParsedSignature {
        timestamp,
        signatures,
    })
}

/// Paddle emits lowercase hex; any other spelling is a different signature.
fn decode_lower_hex(value: &str) -> Option<Vec<u8>> {
    if !value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return None;
    }
    hex::decode(value).ok()
}

fn compute(secret: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Hex HMAC-SHA256 of `"<timestamp>:<body>"`.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    hex::encode(compute(secret, timestamp, body))
}

pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    tolerance: Option<Duration>,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let parsed = parse_header(header)?;

    if let Some(window) = tolerance {
        let ts: i64 = parsed
            .timestamp
            .parse()
            .map_err(|_| SignatureError::Malformed)?;
        if now_unix.abs_diff(ts) > window.as_secs() {
            return Err(SignatureError::Stale);
        }
    }

    let expected = compute(secret, parsed.timestamp, body);
    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| bool::from(expected.as_slice().ct_eq(candidate.as_slice())));
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Applies the configured verification mode to an incoming delivery.
pub fn check_delivery(
    verification: &WebhookVerification,
    header: Option<&str>,
    body: &[u8],
    tolerance: Option<Duration>,
    now_unix: i64,
) -> Result<(), SignatureError> {
    match verification {
        WebhookVerification::Disabled => Ok(()),
        WebhookVerification::Unconfigured => Err(SignatureError::Unconfigured),
        WebhookVerification::Enforced(secret) => {
            let header = header.ok_or(SignatureError::Missing)?;
            verify_signature(secret, header, body, tolerance, now_unix)
        }
    }
}
