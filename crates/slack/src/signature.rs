//! Slack request signing (`X-Slack-Signature`, version `v0`).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
pub const MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

const VERSION_PREFIX: &str = "v0=";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    Missing(&'static str),
    #[error("request timestamp is outside the {MAX_CLOCK_SKEW_SECS}s window")]
    Stale,
    #[error("malformed {0}")]
    Malformed(&'static str),
    #[error("signature does not match request body")]
    Mismatch,
}

pub fn verify(
    signing_secret: &str,
    timestamp: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let timestamp = timestamp.ok_or(SignatureError::Missing(TIMESTAMP_HEADER))?;
    let signature = signature.ok_or(SignatureError::Missing(SIGNATURE_HEADER))?;

    let issued_at =
        timestamp.trim().parse::<i64>().map_err(|_| SignatureError::Malformed("timestamp"))?;
    if (now_unix - issued_at).abs() > MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::Stale);
    }

    let expected = signature
        .strip_prefix(VERSION_PREFIX)
        .and_then(|digest| hex::decode(digest).ok())
        .ok_or(SignatureError::Malformed("signature"))?;

    signing_mac(signing_secret, timestamp.trim(), body)
        .ok_or(SignatureError::Malformed("signing secret"))?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// `v0=<hex>` signature for a body, as Slack would send it.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let digest = signing_mac(signing_secret, timestamp, body)?.finalize().into_bytes();
    Some(format!("{VERSION_PREFIX}{}", hex::encode(digest)))
}

fn signing_mac(signing_secret: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = match HmacSha256::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return None,
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Some(mac)
}
