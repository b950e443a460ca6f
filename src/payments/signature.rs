//! Verification of the `Stripe-Signature` header sent with webhook calls.
//!
//! The header has the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. Each
//! `v1` value is an HMAC-SHA256 over `"<t>.<raw body>"` keyed with the
//! endpoint secret. Any matching `v1` entry accepts the payload.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    MissingHeader,
    #[error("signature header is malformed")]
    MalformedHeader,
    #[error("endpoint secret is not usable")]
    InvalidSecret,
    #[error("no signature matches the payload")]
    NoMatch,
    #[error("signature timestamp is outside the tolerance window")]
    Expired,
}

struct ParsedHeader<'a> {
    timestamp_raw: &'a str,
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
    let mut timestamp_raw = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => timestamp_raw = Some(value),
            // Undecodable entries simply never match.
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp_raw = timestamp_raw.ok_or(SignatureError::MalformedHeader)?;
    let timestamp = timestamp_raw
        .parse::<i64>()
        .map_err(|_| SignatureError::MalformedHeader)?;

    Ok(ParsedHeader {
        timestamp_raw,
        timestamp,
        signatures,
    })
}

fn mac_for(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks `header` against `payload`. `now` is unix seconds.
pub fn verify(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;
    let parsed = parse_header(header)?;
    let mac = mac_for(secret, parsed.timestamp_raw, payload)?;

    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
    if !matched {
        return Err(SignatureError::NoMatch);
    }

    if (now - parsed.timestamp).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

/// Builds a header value the way the processor signs its deliveries.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let timestamp = timestamp.to_string();
    let mac = mac_for(secret, &timestamp, payload)?;
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={signature}"))
}
