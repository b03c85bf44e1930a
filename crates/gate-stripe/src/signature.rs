//! # Stripe-Signature Verification
//!
//! Stripe signs each webhook delivery with
//! `Stripe-Signature: t=<unix seconds>,v1=<hex hmac>[,v1=...]`, where the HMAC
//! is SHA-256 over `"{t}.{raw body}"` keyed by the endpoint's `whsec_` secret.

use gate_core::{GateError, GateResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed delivery, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> GateResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        GateError::WebhookVerificationFailed("Unable to extract timestamp from header".to_string())
    })?;

    if signatures.is_empty() {
        return Err(GateError::WebhookVerificationFailed(
            "No v1 signatures found in header".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> GateResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GateError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verify `header` against `payload` as of `now` (unix seconds).
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
    tolerance_secs: i64,
) -> GateResult<()> {
    let parsed = parse_signature_header(header)?;

    let matched = parsed.signatures.iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        mac_for(secret, parsed.timestamp, payload)
            .map(|mac| mac.verify_slice(&expected).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        return Err(GateError::WebhookVerificationFailed(
            "No signatures found matching the expected signature for payload".to_string(),
        ));
    }

    if (now - parsed.timestamp).abs() > tolerance_secs {
        return Err(GateError::WebhookVerificationFailed(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    Ok(())
}

/// Build a `Stripe-Signature` header value for `payload` signed at `timestamp`.
///
/// Used for replaying deliveries locally and in tests.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> GateResult<String> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_parse_signature_header() {
        let parsed = parse_signature_header("t=1234567890,v1=abc123,v0=zzz,v1=def456").unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures, vec!["abc123", "def456"]);
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(parse_signature_header("v1=abc").is_err());
        assert!(parse_signature_header("t=123").is_err());
        assert!(parse_signature_header("garbage").is_err());
    }

    #[test]
    fn test_sign_then_verify() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header(SECRET, NOW, payload).unwrap();

        assert!(verify_signature(SECRET, payload, &header, NOW + 10, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let header = signature_header(SECRET, NOW, br#"{"id":"evt_1"}"#).unwrap();
        let err = verify_signature(SECRET, br#"{"id":"evt_2"}"#, &header, NOW, DEFAULT_TOLERANCE_SECS)
            .unwrap_err();
        assert!(matches!(err, GateError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header("whsec_other", NOW, payload).unwrap();
        assert!(verify_signature(SECRET, payload, &header, NOW, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header(SECRET, NOW, payload).unwrap();
        let err = verify_signature(SECRET, payload, &header, NOW + 301, DEFAULT_TOLERANCE_SECS)
            .unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn test_any_v1_may_match() {
        let payload = br#"{"id":"evt_1"}"#;
        let good = signature_header(SECRET, NOW, payload).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1=deadbeef,v1={}", NOW, good_sig);

        assert!(verify_signature(SECRET, payload, &header, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }
}
