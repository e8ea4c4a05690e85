//! Payment webhook signature verification.
//!
//! The gateway signs `id:<data.id>;request-id:<x-request-id>;ts:<ts>;` with
//! HMAC-SHA256 and sends `x-signature: ts=<ts>,v1=<hex digest>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Webhook secret is not configured")]
    NotConfigured,
    #[error("Missing x-signature header")]
    MissingHeader,
    #[error("Malformed x-signature header")]
    Malformed,
    #[error("Signature mismatch")]
    Mismatch,
}

/// Parsed `x-signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub ts: String,
    pub v1: String,
}

pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ts" => ts = Some(value.trim().to_string()),
            "v1" => v1 = Some(value.trim().to_string()),
            _ => {}
        }
    }

    match (ts, v1) {
        (Some(ts), Some(v1)) if !ts.is_empty() && !v1.is_empty() => Ok(SignatureHeader { ts, v1 }),
        _ => Err(SignatureError::Malformed),
    }
}

/// Alphanumeric resource ids are signed lowercased
pub fn normalize_data_id(data_id: &str) -> String {
    if data_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        data_id.to_ascii_lowercase()
    } else {
        data_id.to_string()
    }
}

/// Signed manifest. Parts without a value are left out.
pub fn build_manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        manifest.push_str(&format!("id:{};", normalize_data_id(id)));
    }
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    if !ts.is_empty() {
        manifest.push_str(&format!("ts:{};", ts));
    }
    manifest
}

fn keyed_mac(secret: &str) -> Result<HmacSha256, SignatureError> {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::NotConfigured)
}

/// Hex HMAC-SHA256 of `payload`
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac = keyed_mac(secret)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex digest against `payload`
pub fn verify_hex_digest(secret: &str, payload: &[u8], digest_hex: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(digest_hex.trim()).map_err(|_| SignatureError::Malformed)?;
    let mut mac = keyed_mac(secret)?;
    mac.update(payload);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Verify a webhook request. The digest comparison is constant time.
pub fn verify_signature(
    secret: Option<&str>,
    signature_header: Option<&str>,
    request_id: Option<&str>,
    data_id: Option<&str>,
) -> Result<(), SignatureError> {
    let secret = secret.filter(|s| !s.is_empty()).ok_or(SignatureError::NotConfigured)?;
    let header = parse_signature_header(signature_header.ok_or(SignatureError::MissingHeader)?)?;
    let manifest = build_manifest(data_id, request_id, &header.ts);
    verify_hex_digest(secret, manifest.as_bytes(), &header.v1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn test_parse_header() {
        let parsed = parse_signature_header("ts=1704908010,v1=abc123").unwrap();
        assert_eq!(parsed.ts, "1704908010");
        assert_eq!(parsed.v1, "abc123");

        let spaced = parse_signature_header(" v1=ff , ts=1 ").unwrap();
        assert_eq!(spaced.ts, "1");
        assert_eq!(parse_signature_header("ts=1"), Err(SignatureError::Malformed));
        assert_eq!(parse_signature_header("garbage"), Err(SignatureError::Malformed));
    }

    #[test]
    fn test_manifest_format() {
        assert_eq!(
            build_manifest(Some("123456"), Some("req-1"), "1704908010"),
            "id:123456;request-id:req-1;ts:1704908010;"
        );
        assert_eq!(build_manifest(Some("ABC9"), None, "17"), "id:abc9;ts:17;");
        assert_eq!(build_manifest(None, Some("r"), "17"), "request-id:r;ts:17;");
    }

    #[test]
    fn test_valid_signature_accepted() {
        let manifest = build_manifest(Some("987"), Some("req-9"), "1700000000");
        let header = format!("ts=1700000000,v1={}", sign(SECRET, manifest.as_bytes()).unwrap());
        assert_eq!(
            verify_signature(Some(SECRET), Some(&header), Some("req-9"), Some("987")),
            Ok(())
        );
    }

    #[test]
    fn test_tampered_request_rejected() {
        let manifest = build_manifest(Some("987"), Some("req-9"), "1700000000");
        let header = format!("ts=1700000000,v1={}", sign(SECRET, manifest.as_bytes()).unwrap());

        assert_eq!(
            verify_signature(Some(SECRET), Some(&header), Some("req-9"), Some("988")),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(Some("other"), Some(&header), Some("req-9"), Some("987")),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(None, Some(&header), Some("req-9"), Some("987")),
            Err(SignatureError::NotConfigured)
        );
        assert_eq!(
            verify_signature(Some(SECRET), None, Some("req-9"), Some("987")),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify_signature(Some(SECRET), Some("ts=1,v1=zz"), None, None),
            Err(SignatureError::Malformed)
        );
    }
}
