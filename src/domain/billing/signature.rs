//! Gateway webhook signature verification.
//!
//! The gateway signs the raw request body with HMAC-SHA256 keyed by the
//! shared webhook secret and sends the digest in a header, either as hex
//! or as base64, optionally prefixed with `sha256=`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Headers that may carry the signature, in lookup order.
pub const SIGNATURE_HEADERS: [&str; 2] = ["x-signature", "x-hub-signature-256"];

const SCHEME_PREFIX: &str = "sha256=";

/// Hex length of a SHA-256 digest.
const HEX_DIGEST_LEN: usize = 64;

/// Verifier bound to one webhook secret.
#[derive(Clone)]
pub struct WebhookSignatureVerifier {
    secret: String,
}

impl WebhookSignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Checks the body against whichever accepted signature header is present.
    pub fn verify_headers(&self, raw_body: &[u8], headers: &HeaderMap) -> bool {
        verify_signature(&self.secret, raw_body, signature_header(headers))
    }

    pub fn verify(&self, raw_body: &[u8], header_value: Option<&str>) -> bool {
        verify_signature(&self.secret, raw_body, header_value)
    }
}

impl std::fmt::Debug for WebhookSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSignatureVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// First non-empty accepted signature header.
///
/// `HeaderMap` normalizes names to lowercase, so lookups are
/// case-insensitive with respect to what the client sent.
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

/// Returns true only if `header_value` is the HMAC-SHA256 of `raw_body`.
///
/// Missing secret, empty body, missing header and undecodable digests are
/// all plain `false`; this function never errors.
pub fn verify_signature(secret: &str, raw_body: &[u8], header_value: Option<&str>) -> bool {
    if secret.is_empty() || raw_body.is_empty() {
        return false;
    }
    let Some(header) = header_value.map(str::trim).filter(|h| !h.is_empty()) else {
        return false;
    };
    let candidate = header.strip_prefix(SCHEME_PREFIX).unwrap_or(header).trim();
    let Some(provided) = decode_digest(candidate) else {
        return false;
    };
    let Some(expected) = compute_digest(secret, raw_body) else {
        return false;
    };

    constant_time_compare(&expected, &provided)
}

/// Hex-encoded signature of `raw_body`, in the form the gateway sends.
pub fn sign_hex(secret: &str, raw_body: &[u8]) -> Option<String> {
    compute_digest(secret, raw_body).map(hex::encode)
}

/// Base64-encoded signature of `raw_body`.
pub fn sign_base64(secret: &str, raw_body: &[u8]) -> Option<String> {
    compute_digest(secret, raw_body).map(|digest| STANDARD.encode(digest))
}

fn compute_digest(secret: &str, raw_body: &[u8]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(raw_body);
    Some(mac.finalize().into_bytes().to_vec())
}

fn decode_digest(candidate: &str) -> Option<Vec<u8>> {
    if candidate.is_empty() {
        return None;
    }
    if candidate.len() == HEX_DIGEST_LEN {
        if let Ok(bytes) = hex::decode(candidate) {
            return Some(bytes);
        }
    }
    STANDARD.decode(candidate).ok()
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use proptest::prelude::*;

    const TEST_SECRET: &str = "whsec_billing_test";
    const BODY: &[u8] = br#"{"id":"evt-1","type":"payment","data":{"id":"123"}}"#;

    // ══════════════════════════════════════════════════════════════
    // Accepted Encodings
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_hex_signature() {
        let sig = sign_hex(TEST_SECRET, BODY).unwrap();
        assert!(verify_signature(TEST_SECRET, BODY, Some(&sig)));
    }

    #[test]
    fn accepts_uppercase_hex_signature() {
        let sig = sign_hex(TEST_SECRET, BODY).unwrap().to_uppercase();
        assert!(verify_signature(TEST_SECRET, BODY, Some(&sig)));
    }

    #[test]
    fn accepts_base64_signature() {
        let sig = sign_base64(TEST_SECRET, BODY).unwrap();
        assert!(verify_signature(TEST_SECRET, BODY, Some(&sig)));
    }

    #[test]
    fn accepts_scheme_prefix() {
        let sig = format!("sha256={}", sign_hex(TEST_SECRET, BODY).unwrap());
        assert!(verify_signature(TEST_SECRET, BODY, Some(&sig)));
    }

    // ══════════════════════════════════════════════════════════════
    // Rejections
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn rejects_missing_header() {
        assert!(!verify_signature(TEST_SECRET, BODY, None));
        assert!(!verify_signature(TEST_SECRET, BODY, Some("   ")));
    }

    #[test]
    fn rejects_empty_secret() {
        let sig = sign_hex("", BODY).unwrap();
        assert!(!verify_signature("", BODY, Some(&sig)));
    }

    #[test]
    fn rejects_empty_body() {
        let sig = sign_hex(TEST_SECRET, b"").unwrap();
        assert!(!verify_signature(TEST_SECRET, b"", Some(&sig)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let sig = sign_hex("another-secret", BODY).unwrap();
        assert!(!verify_signature(TEST_SECRET, BODY, Some(&sig)));
    }

    #[test]
    fn rejects_unparsable_digest() {
        assert!(!verify_signature(TEST_SECRET, BODY, Some("not a digest!")));
        assert!(!verify_signature(TEST_SECRET, BODY, Some("sha256=")));
    }

    #[test]
    fn rejects_truncated_signature() {
        let sig = sign_hex(TEST_SECRET, BODY).unwrap();
        assert!(!verify_signature(TEST_SECRET, BODY, Some(&sig[..62])));
    }

    // ══════════════════════════════════════════════════════════════
    // Header Resolution
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn resolves_primary_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Signature", HeaderValue::from_static("abc"));
        assert_eq!(signature_header(&headers), Some("abc"));
    }

    #[test]
    fn falls_back_to_hub_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-signature", HeaderValue::from_static(""));
        headers.insert("X-Hub-Signature-256", HeaderValue::from_static("sha256=abc"));
        assert_eq!(signature_header(&headers), Some("sha256=abc"));
    }

    #[test]
    fn verifier_checks_headers() {
        let verifier = WebhookSignatureVerifier::new(TEST_SECRET);
        let mut headers = HeaderMap::new();
        let sig = sign_hex(TEST_SECRET, BODY).unwrap();
        headers.insert("x-hub-signature-256", HeaderValue::from_str(&sig).unwrap());

        assert!(verifier.verify_headers(BODY, &headers));
        assert!(!verifier.verify_headers(b"{}", &headers));
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", WebhookSignatureVerifier::new(TEST_SECRET));
        assert!(!debug.contains(TEST_SECRET));
    }

    proptest! {
        #[test]
        fn any_body_byte_flip_is_rejected(
            body in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let sig = sign_hex(TEST_SECRET, &body).unwrap();
            let mut tampered = body.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;
            prop_assert!(verify_signature(TEST_SECRET, &body, Some(&sig)));
            prop_assert!(!verify_signature(TEST_SECRET, &tampered, Some(&sig)));
        }

        #[test]
        fn any_signature_char_change_is_rejected(
            body in proptest::collection::vec(any::<u8>(), 1..128),
            index in any::<prop::sample::Index>(),
            replacement in "[0-9a-zA-Z+/=]",
        ) {
            let sig = sign_base64(TEST_SECRET, &body).unwrap();
            let i = index.index(sig.len());
            prop_assume!(&sig[i..i + 1] != replacement.as_str());
            let mut tampered = sig.clone();
            tampered.replace_range(i..i + 1, &replacement);
            prop_assert!(!verify_signature(TEST_SECRET, &body, Some(&tampered)));
        }
    }
}
