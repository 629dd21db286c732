//! Payload signatures between internal services
//!
//! A signature is `sha1=<hex HMAC-SHA1>` computed with the process-wide
//! payload secret. In the default scheme the MAC covers exactly the raw body
//! bytes and nothing else, so the same body always produces the same
//! signature and a captured request can be replayed. Setting a freshness
//! window switches to the timestamped scheme, where the MAC covers
//! `"<unix seconds>." || body` and the timestamp travels in its own header.

use std::fmt;
use std::time::Duration;

use hmac::{Hmac, Mac};
use hyper::HeaderMap;
use sha1::Sha1;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "X-Cloud-Signature";

/// Header carrying the signing time in the timestamped scheme
pub const SIGNATURE_TIMESTAMP_HEADER: &str = "X-Cloud-Signature-Timestamp";

/// Scheme tag in front of the hex digest
pub const SCHEME_PREFIX: &str = "sha1=";

/// Shared secret for payload signatures. Zeroed on drop, redacted in Debug.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PayloadSecret(Vec<u8>);

impl PayloadSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PayloadSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadSecret(..)")
    }
}

fn keyed_mac(secret: &PayloadSecret) -> HmacSha1 {
    HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}

fn encode(mac: HmacSha1) -> String {
    format!("{}{}", SCHEME_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

fn check(mac: HmacSha1, signature: &str) -> bool {
    let Some(digest_hex) = signature.strip_prefix(SCHEME_PREFIX) else {
        return false;
    };
    let Ok(digest) = hex::decode(digest_hex) else {
        return false;
    };
    // verify_slice is constant time and rejects any length mismatch
    mac.verify_slice(&digest).is_ok()
}

/// Sign a body. An empty body is a valid payload.
pub fn sign(body: &[u8], secret: &PayloadSecret) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(body);
    encode(mac)
}

/// Verify a body signature
pub fn verify(body: &[u8], signature: &str, secret: &PayloadSecret) -> bool {
    let mut mac = keyed_mac(secret);
    mac.update(body);
    check(mac, signature)
}

/// Sign `"<timestamp>." || body`
pub fn sign_timestamped(body: &[u8], timestamp: i64, secret: &PayloadSecret) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(body);
    encode(mac)
}

/// Verify a timestamped signature
pub fn verify_timestamped(
    body: &[u8],
    timestamp: i64,
    signature: &str,
    secret: &PayloadSecret,
) -> bool {
    let mut mac = keyed_mac(secret);
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(body);
    check(mac, signature)
}

/// Which material the MAC covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// MAC over the body only
    BodyOnly,
    /// MAC over timestamp and body, rejected outside `max_age`
    Timestamped { max_age: Duration },
}

impl SignatureScheme {
    pub fn from_max_age(max_age_secs: Option<u64>) -> Self {
        match max_age_secs {
            Some(secs) => Self::Timestamped {
                max_age: Duration::from_secs(secs),
            },
            None => Self::BodyOnly,
        }
    }
}

/// Why an inbound signature was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureRejection {
    #[error("signature header missing")]
    Missing,

    #[error("signature does not match payload")]
    Mismatch,

    #[error("signature timestamp missing or malformed")]
    BadTimestamp,

    #[error("signature timestamp outside freshness window")]
    Stale,
}

/// Signs outbound bodies and verifies inbound ones with the shared secret
#[derive(Debug, Clone)]
pub struct PayloadSigner {
    secret: PayloadSecret,
    scheme: SignatureScheme,
}

impl PayloadSigner {
    pub fn new(secret: PayloadSecret, scheme: SignatureScheme) -> Self {
        Self { secret, scheme }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Headers to attach to an outbound request carrying `body`
    pub fn signature_headers(&self, body: &[u8]) -> Vec<(&'static str, String)> {
        self.signature_headers_at(body, chrono::Utc::now().timestamp())
    }

    fn signature_headers_at(&self, body: &[u8], now: i64) -> Vec<(&'static str, String)> {
        match self.scheme {
            SignatureScheme::BodyOnly => vec![(SIGNATURE_HEADER, sign(body, &self.secret))],
            SignatureScheme::Timestamped { .. } => vec![
                (SIGNATURE_HEADER, sign_timestamped(body, now, &self.secret)),
                (SIGNATURE_TIMESTAMP_HEADER, now.to_string()),
            ],
        }
    }

    /// Verify the signature headers of an inbound request against its raw body
    pub fn verify_request(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureRejection> {
        self.verify_request_at(headers, body, chrono::Utc::now().timestamp())
    }

    fn verify_request_at(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureRejection> {
        let signature = header_str(headers, SIGNATURE_HEADER)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureRejection::Missing)?;

        match self.scheme {
            SignatureScheme::BodyOnly => {
                if verify(body, signature, &self.secret) {
                    Ok(())
                } else {
                    Err(SignatureRejection::Mismatch)
                }
            }
            SignatureScheme::Timestamped { max_age } => {
                let timestamp: i64 = header_str(headers, SIGNATURE_TIMESTAMP_HEADER)
                    .and_then(|v| v.trim().parse().ok())
                    .ok_or(SignatureRejection::BadTimestamp)?;

                let tolerance = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
                if now.saturating_sub(timestamp).abs() > tolerance {
                    return Err(SignatureRejection::Stale);
                }

                if verify_timestamped(body, timestamp, signature, &self.secret) {
                    Ok(())
                } else {
                    Err(SignatureRejection::Mismatch)
                }
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn secret(s: &str) -> PayloadSecret {
        PayloadSecret::new(s.as_bytes().to_vec())
    }

    fn headers_from(pairs: Vec<(&'static str, String)>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(name, HeaderValue::from_str(&value).unwrap());
        }
        headers
    }

    #[test]
    fn test_sign_is_deterministic() {
        let k = secret("shared");
        let body = br#"{"userIds":["a"],"type":"notification"}"#;
        assert_eq!(sign(body, &k), sign(body, &k));
    }

    #[test]
    fn test_sign_known_vector() {
        // RFC 2202 test case 2
        let k = secret("Jefe");
        assert_eq!(
            sign(b"what do ya want for nothing?", &k),
            "sha1=effcdf6ae5eb2fa2d27416d5f184df9c259a7c79"
        );
    }

    #[test]
    fn test_different_bodies_differ() {
        let k = secret("shared");
        assert_ne!(sign(b"body-1", &k), sign(b"body-2", &k));
    }

    #[test]
    fn test_empty_body_is_signable() {
        let k = secret("shared");
        let signature = sign(b"", &k);
        assert!(signature.starts_with(SCHEME_PREFIX));
        assert_eq!(signature.len(), SCHEME_PREFIX.len() + 40);
        assert!(verify(b"", &signature, &k));
    }

    #[test]
    fn test_verify_round_trip_and_wrong_key() {
        let body = b"payload";
        let signature = sign(body, &secret("k1"));
        assert!(verify(body, &signature, &secret("k1")));
        assert!(!verify(body, &signature, &secret("k2")));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let k = secret("shared");
        let signature = sign(b"payload", &k);

        // truncated
        assert!(!verify(b"payload", &signature[..signature.len() - 2], &k));
        // wrong scheme prefix
        let swapped = signature.replacen("sha1=", "sha256=", 1);
        assert!(!verify(b"payload", &swapped, &k));
        // no prefix
        assert!(!verify(b"payload", signature.trim_start_matches("sha1="), &k));
        // not hex
        assert!(!verify(b"payload", "sha1=zzzz", &k));
        // different body
        assert!(!verify(b"payload!", &signature, &k));
    }

    #[test]
    fn test_signer_body_only_round_trip() {
        let signer = PayloadSigner::new(secret("shared"), SignatureScheme::BodyOnly);
        let headers = headers_from(signer.signature_headers(b"abc"));
        assert!(headers.get(SIGNATURE_TIMESTAMP_HEADER).is_none());
        assert_eq!(signer.verify_request(&headers, b"abc"), Ok(()));
        assert_eq!(
            signer.verify_request(&headers, b"abd"),
            Err(SignatureRejection::Mismatch)
        );
    }

    #[test]
    fn test_signer_missing_header() {
        let signer = PayloadSigner::new(secret("shared"), SignatureScheme::BodyOnly);
        assert_eq!(
            signer.verify_request(&HeaderMap::new(), b""),
            Err(SignatureRejection::Missing)
        );
    }

    #[test]
    fn test_timestamped_within_window() {
        let signer = PayloadSigner::new(
            secret("shared"),
            SignatureScheme::Timestamped {
                max_age: Duration::from_secs(60),
            },
        );
        let headers = headers_from(signer.signature_headers_at(b"abc", 1_000));
        assert_eq!(signer.verify_request_at(&headers, b"abc", 1_030), Ok(()));
    }

    #[test]
    fn test_timestamped_rejects_stale_and_future() {
        let signer = PayloadSigner::new(
            secret("shared"),
            SignatureScheme::Timestamped {
                max_age: Duration::from_secs(60),
            },
        );
        let headers = headers_from(signer.signature_headers_at(b"abc", 1_000));
        assert_eq!(
            signer.verify_request_at(&headers, b"abc", 1_061),
            Err(SignatureRejection::Stale)
        );
        assert_eq!(
            signer.verify_request_at(&headers, b"abc", 900),
            Err(SignatureRejection::Stale)
        );
    }

    #[test]
    fn test_timestamped_rejects_body_only_signature() {
        let signer = PayloadSigner::new(
            secret("shared"),
            SignatureScheme::Timestamped {
                max_age: Duration::from_secs(60),
            },
        );
        let mut headers = headers_from(vec![(SIGNATURE_HEADER, sign(b"abc", &secret("shared")))]);
        assert_eq!(
            signer.verify_request_at(&headers, b"abc", 1_000),
            Err(SignatureRejection::BadTimestamp)
        );

        headers.insert(SIGNATURE_TIMESTAMP_HEADER, HeaderValue::from_static("1000"));
        assert_eq!(
            signer.verify_request_at(&headers, b"abc", 1_000),
            Err(SignatureRejection::Mismatch)
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        assert_eq!(format!("{:?}", secret("hunter2")), "PayloadSecret(..)");
    }

    mod proptest_signature {
        use super::*;
        use proptest::prelude::*;

        // Zero bytes are excluded: HMAC pads short keys with zeros, so
        // "a" and "a\0" are the same key.
        fn key() -> impl Strategy<Value = Vec<u8>> {
            proptest::collection::vec(1u8.., 1..64)
        }

        proptest! {
            #[test]
            fn prop_sign_is_deterministic(body in any::<Vec<u8>>(), k in key()) {
                let secret = PayloadSecret::new(k);
                prop_assert_eq!(sign(&body, &secret), sign(&body, &secret));
            }

            #[test]
            fn prop_signature_verifies(body in any::<Vec<u8>>(), k in key()) {
                let secret = PayloadSecret::new(k);
                let signature = sign(&body, &secret);
                prop_assert!(signature.starts_with("sha1="));
                prop_assert!(verify(&body, &signature, &secret));
            }

            #[test]
            fn prop_other_key_rejected(body in any::<Vec<u8>>(), k in key(), k2 in key()) {
                prop_assume!(k != k2);
                let signature = sign(&body, &PayloadSecret::new(k));
                prop_assert!(!verify(&body, &signature, &PayloadSecret::new(k2)));
            }

            #[test]
            fn prop_truncated_signature_rejected(
                body in any::<Vec<u8>>(),
                k in key(),
                cut in 1usize..=40,
            ) {
                let secret = PayloadSecret::new(k);
                let signature = sign(&body, &secret);
                let truncated = &signature[..signature.len() - cut];
                prop_assert!(!verify(&body, truncated, &secret));
            }

            #[test]
            fn prop_prefix_required(body in any::<Vec<u8>>(), k in key()) {
                let secret = PayloadSecret::new(k);
                let signature = sign(&body, &secret);
                let bare = signature.trim_start_matches("sha1=");
                prop_assert!(!verify(&body, bare, &secret));
                let other = format!("sha256={}", bare);
                prop_assert!(!verify(&body, &other, &secret));
            }
        }
    }
}
