//! HMAC-SHA256 delivery signatures.
//!
//! The signed message is `"<timestamp>.<body>"`; the header value is
//! `sha256=<hex>`. Receivers recompute the MAC and compare in constant
//! time, rejecting timestamps outside the replay window.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Maximum accepted distance between the receiver clock and `X-Timestamp`.
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

pub fn sign(secret: &str, timestamp: i64, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Verifies a signature against `body` and `timestamp`, evaluated at
/// receiver time `now`. Comparison is constant-time via `Mac::verify_slice`.
pub fn verify(signature: &str, secret: &str, timestamp: i64, body: &str, now: i64) -> bool {
    if (now - timestamp).abs() > MAX_CLOCK_SKEW_SECS {
        return false;
    }

    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-signing-secret-test-signing-secret";

    #[test]
    fn test_sign_format() {
        let sig = sign(SECRET, 1_700_000_000, "{\"event\":\"claim.confirmed\"}");
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), "sha256=".len() + 64);
    }

    #[test]
    fn test_round_trip() {
        let ts = 1_700_000_000;
        let body = "{\"event\":\"claim.confirmed\",\"id\":\"evt-1\"}";
        let sig = sign(SECRET, ts, body);
        assert!(verify(&sig, SECRET, ts, body, ts));
        assert!(verify(&sig, SECRET, ts, body, ts + MAX_CLOCK_SKEW_SECS));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let ts = 1_700_000_000;
        let sig = sign(SECRET, ts, "original");
        assert!(!verify(&sig, SECRET, ts, "tampered", ts));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let ts = 1_700_000_000;
        let sig = sign(SECRET, ts, "body");
        assert!(!verify(&sig, "another-secret", ts, "body", ts));
    }

    #[test]
    fn test_replay_window() {
        let ts = 1_700_000_000;
        let sig = sign(SECRET, ts, "body");
        assert!(!verify(&sig, SECRET, ts, "body", ts + 400));
        assert!(!verify(&sig, SECRET, ts, "body", ts - 400));
        assert!(verify(&sig, SECRET, ts, "body", ts + 299));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let ts = 1_700_000_000;
        assert!(!verify("md5=abcdef", SECRET, ts, "body", ts));
        assert!(!verify("sha256=zz-not-hex", SECRET, ts, "body", ts));
        assert!(!verify("", SECRET, ts, "body", ts));
    }

    #[test]
    fn test_timestamp_is_part_of_the_mac() {
        let sig = sign(SECRET, 1_700_000_000, "body");
        assert!(!verify(&sig, SECRET, 1_700_000_001, "body", 1_700_000_001));
    }
}
