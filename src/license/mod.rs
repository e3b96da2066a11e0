//! Offline license token verification.
//!
//! A token is `base64url(payload_json) + "." + base64url(signature)`. The
//! Ed25519 signature covers the exact bytes of the decoded payload string,
//! so the payload is verified *before* it is parsed as JSON: re-serializing
//! first would break the signature on any key-order or whitespace change,
//! and parsing first would mean trusting unauthenticated input.
//!
//! Verification is a pure function of the token, the verifying key and the
//! current date. No licensing server is contacted.

pub mod issuer;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};

use crate::models::license::{LicenseClaims, Verdict};

pub const ERR_FORMAT: &str = "Invalid token format";
pub const ERR_SIGNATURE: &str = "Invalid Signature";
pub const ERR_EXPIRED: &str = "License Expired";

/// Hex-encoded Ed25519 verifying key baked into release builds. Pairs with
/// the issuer's signing key; self-hosted deployments override it with
/// `TASKDECK_LICENSE_PUBLIC_KEY`.
pub const EMBEDDED_PUBLIC_KEY_HEX: &str =
    "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

/// Signature primitive behind the verifier, so the same pipeline runs
/// against generated test keys or a future HSM-backed implementation.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 over raw message bytes (RFC 8032, strict verification).
pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    pub fn from_hex(hex_key: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(hex_key.trim())?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("verifying key must be 32 bytes, got {}", bytes.len()))?;
        let key = VerifyingKey::from_bytes(&arr)?;
        Ok(Self { key })
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        self.key.verify_strict(message, &sig).is_ok()
    }
}

/// Verifies license tokens against one fixed verifying key.
pub struct LicenseVerifier<V = Ed25519Verifier> {
    sig: V,
}

impl LicenseVerifier<Ed25519Verifier> {
    /// Verifier for the key configured at startup (hex-encoded).
    pub fn from_hex_key(hex_key: &str) -> anyhow::Result<Self> {
        Ok(Self::new(Ed25519Verifier::from_hex(hex_key)?))
    }
}

impl<V: SignatureVerifier> LicenseVerifier<V> {
    pub fn new(sig: V) -> Self {
        Self { sig }
    }

    /// Verifies `token` against the current UTC date.
    pub fn verify(&self, token: &str) -> Verdict {
        self.verify_at(token, &today())
    }

    /// Verifies `token` as of `today` (`YYYY-MM-DD`).
    ///
    /// Never panics and never returns an error to the caller: malformed
    /// input, decode failures, signature mismatch and JSON failures all
    /// normalize to `valid: false` with a user-facing message.
    pub fn verify_at(&self, token: &str, today: &str) -> Verdict {
        let parts: Vec<&str> = token.split('.').collect();
        let &[payload_b64, signature_b64] = parts.as_slice() else {
            return Verdict::rejected(ERR_FORMAT);
        };
        if payload_b64.is_empty() || signature_b64.is_empty() {
            return Verdict::rejected(ERR_FORMAT);
        }

        let Ok(payload_bytes) = decode_segment(payload_b64) else {
            return Verdict::rejected(ERR_FORMAT);
        };
        let Ok(payload) = String::from_utf8(payload_bytes) else {
            return Verdict::rejected(ERR_FORMAT);
        };
        let Ok(signature) = decode_segment(signature_b64) else {
            return Verdict::rejected(ERR_FORMAT);
        };

        // Signature first. Nothing in the payload is trusted until this
        // passes, including the expiry.
        if !self.sig.verify(payload.as_bytes(), &signature) {
            return Verdict::rejected(ERR_SIGNATURE);
        }

        let Ok(claims) = serde_json::from_str::<LicenseClaims>(&payload) else {
            return Verdict::rejected(ERR_FORMAT);
        };

        if claims.expiry.as_str() < today {
            return Verdict {
                valid: false,
                expiry: Some(claims.expiry),
                customer: Some(claims.customer),
                error: Some(ERR_EXPIRED.to_string()),
            };
        }

        Verdict {
            valid: true,
            expiry: Some(claims.expiry),
            customer: Some(claims.customer),
            error: None,
        }
    }
}

/// Today's UTC date in the `YYYY-MM-DD` format the expiry claim uses.
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Tokens in the wild come both padded and unpadded; accept either.
fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| URL_SAFE.decode(segment))
}

#[cfg(test)]
mod tests {
    use super::issuer::{issue, LicenseSigner};
    use super::*;
    use crate::models::license::LicenseClaims;

    fn signer() -> LicenseSigner {
        // Fixed seed keeps the test tokens stable across runs.
        LicenseSigner::from_seed(&[7u8; 32])
    }

    fn verifier() -> LicenseVerifier<Ed25519Verifier> {
        LicenseVerifier::new(Ed25519Verifier::new(signer().verifying_key()))
    }

    fn token(expiry: &str) -> String {
        issue(
            &signer(),
            &LicenseClaims {
                expiry: expiry.to_string(),
                customer: "Acme".to_string(),
                created: Some("2026-01-01T00:00:00Z".to_string()),
            },
        )
    }

    #[test]
    fn valid_token_returns_claims() {
        let v = verifier().verify_at(&token("2030-01-01"), "2026-06-01");
        assert!(v.valid);
        assert_eq!(v.expiry.as_deref(), Some("2030-01-01"));
        assert_eq!(v.customer.as_deref(), Some("Acme"));
        assert_eq!(v.error, None);
    }

    #[test]
    fn expiry_on_today_is_still_valid() {
        let v = verifier().verify_at(&token("2026-06-01"), "2026-06-01");
        assert!(v.valid);
    }

    #[test]
    fn expiry_one_day_past_is_expired_but_discloses_claims() {
        let v = verifier().verify_at(&token("2026-05-31"), "2026-06-01");
        assert!(!v.valid);
        assert_eq!(v.error.as_deref(), Some(ERR_EXPIRED));
        assert_eq!(v.expiry.as_deref(), Some("2026-05-31"));
        assert_eq!(v.customer.as_deref(), Some("Acme"));
    }

    #[test]
    fn wrong_segment_count_is_a_format_error() {
        let v = verifier();
        for bad in ["", "onlyone", "a.b.c", ".", "a.", ".b"] {
            let out = v.verify_at(bad, "2026-06-01");
            assert!(!out.valid, "{bad:?} should be rejected");
            assert_eq!(out.error.as_deref(), Some(ERR_FORMAT), "{bad:?}");
        }
    }

    #[test]
    fn non_base64_segments_are_a_format_error() {
        let v = verifier().verify_at("!!!.???", "2026-06-01");
        assert_eq!(v.error.as_deref(), Some(ERR_FORMAT));
    }

    #[test]
    fn tampered_payload_fails_on_signature_not_expiry() {
        let t = token("2000-01-01"); // long expired
        let dot = t.find('.').unwrap();
        // Re-encode a far-future expiry over the signed payload.
        let forged_payload = URL_SAFE_NO_PAD
            .encode(r#"{"expiry":"2099-01-01","customer":"Acme"}"#.as_bytes());
        let forged = format!("{}{}", forged_payload, &t[dot..]);
        let v = verifier().verify_at(&forged, "2026-06-01");
        assert!(!v.valid);
        // Tampering is caught by the signature before expiry is consulted.
        assert_eq!(v.error.as_deref(), Some(ERR_SIGNATURE));
        assert_eq!(v.expiry, None);
    }

    #[test]
    fn any_flipped_signature_byte_fails_verification() {
        let t = token("2030-01-01");
        let dot = t.find('.').unwrap();
        let mut sig_bytes = decode_segment(&t[dot + 1..]).unwrap();
        for i in [0, sig_bytes.len() / 2, sig_bytes.len() - 1] {
            sig_bytes[i] ^= 0x01;
            let forged = format!("{}.{}", &t[..dot], URL_SAFE_NO_PAD.encode(&sig_bytes));
            let v = verifier().verify_at(&forged, "2026-06-01");
            assert_eq!(v.error.as_deref(), Some(ERR_SIGNATURE), "byte {i}");
            sig_bytes[i] ^= 0x01;
        }
    }

    #[test]
    fn signed_non_json_payload_is_a_format_error() {
        let signer = signer();
        let payload = "not json at all";
        let sig = signer.sign(payload.as_bytes());
        let t = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(sig)
        );
        let v = verifier().verify_at(&t, "2026-06-01");
        assert_eq!(v.error.as_deref(), Some(ERR_FORMAT));
    }

    #[test]
    fn padded_base64_segments_are_accepted() {
        let t = token("2030-01-01");
        let dot = t.find('.').unwrap();
        let payload = decode_segment(&t[..dot]).unwrap();
        let sig = decode_segment(&t[dot + 1..]).unwrap();
        let padded = format!("{}.{}", URL_SAFE.encode(&payload), URL_SAFE.encode(&sig));
        let v = verifier().verify_at(&padded, "2026-06-01");
        assert!(v.valid);
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let other = LicenseSigner::from_seed(&[9u8; 32]);
        let t = issue(
            &other,
            &LicenseClaims {
                expiry: "2030-01-01".to_string(),
                customer: "Mallory".to_string(),
                created: None,
            },
        );
        let v = verifier().verify_at(&t, "2026-06-01");
        assert_eq!(v.error.as_deref(), Some(ERR_SIGNATURE));
    }

    #[test]
    fn embedded_key_constant_parses() {
        assert!(Ed25519Verifier::from_hex(EMBEDDED_PUBLIC_KEY_HEX).is_ok());
    }
}
