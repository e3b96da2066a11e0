//! Offline license issuance.
//!
//! Issuance never runs inside the server's request path: tokens are minted
//! by whoever holds the signing key (the `taskdeck license issue` command)
//! and handed to the customer out of band.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::models::license::LicenseClaims;

/// Holder of the Ed25519 signing key.
pub struct LicenseSigner {
    key: SigningKey,
}

impl LicenseSigner {
    /// Fresh random keypair.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_hex(hex_seed: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(hex_seed.trim())?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("signing key must be 32 bytes, got {}", bytes.len()))?;
        Ok(Self::from_seed(&seed))
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn seed_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    pub fn verifying_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }
}

/// Serializes `claims` once and signs those exact bytes. The verifier
/// checks the signature over the same string, so the JSON produced here is
/// never re-serialized anywhere downstream.
pub fn issue(signer: &LicenseSigner, claims: &LicenseClaims) -> String {
    // Struct serialization of LicenseClaims cannot fail.
    let payload = serde_json::to_string(claims).unwrap_or_default();
    let signature = signer.sign(payload.as_bytes());
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        URL_SAFE_NO_PAD.encode(signature)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::{Ed25519Verifier, LicenseVerifier};

    #[test]
    fn issue_then_verify_round_trip() {
        let signer = LicenseSigner::generate();
        let token = issue(
            &signer,
            &LicenseClaims {
                expiry: "2031-12-31".to_string(),
                customer: "Globex".to_string(),
                created: Some("2026-08-30T12:00:00Z".to_string()),
            },
        );
        let verifier = LicenseVerifier::new(Ed25519Verifier::new(signer.verifying_key()));
        let v = verifier.verify_at(&token, "2026-08-30");
        assert!(v.valid);
        assert_eq!(v.customer.as_deref(), Some("Globex"));
    }

    #[test]
    fn seed_hex_round_trips() {
        let signer = LicenseSigner::generate();
        let restored = LicenseSigner::from_hex(&signer.seed_hex()).unwrap();
        assert_eq!(signer.verifying_key_hex(), restored.verifying_key_hex());
    }
}
