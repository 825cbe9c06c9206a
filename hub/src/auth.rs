//! Call token issuance and challenge/response authentication.
//!
//! The hub issues an unpredictable call token during setup and a random
//! numeric challenge during authentication. The peer proves itself by
//! returning an RSA PKCS#1 v1.5 / SHA-1 signature over the challenge text,
//! checked against the network's trusted public key. A failed check is an
//! ordinary outcome, not a fault.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::Sha1;
use tracing::debug;

use crate::error::{Error, Result};

/// Issues an opaque call token: unix seconds, a separator, and 40 hex
/// characters of fresh entropy.
pub fn issue_call_token() -> Vec<u8> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let mut entropy = [0u8; 20];
    rand::thread_rng().fill(&mut entropy[..]);
    format!("{now}?{}", hex::encode(entropy)).into_bytes()
}

/// Issues a fresh nine-digit decimal challenge.
pub fn issue_challenge() -> String {
    format!("{:09}", rand::thread_rng().gen_range(1..=999_999_999u32))
}

/// Verifies signed challenge responses against the trusted public key.
pub struct ChallengeVerifier {
    key: VerifyingKey<Sha1>,
}

impl ChallengeVerifier {
    /// Loads a PEM-encoded RSA public key. Called once at startup; failure
    /// is a startup abort.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem).map_err(|e| Error::Key(e.to_string()))?;
        Ok(Self { key: VerifyingKey::new(key) })
    }

    /// Checks a base64-encoded signature over the UTF-8 challenge bytes.
    ///
    /// Malformed base64 or signature bytes count as a failed check.
    pub fn verify(&self, challenge: &str, signature_b64: &[u8]) -> bool {
        let Ok(text) = std::str::from_utf8(signature_b64) else {
            debug!("challenge response is not valid UTF-8");
            return false;
        };
        let Ok(raw) = STANDARD.decode(text.trim()) else {
            debug!("challenge response is not valid base64");
            return false;
        };
        let Ok(signature) = Signature::try_from(raw.as_slice()) else {
            debug!("challenge response has a malformed signature");
            return false;
        };
        self.key.verify(challenge.as_bytes(), &signature).is_ok()
    }
}
