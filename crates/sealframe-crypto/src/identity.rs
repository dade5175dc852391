//! Per-session Ed25519 identity keys.
//!
//! Each peer generates a fresh identity keypair for every session and uses
//! it for exactly one thing: signing the exchange transcript so the peer can
//! bind the ephemeral exchange value to the identity key it received in the
//! Hello. The signing key never leaves the process and is zeroed on drop
//! (`ed25519-dalek` handles both).
//!
//! # Security
//!
//! With identity keys exchanged in-band, the signature provides binding, not
//! first-contact authentication: an active attacker present from the very
//! first message could substitute their own identity key (trust-on-first-use).
//! What it does rule out is substitution of the ephemeral exchange value
//! after the Hellos have been seen - the classic mid-handshake
//! man-in-the-middle splice.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};

use crate::{cipher::CipherSuite, error::CryptoError};

/// Domain separation label for exchange-transcript signatures.
const TRANSCRIPT_LABEL: &[u8] = b"sealframe.v1.exchange";

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 verifying key length in bytes.
pub const IDENTITY_KEY_LEN: usize = 32;

/// A session-scoped Ed25519 signing identity.
pub struct SessionIdentity {
    signing_key: SigningKey,
}

impl SessionIdentity {
    /// Generate a fresh identity for one session.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self { signing_key: SigningKey::generate(rng) }
    }

    /// Public verifying key, as sent in the Hello record.
    #[must_use]
    pub fn verifying_key_bytes(&self) -> [u8; IDENTITY_KEY_LEN] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign an exchange transcript.
    #[must_use]
    pub fn sign(&self, transcript: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(transcript).to_bytes()
    }
}

impl std::fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("verifying_key", &self.verifying_key_bytes())
            .finish_non_exhaustive()
    }
}

/// Build the byte string each peer signs: label, suite, both salt
/// contributions in initiator-first order, then the signer's own ephemeral
/// exchange value.
///
/// Binding the salts means a signature cannot be replayed into a different
/// session, and binding the suite means a downgrade attempt invalidates it.
#[must_use]
pub fn exchange_transcript(
    suite: CipherSuite,
    initiator_salt: &[u8; 32],
    responder_salt: &[u8; 32],
    exchange_value: &[u8; 32],
) -> Vec<u8> {
    // Capacity: label + 1 (suite) + 32 + 32 + 32
    let mut transcript = Vec::with_capacity(TRANSCRIPT_LABEL.len() + 97);
    transcript.extend_from_slice(TRANSCRIPT_LABEL);
    transcript.push(suite.to_wire());
    transcript.extend_from_slice(initiator_salt);
    transcript.extend_from_slice(responder_salt);
    transcript.extend_from_slice(exchange_value);
    transcript
}

/// Verify a peer's signature over an exchange transcript.
///
/// # Errors
///
/// - `CryptoError::InvalidPeerKey` if the identity key bytes are not a
///   valid Ed25519 point
/// - `CryptoError::SignatureInvalid` if the signature does not verify
pub fn verify_exchange_signature(
    identity_key: &[u8; IDENTITY_KEY_LEN],
    transcript: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<(), CryptoError> {
    let verifying_key =
        VerifyingKey::from_bytes(identity_key).map_err(|_| CryptoError::InvalidPeerKey)?;

    verifying_key
        .verify_strict(transcript, &Signature::from_bytes(signature))
        .map_err(|_| CryptoError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    fn transcript() -> Vec<u8> {
        exchange_transcript(CipherSuite::ChaCha20Poly1305, &[1; 32], &[2; 32], &[3; 32])
    }

    #[test]
    fn sign_verify_roundtrip() {
        let identity = SessionIdentity::generate(&mut OsRng);
        let transcript = transcript();

        let signature = identity.sign(&transcript);
        verify_exchange_signature(&identity.verifying_key_bytes(), &transcript, &signature)
            .unwrap();
    }

    #[test]
    fn wrong_key_fails_verification() {
        let identity = SessionIdentity::generate(&mut OsRng);
        let other = SessionIdentity::generate(&mut OsRng);
        let transcript = transcript();

        let signature = identity.sign(&transcript);
        let result =
            verify_exchange_signature(&other.verifying_key_bytes(), &transcript, &signature);

        assert_eq!(result, Err(CryptoError::SignatureInvalid));
    }

    #[test]
    fn tampered_transcript_fails_verification() {
        let identity = SessionIdentity::generate(&mut OsRng);
        let transcript = transcript();

        let signature = identity.sign(&transcript);
        let mut tampered = transcript.clone();
        tampered[TRANSCRIPT_LABEL.len()] ^= 0x01; // flip the suite byte

        let result =
            verify_exchange_signature(&identity.verifying_key_bytes(), &tampered, &signature);

        assert_eq!(result, Err(CryptoError::SignatureInvalid));
    }

    #[test]
    fn transcript_depends_on_salt_order() {
        let a = exchange_transcript(CipherSuite::Aes256Gcm, &[1; 32], &[2; 32], &[3; 32]);
        let b = exchange_transcript(CipherSuite::Aes256Gcm, &[2; 32], &[1; 32], &[3; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let identity = SessionIdentity::generate(&mut OsRng);
        let transcript = transcript();

        let mut signature = identity.sign(&transcript);
        signature[0] ^= 0x01;

        let result =
            verify_exchange_signature(&identity.verifying_key_bytes(), &transcript, &signature);

        assert_eq!(result, Err(CryptoError::SignatureInvalid));
    }
}
