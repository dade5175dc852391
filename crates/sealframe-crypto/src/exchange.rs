//! Ephemeral x25519 key agreement.
//!
//! The exchange group is fixed: Curve25519 for both peers, by construction.
//! Each session draws a fresh ephemeral secret; [`EphemeralExchange::agree`]
//! consumes it, so the use-exactly-once invariant is enforced by the type
//! system rather than by convention.

use rand::{CryptoRng, RngCore};
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// x25519 public value length in bytes.
pub const EXCHANGE_VALUE_LEN: usize = 32;

/// A per-session ephemeral exchange pair.
///
/// The secret half never leaves this struct and is consumed by
/// [`agree`](Self::agree); only the public half is ever serialized.
pub struct EphemeralExchange {
    secret: EphemeralSecret,
    public: [u8; EXCHANGE_VALUE_LEN],
}

impl EphemeralExchange {
    /// Draw a fresh ephemeral pair for one session.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = EphemeralSecret::random_from_rng(&mut *rng);
        let public = PublicKey::from(&secret).to_bytes();
        Self { secret, public }
    }

    /// Public exchange value, as sent in the `ExchangeValue` record.
    #[must_use]
    pub fn public_value(&self) -> [u8; EXCHANGE_VALUE_LEN] {
        self.public
    }

    /// Combine with the peer's public value, consuming the ephemeral secret.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidPeerKey` if the peer's value is degenerate
    ///   (a low-order point producing an all-zero shared secret)
    pub fn agree(self, peer_value: &[u8; EXCHANGE_VALUE_LEN]) -> Result<SharedSecret, CryptoError> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_value));

        if !shared.was_contributory() {
            return Err(CryptoError::InvalidPeerKey);
        }

        Ok(SharedSecret { bytes: *shared.as_bytes() })
    }
}

impl std::fmt::Debug for EphemeralExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralExchange").field("public", &self.public).finish_non_exhaustive()
    }
}

/// Raw agreement output, input to key derivation only.
///
/// Never used directly as a cipher key; see
/// [`derive_session_key`](crate::derive_session_key). Zeroed on drop.
pub struct SharedSecret {
    bytes: [u8; 32],
}

impl SharedSecret {
    /// Raw secret bytes, consumed by HKDF.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Build from raw bytes (test fixtures and the concatenation-order
    /// regression scenario).
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn both_sides_agree_on_the_same_secret() {
        let alice = EphemeralExchange::generate(&mut OsRng);
        let bob = EphemeralExchange::generate(&mut OsRng);

        let alice_public = alice.public_value();
        let bob_public = bob.public_value();

        let alice_secret = alice.agree(&bob_public).unwrap();
        let bob_secret = bob.agree(&alice_public).unwrap();

        assert_eq!(alice_secret.as_bytes(), bob_secret.as_bytes());
    }

    #[test]
    fn distinct_sessions_produce_distinct_secrets() {
        let peer = EphemeralExchange::generate(&mut OsRng).public_value();

        let first = EphemeralExchange::generate(&mut OsRng).agree(&peer).unwrap();
        let second = EphemeralExchange::generate(&mut OsRng).agree(&peer).unwrap();

        assert_ne!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn zero_peer_value_is_rejected() {
        let ours = EphemeralExchange::generate(&mut OsRng);
        let result = ours.agree(&[0u8; EXCHANGE_VALUE_LEN]);
        assert!(matches!(result, Err(CryptoError::InvalidPeerKey)));
    }
}
