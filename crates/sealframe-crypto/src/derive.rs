//! Session key derivation using HKDF
//!
//! The raw x25519 agreement output is not uniformly random, so it is never
//! used as a cipher key directly. HKDF-SHA256 extracts with both peers'
//! salt contributions and expands with a label that binds the key to this
//! protocol version and the negotiated suite.
//!
//! # Security
//!
//! - Salt order is fixed: initiator's contribution first. Both peers must
//!   agree on this or they derive different keys - the failure then surfaces
//!   as an authentication error on the first frame, never as garbage
//!   plaintext.
//! - Different suites derive different keys from the same secret (suite byte
//!   in the `info` parameter), so a transcript cannot be replayed across
//!   suite configurations.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{
    cipher::{CipherSuite, KEY_LEN},
    exchange::SharedSecret,
};

/// Label used for session key derivation
const SESSION_KEY_LABEL: &[u8] = b"sealframe.v1.session-key";

/// A derived symmetric session key.
///
/// Held in memory only for the lifetime of its session and zeroed on drop.
pub struct SessionKey {
    key: [u8; KEY_LEN],
}

impl SessionKey {
    /// Raw key bytes for cipher construction.
    #[must_use]
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Wrap externally-supplied key material (pre-shared keys, fixtures).
    #[must_use]
    pub fn from_bytes(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the symmetric session key both peers will use.
///
/// `HKDF-SHA256(salt = initiator_salt || responder_salt, ikm = shared,
/// info = label || suite)`, expanded to the suite's key length.
#[must_use]
pub fn derive_session_key(
    shared: &SharedSecret,
    initiator_salt: &[u8; 32],
    responder_salt: &[u8; 32],
    suite: CipherSuite,
) -> SessionKey {
    // Fixed concatenation order: initiator first, on both peers.
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(initiator_salt);
    salt[32..].copy_from_slice(responder_salt);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared.as_bytes());

    // Build the info parameter: label || suite byte
    let mut info = Vec::with_capacity(SESSION_KEY_LABEL.len() + 1);
    info.extend_from_slice(SESSION_KEY_LABEL);
    info.push(suite.to_wire());

    let mut key = [0u8; KEY_LEN];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    salt.zeroize();

    SessionKey { key }
}
