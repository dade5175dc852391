//! Established session: per-frame encrypt/decrypt over wire payloads.
//!
//! A [`Session`] is what the handshake hands back once the key is derived:
//! the frame cipher plus the RNG used for CBC IVs, owned by exactly one
//! task. There is no global key, nonce, or cipher state anywhere - the
//! session object is the only holder, and its key material is zeroed when
//! it drops.

use bytes::Bytes;
use rand::{CryptoRng, RngCore, rngs::OsRng};

use sealframe_crypto::{CipherSuite, FrameCipher, SealedFrame};
use sealframe_proto::{AeadRecord, CbcRecord, FramingConfig};

use crate::{error::SessionError, handshake::Role};

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cipher suite both peers must be configured with
    pub suite: CipherSuite,
    /// This peer's role (fixes salt ordering during derivation)
    pub role: Role,
    /// Transport framing limits and deadlines
    pub framing: FramingConfig,
}

impl SessionConfig {
    /// Configuration for the dialing peer.
    #[must_use]
    pub fn initiator(suite: CipherSuite) -> Self {
        Self { suite, role: Role::Initiator, framing: FramingConfig::default() }
    }

    /// Configuration for the accepting peer.
    #[must_use]
    pub fn responder(suite: CipherSuite) -> Self {
        Self { suite, role: Role::Responder, framing: FramingConfig::default() }
    }
}

/// An established session, ready to seal and open frames.
///
/// Generic over the RNG so tests can drive CBC IVs deterministically;
/// production uses the OS RNG.
pub struct Session<R = OsRng> {
    cipher: FrameCipher,
    rng: R,
}

impl Session<OsRng> {
    /// Wrap a handshake-derived cipher with the OS RNG.
    #[must_use]
    pub fn new(cipher: FrameCipher) -> Self {
        Self { cipher, rng: OsRng }
    }
}

impl<R: RngCore + CryptoRng> Session<R> {
    /// Wrap a cipher with an explicit RNG.
    #[must_use]
    pub fn with_rng(cipher: FrameCipher, rng: R) -> Self {
        Self { cipher, rng }
    }

    /// Suite this session is running.
    #[must_use]
    pub fn suite(&self) -> CipherSuite {
        self.cipher.suite()
    }

    /// Number of frames sealed so far.
    #[must_use]
    pub fn frames_sealed(&self) -> u64 {
        self.cipher.frames_sealed()
    }

    /// Encrypt one frame into the payload of one framed message.
    ///
    /// # Errors
    ///
    /// - `SessionError::Crypto` on nonce exhaustion
    pub fn encrypt_frame(&mut self, frame: &[u8]) -> Result<Bytes, SessionError> {
        let sealed = self.cipher.seal(frame, &mut self.rng)?;

        let payload = match sealed {
            SealedFrame::Aead { nonce, tag, ciphertext } => {
                AeadRecord { nonce, tag, ciphertext: Bytes::from(ciphertext) }.encode()
            },
            SealedFrame::Cbc { iv, ciphertext } => {
                CbcRecord { iv, ciphertext: Bytes::from(ciphertext) }.encode()
            },
        };

        Ok(payload)
    }

    /// Decrypt the payload of one framed message back into a frame.
    ///
    /// Fails closed: no bytes are returned unless the record parsed and
    /// (for AEAD) authenticated.
    ///
    /// # Errors
    ///
    /// - `SessionError::Protocol` if the record is structurally invalid
    /// - `SessionError::Crypto` on authentication, padding, or replay
    ///   failure
    pub fn decrypt_frame(&mut self, payload: &[u8]) -> Result<Bytes, SessionError> {
        let sealed = if self.cipher.suite().is_aead() {
            let record = AeadRecord::decode(payload)?;
            SealedFrame::Aead {
                nonce: record.nonce,
                tag: record.tag,
                ciphertext: record.ciphertext.to_vec(),
            }
        } else {
            let record = CbcRecord::decode(payload)?;
            SealedFrame::Cbc { iv: record.iv, ciphertext: record.ciphertext.to_vec() }
        };

        let frame = self.cipher.open(&sealed)?;
        Ok(Bytes::from(frame))
    }
}

impl<R> std::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("cipher", &self.cipher).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use sealframe_crypto::{CryptoError, SessionKey};
    use sealframe_proto::{NONCE_LEN, ProtocolError, TAG_LEN};

    use super::*;

    fn session_pair(suite: CipherSuite) -> (Session, Session) {
        let key = [0x42u8; 32];
        let producer = FrameCipher::new(suite, &SessionKey::from_bytes(key));
        let consumer = FrameCipher::new(suite, &SessionKey::from_bytes(key));
        (Session::new(producer), Session::new(consumer))
    }

    #[test]
    fn wire_round_trip_all_suites() {
        for suite in [
            CipherSuite::ChaCha20Poly1305,
            CipherSuite::Aes256Gcm,
            CipherSuite::Aes256CbcPkcs7,
        ] {
            let (mut producer, mut consumer) = session_pair(suite);

            let payload = producer.encrypt_frame(b"frame over the wire").unwrap();
            let frame = consumer.decrypt_frame(&payload).unwrap();

            assert_eq!(&frame[..], b"frame over the wire", "round-trip failed for {suite}");
        }
    }

    #[test]
    fn aead_wire_layout_is_nonce_tag_ciphertext() {
        let (mut producer, _) = session_pair(CipherSuite::Aes256Gcm);

        let payload = producer.encrypt_frame(&[0u8; 10]).unwrap();
        assert_eq!(payload.len(), NONCE_LEN + TAG_LEN + 10);
    }

    #[test]
    fn empty_frame_round_trips_on_the_wire() {
        for suite in [CipherSuite::ChaCha20Poly1305, CipherSuite::Aes256CbcPkcs7] {
            let (mut producer, mut consumer) = session_pair(suite);

            let payload = producer.encrypt_frame(b"").unwrap();
            let frame = consumer.decrypt_frame(&payload).unwrap();

            assert!(frame.is_empty());
        }
    }

    #[test]
    fn truncated_payload_is_a_protocol_error() {
        let (_, mut consumer) = session_pair(CipherSuite::ChaCha20Poly1305);

        let result = consumer.decrypt_frame(&[0u8; 5]);
        assert!(matches!(
            result,
            Err(SessionError::Protocol(ProtocolError::TruncatedRecord { .. }))
        ));
    }

    #[test]
    fn corrupted_payload_is_a_crypto_error() {
        let (mut producer, mut consumer) = session_pair(CipherSuite::Aes256Gcm);

        let mut payload = producer.encrypt_frame(b"soon to be corrupted").unwrap().to_vec();
        let last = payload.len() - 1;
        payload[last] ^= 0x01;

        let result = consumer.decrypt_frame(&payload);
        assert!(matches!(
            result,
            Err(SessionError::Crypto(CryptoError::AuthenticationFailed))
        ));
    }
}
