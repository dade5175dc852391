//! Per-frame encryption and decryption.
//!
//! The cipher family is a closed tagged choice fixed at session setup -
//! AEAD (ChaCha20-Poly1305 or AES-256-GCM) or legacy CBC with PKCS7 - never
//! a runtime type probe. A [`FrameCipher`] owns the session key plus both
//! direction counters and is the only object that touches frame plaintext.
//!
//! # Nonce discipline
//!
//! AEAD nonces are `[4 zero bytes][u64 counter, Big Endian]`, strictly
//! monotonic per session key. The final counter value is reserved so the
//! counter can never wrap: sealing fails with
//! [`CryptoError::NonceExhausted`] first. The opening side verifies the tag
//! and then enforces counter monotonicity, so a replayed or reordered
//! authentic frame is rejected as [`CryptoError::ReplayDetected`] while a
//! gap (frames lost to corruption upstream) is tolerated.
//!
//! CBC frames carry a fresh random IV each; the caller supplies the RNG.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    ChaCha20Poly1305,
    aead::{AeadInPlace, KeyInit, Tag},
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::{
    derive::SessionKey,
    error::{ConfigError, CryptoError},
};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Symmetric key length; identical for all supported suites.
pub const KEY_LEN: usize = 32;

/// AEAD nonce length (96 bits).
pub const NONCE_LEN: usize = 12;

/// AEAD authentication tag length.
pub const TAG_LEN: usize = 16;

/// CBC initialization vector length.
pub const IV_LEN: usize = 16;

/// Cipher suites a session can negotiate.
///
/// One wire byte each; both peers must announce the same byte in their
/// Hello records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    /// ChaCha20-Poly1305 AEAD (preferred)
    ChaCha20Poly1305,
    /// AES-256-GCM AEAD
    Aes256Gcm,
    /// AES-256-CBC with PKCS7 padding (legacy; confidentiality only)
    Aes256CbcPkcs7,
}

impl CipherSuite {
    /// Parse a suite byte from a Hello record. `None` if unrecognized.
    #[must_use]
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::ChaCha20Poly1305),
            0x02 => Some(Self::Aes256Gcm),
            0x03 => Some(Self::Aes256CbcPkcs7),
            _ => None,
        }
    }

    /// Suite byte as announced on the wire.
    #[must_use]
    pub fn to_wire(self) -> u8 {
        match self {
            Self::ChaCha20Poly1305 => 0x01,
            Self::Aes256Gcm => 0x02,
            Self::Aes256CbcPkcs7 => 0x03,
        }
    }

    /// Key length the suite requires.
    #[must_use]
    pub fn key_len(self) -> usize {
        KEY_LEN
    }

    /// Whether the suite authenticates frames (AEAD family).
    #[must_use]
    pub fn is_aead(self) -> bool {
        !matches!(self, Self::Aes256CbcPkcs7)
    }
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ChaCha20Poly1305 => "chacha20poly1305",
            Self::Aes256Gcm => "aes-256-gcm",
            Self::Aes256CbcPkcs7 => "aes-256-cbc-pkcs7",
        };
        f.write_str(name)
    }
}

/// One encrypted frame, ready for wire serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealedFrame {
    /// AEAD family output: detached tag, counter nonce
    Aead {
        /// Counter-derived nonce
        nonce: [u8; NONCE_LEN],
        /// Detached authentication tag
        tag: [u8; TAG_LEN],
        /// Ciphertext, same length as the plaintext
        ciphertext: Vec<u8>,
    },
    /// Legacy CBC output: fresh random IV, padded ciphertext
    Cbc {
        /// Per-frame initialization vector
        iv: [u8; IV_LEN],
        /// PKCS7-padded ciphertext
        ciphertext: Vec<u8>,
    },
}

/// Session frame cipher: key material plus nonce state for both directions.
///
/// Owned exclusively by one session; the key copy is zeroed on drop.
pub struct FrameCipher {
    suite: CipherSuite,
    key: Zeroizing<[u8; KEY_LEN]>,
    /// Next counter to seal with; `u64::MAX` is reserved as exhausted.
    send_counter: u64,
    /// Lowest counter still acceptable when opening.
    recv_counter: u64,
}

impl FrameCipher {
    /// Build a cipher from a derived session key.
    #[must_use]
    pub fn new(suite: CipherSuite, key: &SessionKey) -> Self {
        Self { suite, key: Zeroizing::new(*key.key()), send_counter: 0, recv_counter: 0 }
    }

    /// Build a cipher from raw key bytes, validating the length.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidKeyLength` if `key` is not the suite's length
    pub fn from_key_bytes(suite: CipherSuite, key: &[u8]) -> Result<Self, ConfigError> {
        if key.len() != suite.key_len() {
            return Err(ConfigError::InvalidKeyLength {
                suite,
                expected: suite.key_len(),
                actual: key.len(),
            });
        }

        let mut owned = Zeroizing::new([0u8; KEY_LEN]);
        owned.copy_from_slice(key);
        Ok(Self { suite, key: owned, send_counter: 0, recv_counter: 0 })
    }

    /// Suite this cipher was constructed for.
    #[must_use]
    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Number of frames sealed so far.
    #[must_use]
    pub fn frames_sealed(&self) -> u64 {
        self.send_counter
    }

    /// Encrypt one frame.
    ///
    /// The RNG is only drawn from in CBC mode (per-frame IV); AEAD nonces
    /// come from the counter.
    ///
    /// # Errors
    ///
    /// - `CryptoError::NonceExhausted` if the counter reached its reserved
    ///   final value; the session key must be retired before reuse
    pub fn seal<R: RngCore + CryptoRng>(
        &mut self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<SealedFrame, CryptoError> {
        match self.suite {
            CipherSuite::ChaCha20Poly1305 | CipherSuite::Aes256Gcm => {
                if self.send_counter == u64::MAX {
                    return Err(CryptoError::NonceExhausted);
                }
                let nonce = nonce_from_counter(self.send_counter);
                self.send_counter += 1;

                let mut buffer = plaintext.to_vec();
                let tag = self.aead_seal_in_place(&nonce, &mut buffer);

                Ok(SealedFrame::Aead { nonce, tag, ciphertext: buffer })
            },
            CipherSuite::Aes256CbcPkcs7 => {
                let mut iv = [0u8; IV_LEN];
                rng.fill_bytes(&mut iv);

                let Ok(enc) = Aes256CbcEnc::new_from_slices(self.key.as_slice(), &iv) else {
                    unreachable!("key and IV lengths are fixed at construction");
                };
                let ciphertext = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

                Ok(SealedFrame::Cbc { iv, ciphertext })
            },
        }
    }

    /// Decrypt one frame.
    ///
    /// Deterministic for the same inputs; the only state mutated is the
    /// expected-counter watermark, and only after a frame authenticates.
    ///
    /// # Errors
    ///
    /// - `CryptoError::ModeMismatch` if the frame belongs to the other
    ///   cipher family
    /// - `CryptoError::AuthenticationFailed` if the tag does not verify
    /// - `CryptoError::ReplayDetected` if an authentic frame's counter is
    ///   below the watermark (or outside the counter schedule entirely)
    /// - `CryptoError::PaddingInvalid` if CBC padding is malformed
    pub fn open(&mut self, frame: &SealedFrame) -> Result<Vec<u8>, CryptoError> {
        match (self.suite, frame) {
            (
                CipherSuite::ChaCha20Poly1305 | CipherSuite::Aes256Gcm,
                SealedFrame::Aead { nonce, tag, ciphertext },
            ) => {
                let mut buffer = ciphertext.clone();
                self.aead_open_in_place(nonce, tag, &mut buffer)?;

                // Tag verified: the counter is authentic producer state, so a
                // mismatch now is a genuine replay or reorder, not corruption.
                let counter =
                    counter_from_nonce(nonce).ok_or(CryptoError::ReplayDetected {
                        expected: self.recv_counter,
                        actual: u64::MAX,
                    })?;

                if counter < self.recv_counter {
                    return Err(CryptoError::ReplayDetected {
                        expected: self.recv_counter,
                        actual: counter,
                    });
                }

                self.recv_counter = counter.saturating_add(1);
                Ok(buffer)
            },
            (CipherSuite::Aes256CbcPkcs7, SealedFrame::Cbc { iv, ciphertext }) => {
                let Ok(dec) = Aes256CbcDec::new_from_slices(self.key.as_slice(), iv) else {
                    unreachable!("key and IV lengths are fixed at construction");
                };

                dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| CryptoError::PaddingInvalid)
            },
            _ => Err(CryptoError::ModeMismatch),
        }
    }

    fn aead_seal_in_place(&self, nonce: &[u8; NONCE_LEN], buffer: &mut Vec<u8>) -> [u8; TAG_LEN] {
        let result = match self.suite {
            CipherSuite::ChaCha20Poly1305 => ChaCha20Poly1305::new((&*self.key).into())
                .encrypt_in_place_detached(nonce.into(), b"", buffer),
            CipherSuite::Aes256Gcm => Aes256Gcm::new((&*self.key).into())
                .encrypt_in_place_detached(nonce.into(), b"", buffer),
            CipherSuite::Aes256CbcPkcs7 => {
                unreachable!("aead_seal_in_place is only called for AEAD suites")
            },
        };

        let Ok(tag) = result else {
            unreachable!("AEAD encryption cannot fail with valid key and nonce lengths");
        };
        tag.into()
    }

    fn aead_open_in_place(
        &self,
        nonce: &[u8; NONCE_LEN],
        tag: &[u8; TAG_LEN],
        buffer: &mut Vec<u8>,
    ) -> Result<(), CryptoError> {
        let result = match self.suite {
            CipherSuite::ChaCha20Poly1305 => ChaCha20Poly1305::new((&*self.key).into())
                .decrypt_in_place_detached(nonce.into(), b"", buffer, Tag::<ChaCha20Poly1305>::from_slice(tag)),
            CipherSuite::Aes256Gcm => Aes256Gcm::new((&*self.key).into())
                .decrypt_in_place_detached(nonce.into(), b"", buffer, Tag::<Aes256Gcm>::from_slice(tag)),
            CipherSuite::Aes256CbcPkcs7 => {
                unreachable!("aead_open_in_place is only called for AEAD suites")
            },
        };

        result.map_err(|_| CryptoError::AuthenticationFailed)
    }
}

impl std::fmt::Debug for FrameCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCipher")
            .field("suite", &self.suite)
            .field("send_counter", &self.send_counter)
            .field("recv_counter", &self.recv_counter)
            .finish_non_exhaustive()
    }
}

/// Build a 96-bit nonce from the frame counter.
///
/// Structure:
/// - bytes 0-3: zero (reserved)
/// - bytes 4-11: counter (big-endian)
fn nonce_from_counter(counter: u64) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[4..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// Recover the counter from a nonce. `None` if the nonce is outside the
/// counter schedule (non-zero reserved prefix or the reserved final value).
fn counter_from_nonce(nonce: &[u8; NONCE_LEN]) -> Option<u64> {
    if nonce[..4] != [0u8; 4] {
        return None;
    }

    let mut counter_bytes = [0u8; 8];
    counter_bytes.copy_from_slice(&nonce[4..]);
    let counter = u64::from_be_bytes(counter_bytes);

    if counter == u64::MAX { None } else { Some(counter) }
}
