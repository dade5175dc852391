//! Data-plane frame record layouts.
//!
//! After the handshake, every framed message carries exactly one encrypted
//! frame. The layout depends on the cipher family negotiated for the
//! session, so no kind byte is needed:
//!
//! ```text
//! AEAD [nonce 12][tag 16][ciphertext 0..]
//! CBC  [iv 16][ciphertext 16..]   (PKCS7-padded, block-aligned)
//! ```
//!
//! Parsing validates structure only; authenticity is decided by the cipher
//! in `sealframe-crypto`, which refuses to release plaintext on tag or
//! padding failure.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::ProtocolError;

/// AEAD nonce length (96 bits).
pub const NONCE_LEN: usize = 12;

/// AEAD authentication tag length (Poly1305 and GCM both use 128 bits).
pub const TAG_LEN: usize = 16;

/// CBC initialization vector length (one AES block).
pub const IV_LEN: usize = 16;

/// AES block length; CBC ciphertexts are a positive multiple of this.
pub const CBC_BLOCK_LEN: usize = 16;

/// One encrypted frame under an AEAD suite.
///
/// The tag travels detached, ahead of the ciphertext, so a zero-length
/// frame still produces a well-formed 28-byte record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeadRecord {
    /// Per-frame nonce (counter-derived, unique per session key)
    pub nonce: [u8; NONCE_LEN],
    /// Detached authentication tag
    pub tag: [u8; TAG_LEN],
    /// Ciphertext, same length as the plaintext frame
    pub ciphertext: Bytes,
}

impl AeadRecord {
    /// Serialize to the payload of one framed message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(NONCE_LEN + TAG_LEN + self.ciphertext.len());
        buf.put_slice(&self.nonce);
        buf.put_slice(&self.tag);
        buf.put_slice(&self.ciphertext);
        buf.freeze()
    }

    /// Parse one record.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::TruncatedRecord` if shorter than nonce + tag
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(ProtocolError::TruncatedRecord {
                expected: NONCE_LEN + TAG_LEN,
                actual: bytes.len(),
            });
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[..NONCE_LEN]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[NONCE_LEN..NONCE_LEN + TAG_LEN]);
        let ciphertext = Bytes::copy_from_slice(&bytes[NONCE_LEN + TAG_LEN..]);

        Ok(Self { nonce, tag, ciphertext })
    }
}

/// One encrypted frame under the legacy CBC suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CbcRecord {
    /// Fresh random IV for this frame
    pub iv: [u8; IV_LEN],
    /// PKCS7-padded ciphertext; always at least one block
    pub ciphertext: Bytes,
}

impl CbcRecord {
    /// Serialize to the payload of one framed message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(IV_LEN + self.ciphertext.len());
        buf.put_slice(&self.iv);
        buf.put_slice(&self.ciphertext);
        buf.freeze()
    }

    /// Parse one record.
    ///
    /// PKCS7 always emits at least one block, so an empty or non-aligned
    /// ciphertext is structurally invalid before any key is touched.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::TruncatedRecord` if shorter than IV + one block
    /// - `ProtocolError::BadBlockLength` if the ciphertext is not
    ///   block-aligned
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < IV_LEN + CBC_BLOCK_LEN {
            return Err(ProtocolError::TruncatedRecord {
                expected: IV_LEN + CBC_BLOCK_LEN,
                actual: bytes.len(),
            });
        }

        let ciphertext_len = bytes.len() - IV_LEN;
        if ciphertext_len % CBC_BLOCK_LEN != 0 {
            return Err(ProtocolError::BadBlockLength { len: ciphertext_len });
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);
        let ciphertext = Bytes::copy_from_slice(&bytes[IV_LEN..]);

        Ok(Self { iv, ciphertext })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aead_round_trip() {
        let record = AeadRecord {
            nonce: [1; NONCE_LEN],
            tag: [2; TAG_LEN],
            ciphertext: Bytes::from_static(b"ciphertext bytes"),
        };
        let wire = record.encode();
        assert_eq!(wire.len(), NONCE_LEN + TAG_LEN + 16);
        assert_eq!(AeadRecord::decode(&wire).unwrap(), record);
    }

    #[test]
    fn aead_empty_ciphertext_round_trips() {
        let record =
            AeadRecord { nonce: [0; NONCE_LEN], tag: [0; TAG_LEN], ciphertext: Bytes::new() };
        let wire = record.encode();
        assert_eq!(wire.len(), 28);
        assert_eq!(AeadRecord::decode(&wire).unwrap(), record);
    }

    #[test]
    fn aead_reject_truncated() {
        let result = AeadRecord::decode(&[0u8; 27]);
        assert_eq!(result, Err(ProtocolError::TruncatedRecord { expected: 28, actual: 27 }));
    }

    #[test]
    fn cbc_round_trip() {
        let record = CbcRecord {
            iv: [7; IV_LEN],
            ciphertext: Bytes::from(vec![9u8; 2 * CBC_BLOCK_LEN]),
        };
        let wire = record.encode();
        assert_eq!(CbcRecord::decode(&wire).unwrap(), record);
    }

    #[test]
    fn cbc_reject_missing_block() {
        let result = CbcRecord::decode(&[0u8; IV_LEN]);
        assert_eq!(
            result,
            Err(ProtocolError::TruncatedRecord { expected: IV_LEN + CBC_BLOCK_LEN, actual: IV_LEN })
        );
    }

    #[test]
    fn cbc_reject_unaligned_ciphertext() {
        let result = CbcRecord::decode(&[0u8; IV_LEN + CBC_BLOCK_LEN + 5]);
        assert_eq!(result, Err(ProtocolError::BadBlockLength { len: CBC_BLOCK_LEN + 5 }));
    }
}
