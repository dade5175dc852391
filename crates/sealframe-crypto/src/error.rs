//! Error types for cryptographic operations

use thiserror::Error;

use crate::cipher::CipherSuite;

/// Errors from key establishment and frame cipher operations.
///
/// Everything here fails closed: no variant is ever accompanied by partial
/// plaintext or a partially-derived key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Peer's exchange-value signature did not verify
    #[error("exchange signature invalid")]
    SignatureInvalid,

    /// AEAD authentication tag did not verify
    #[error("frame authentication failed")]
    AuthenticationFailed,

    /// CBC padding malformed after decryption (tampering signal)
    #[error("frame padding invalid")]
    PaddingInvalid,

    /// Frame counter was replayed or moved backwards
    #[error("replayed frame counter: expected at least {expected}, got {actual}")]
    ReplayDetected {
        /// Lowest counter value still acceptable
        expected: u64,
        /// Counter value carried by the rejected frame
        actual: u64,
    },

    /// Nonce counter reached its final value; the session key must not
    /// encrypt another frame
    #[error("nonce counter exhausted")]
    NonceExhausted,

    /// Peer supplied a structurally invalid public key or a degenerate
    /// exchange value
    #[error("invalid peer public key")]
    InvalidPeerKey,

    /// Frame was produced by a different cipher family than this session's
    #[error("frame cipher family does not match session suite")]
    ModeMismatch,
}

impl CryptoError {
    /// Returns true if the error condemns only the frame that produced it.
    ///
    /// Frame-local failures (a corrupted or replayed frame) let a streaming
    /// session skip the frame and continue. Everything else poisons the
    /// session key or the handshake and is fatal.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed | Self::PaddingInvalid | Self::ReplayDetected { .. }
        )
    }
}

/// Construction-time configuration errors.
///
/// These are raised before any frame is processed; a session is never
/// created from a bad configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Peers are configured with different cipher suites
    #[error("cipher suite mismatch: local {local}, peer {peer}")]
    SuiteMismatch {
        /// Suite this side was configured with
        local: CipherSuite,
        /// Suite the peer announced
        peer: CipherSuite,
    },

    /// Peer announced a suite byte this build does not know
    #[error("unknown cipher suite {wire:#04x}")]
    UnknownSuite {
        /// Suite byte from the peer's Hello
        wire: u8,
    },

    /// Raw key material has the wrong length for the suite
    #[error("invalid key length for {suite}: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Suite the key was meant for
        suite: CipherSuite,
        /// Key length the suite requires
        expected: usize,
        /// Key length actually supplied
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupted_frame_errors_are_frame_local() {
        assert!(CryptoError::AuthenticationFailed.is_frame_local());
        assert!(CryptoError::PaddingInvalid.is_frame_local());
        assert!(CryptoError::ReplayDetected { expected: 4, actual: 2 }.is_frame_local());
    }

    #[test]
    fn key_and_handshake_errors_are_fatal() {
        assert!(!CryptoError::SignatureInvalid.is_frame_local());
        assert!(!CryptoError::NonceExhausted.is_frame_local());
        assert!(!CryptoError::InvalidPeerKey.is_frame_local());
        assert!(!CryptoError::ModeMismatch.is_frame_local());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::ReplayDetected { expected: 7, actual: 3 };
        assert_eq!(err.to_string(), "replayed frame counter: expected at least 7, got 3");

        let err = ConfigError::UnknownSuite { wire: 0x9C };
        assert_eq!(err.to_string(), "unknown cipher suite 0x9c");
    }
}
