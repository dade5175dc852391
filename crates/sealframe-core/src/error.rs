//! Error types for the Sealframe session layer.
//!
//! Component errors (framing, protocol, crypto, config) bubble up unchanged
//! inside [`SessionError`]; nothing is swallowed or replaced with a default
//! value. The session controller performs cleanup (transport close, key
//! zeroing) and returns exactly one terminal error to its caller.

use std::io;

use thiserror::Error;

use sealframe_crypto::{ConfigError, CryptoError};
use sealframe_proto::{FramingError, ProtocolError};

use crate::handshake::HandshakeState;

/// Terminal error of a session or handshake.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport-level failure (always fatal to the session)
    #[error("transport framing: {0}")]
    Framing(#[from] FramingError),

    /// Malformed or out-of-sequence wire record (aborts the handshake)
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// Cryptographic failure (fails closed; see
    /// [`CryptoError::is_frame_local`] for the skip-vs-teardown split)
    #[error("cryptographic failure: {0}")]
    Crypto(#[from] CryptoError),

    /// Construction-time configuration mismatch
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// Handshake driven from a state that does not allow the operation
    #[error("invalid handshake operation: cannot {operation} in {state:?}")]
    InvalidState {
        /// State the handshake was in
        state: HandshakeState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// External frame source failed
    #[error("frame source: {0}")]
    Source(#[source] io::Error),

    /// External frame sink failed
    #[error("frame sink: {0}")]
    Sink(#[source] io::Error),
}

impl SessionError {
    /// Returns true if this error condemns only a single frame.
    ///
    /// The consumer loop skips such frames (with a log line) and keeps the
    /// session alive; every other error tears the session down.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::Crypto(err) if err.is_frame_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupted_frame_is_skippable() {
        let err = SessionError::from(CryptoError::AuthenticationFailed);
        assert!(err.is_frame_local());
    }

    #[test]
    fn transport_and_handshake_errors_are_fatal() {
        assert!(!SessionError::from(FramingError::ConnectionClosed).is_frame_local());
        assert!(!SessionError::from(CryptoError::SignatureInvalid).is_frame_local());
        assert!(
            !SessionError::InvalidState { state: HandshakeState::Init, operation: "handle_record" }
                .is_frame_local()
        );
    }
}
