//! Handshake record layouts.
//!
//! Three record kinds, exchanged in a fixed sequence by each peer:
//!
//! ```text
//! Hello             [magic 4][version 1][kind 1][suite 1][identity 32][salt 32]
//! ExchangeValue     [kind 1][value 32]
//! ExchangeSignature [kind 1][signature 64]
//! ```
//!
//! Every record is the payload of exactly one framed message and carries an
//! explicit kind byte, so an out-of-sequence record is reported as
//! [`ProtocolError::UnexpectedRecord`](crate::ProtocolError::UnexpectedRecord)
//! by the state machine instead of being misparsed as whatever was expected
//! next. All fields are fixed-size; parsing rejects any length deviation.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::ProtocolError;

/// Protocol magic, first bytes of every Hello: `"SEAL"`.
pub const MAGIC: [u8; 4] = *b"SEAL";

/// Current protocol version.
pub const VERSION: u8 = 0x01;

/// Ed25519 verifying key length.
pub const IDENTITY_KEY_LEN: usize = 32;

/// Per-session random salt contribution length.
pub const SALT_LEN: usize = 32;

/// x25519 public value length.
pub const EXCHANGE_VALUE_LEN: usize = 32;

/// Ed25519 signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Kind byte identifying a handshake record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    /// Version, suite, identity key, and salt contribution
    Hello = 0x01,
    /// Ephemeral x25519 public value
    ExchangeValue = 0x02,
    /// Signature binding the exchange value to the identity key
    ExchangeSignature = 0x03,
}

impl RecordKind {
    /// Parse a kind byte. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(kind: u8) -> Option<Self> {
        match kind {
            0x01 => Some(Self::Hello),
            0x02 => Some(Self::ExchangeValue),
            0x03 => Some(Self::ExchangeSignature),
            _ => None,
        }
    }

    /// Kind byte as written on the wire.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// First record from each peer: protocol identification plus the inputs the
/// key derivation needs before any secret is combined.
///
/// The `suite` byte is opaque at this layer; `sealframe-crypto` maps it to a
/// cipher suite and the session layer rejects mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    /// Cipher suite identifier (must match on both peers)
    pub suite: u8,
    /// Ed25519 verifying key, generated fresh for this session
    pub identity_key: [u8; IDENTITY_KEY_LEN],
    /// Random salt contribution mixed into key derivation
    pub salt: [u8; SALT_LEN],
}

/// Ephemeral x25519 public value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeValue {
    /// SEC-agnostic raw 32-byte Montgomery point
    pub value: [u8; EXCHANGE_VALUE_LEN],
}

/// Signature over the handshake transcript, produced with the sender's
/// per-session identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSignature {
    /// Ed25519 signature bytes
    pub signature: [u8; SIGNATURE_LEN],
}

/// Any handshake record, tagged by its kind byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeRecord {
    /// See [`Hello`]
    Hello(Hello),
    /// See [`ExchangeValue`]
    ExchangeValue(ExchangeValue),
    /// See [`ExchangeSignature`]
    ExchangeSignature(ExchangeSignature),
}

const HELLO_LEN: usize = 4 + 1 + 1 + 1 + IDENTITY_KEY_LEN + SALT_LEN;
const EXCHANGE_LEN: usize = 1 + EXCHANGE_VALUE_LEN;
const SIG_LEN: usize = 1 + SIGNATURE_LEN;

impl HandshakeRecord {
    /// Kind of this record.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Hello(_) => RecordKind::Hello,
            Self::ExchangeValue(_) => RecordKind::ExchangeValue,
            Self::ExchangeSignature(_) => RecordKind::ExchangeSignature,
        }
    }

    /// Serialize to wire bytes (the payload of one framed message).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Hello(hello) => {
                let mut buf = BytesMut::with_capacity(HELLO_LEN);
                buf.put_slice(&MAGIC);
                buf.put_u8(VERSION);
                buf.put_u8(RecordKind::Hello.to_u8());
                buf.put_u8(hello.suite);
                buf.put_slice(&hello.identity_key);
                buf.put_slice(&hello.salt);
                buf.freeze()
            },
            Self::ExchangeValue(exchange) => {
                let mut buf = BytesMut::with_capacity(EXCHANGE_LEN);
                buf.put_u8(RecordKind::ExchangeValue.to_u8());
                buf.put_slice(&exchange.value);
                buf.freeze()
            },
            Self::ExchangeSignature(sig) => {
                let mut buf = BytesMut::with_capacity(SIG_LEN);
                buf.put_u8(RecordKind::ExchangeSignature.to_u8());
                buf.put_slice(&sig.signature);
                buf.freeze()
            },
        }
    }

    /// Parse one record from the payload of a framed message.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::TruncatedRecord` if too short to carry a kind
    /// - `ProtocolError::BadMagic` / `ProtocolError::UnsupportedVersion` for
    ///   a Hello that fails protocol identification
    /// - `ProtocolError::UnknownRecordKind` for an undefined kind byte
    /// - `ProtocolError::LengthMismatch` if the body length deviates from
    ///   the fixed layout
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::TruncatedRecord { expected: 1, actual: 0 });
        }

        // Hello is the only record that leads with magic instead of a kind
        // byte, so probe for it first.
        if bytes.starts_with(&MAGIC) {
            return Self::decode_hello(bytes);
        }

        let kind = bytes[0];
        match RecordKind::from_u8(kind) {
            Some(RecordKind::Hello) => {
                // A kind byte of Hello without leading magic is a framing bug
                // on the peer's side, not a version skew.
                Err(ProtocolError::BadMagic)
            },
            Some(RecordKind::ExchangeValue) => {
                if bytes.len() != EXCHANGE_LEN {
                    return Err(ProtocolError::LengthMismatch {
                        kind: RecordKind::ExchangeValue,
                        expected: EXCHANGE_LEN,
                        actual: bytes.len(),
                    });
                }
                let mut value = [0u8; EXCHANGE_VALUE_LEN];
                value.copy_from_slice(&bytes[1..]);
                Ok(Self::ExchangeValue(ExchangeValue { value }))
            },
            Some(RecordKind::ExchangeSignature) => {
                if bytes.len() != SIG_LEN {
                    return Err(ProtocolError::LengthMismatch {
                        kind: RecordKind::ExchangeSignature,
                        expected: SIG_LEN,
                        actual: bytes.len(),
                    });
                }
                let mut signature = [0u8; SIGNATURE_LEN];
                signature.copy_from_slice(&bytes[1..]);
                Ok(Self::ExchangeSignature(ExchangeSignature { signature }))
            },
            None => Err(ProtocolError::UnknownRecordKind { kind }),
        }
    }

    fn decode_hello(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < 6 {
            return Err(ProtocolError::TruncatedRecord { expected: 6, actual: bytes.len() });
        }

        let version = bytes[4];
        if version != VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        if bytes[5] != RecordKind::Hello.to_u8() {
            return Err(ProtocolError::UnknownRecordKind { kind: bytes[5] });
        }

        if bytes.len() != HELLO_LEN {
            return Err(ProtocolError::LengthMismatch {
                kind: RecordKind::Hello,
                expected: HELLO_LEN,
                actual: bytes.len(),
            });
        }

        let suite = bytes[6];
        let mut identity_key = [0u8; IDENTITY_KEY_LEN];
        identity_key.copy_from_slice(&bytes[7..7 + IDENTITY_KEY_LEN]);
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[7 + IDENTITY_KEY_LEN..]);

        Ok(Self::Hello(Hello { suite, identity_key, salt }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hello() -> Hello {
        Hello { suite: 0x01, identity_key: [0x11; IDENTITY_KEY_LEN], salt: [0x22; SALT_LEN] }
    }

    #[test]
    fn hello_round_trip() {
        let record = HandshakeRecord::Hello(sample_hello());
        let wire = record.encode();
        let parsed = HandshakeRecord::decode(&wire).unwrap();
        assert_eq!(record, parsed);
    }

    #[test]
    fn exchange_value_round_trip() {
        let record = HandshakeRecord::ExchangeValue(ExchangeValue { value: [0x42; 32] });
        let wire = record.encode();
        assert_eq!(wire.len(), 33);
        assert_eq!(HandshakeRecord::decode(&wire).unwrap(), record);
    }

    #[test]
    fn signature_round_trip() {
        let record =
            HandshakeRecord::ExchangeSignature(ExchangeSignature { signature: [0x5A; 64] });
        let wire = record.encode();
        assert_eq!(wire.len(), 65);
        assert_eq!(HandshakeRecord::decode(&wire).unwrap(), record);
    }

    #[test]
    fn reject_empty_record() {
        let result = HandshakeRecord::decode(&[]);
        assert_eq!(result, Err(ProtocolError::TruncatedRecord { expected: 1, actual: 0 }));
    }

    #[test]
    fn reject_bad_magic() {
        let mut wire = HandshakeRecord::Hello(sample_hello()).encode().to_vec();
        wire[0] = b'X';
        // Without the magic the first byte is read as a kind; b'X' is not one.
        let result = HandshakeRecord::decode(&wire);
        assert_eq!(result, Err(ProtocolError::UnknownRecordKind { kind: b'X' }));
    }

    #[test]
    fn reject_unsupported_version() {
        let mut wire = HandshakeRecord::Hello(sample_hello()).encode().to_vec();
        wire[4] = 0x7F;
        let result = HandshakeRecord::decode(&wire);
        assert_eq!(result, Err(ProtocolError::UnsupportedVersion(0x7F)));
    }

    #[test]
    fn reject_truncated_hello() {
        let wire = HandshakeRecord::Hello(sample_hello()).encode();
        let result = HandshakeRecord::decode(&wire[..wire.len() - 1]);
        assert_eq!(
            result,
            Err(ProtocolError::LengthMismatch {
                kind: RecordKind::Hello,
                expected: 71,
                actual: 70,
            })
        );
    }

    #[test]
    fn reject_wrong_length_exchange_value() {
        let mut wire = HandshakeRecord::ExchangeValue(ExchangeValue { value: [0; 32] })
            .encode()
            .to_vec();
        wire.push(0);
        let result = HandshakeRecord::decode(&wire);
        assert!(matches!(
            result,
            Err(ProtocolError::LengthMismatch { kind: RecordKind::ExchangeValue, .. })
        ));
    }

    #[test]
    fn reject_unknown_kind() {
        let result = HandshakeRecord::decode(&[0x7E, 0, 0]);
        assert_eq!(result, Err(ProtocolError::UnknownRecordKind { kind: 0x7E }));
    }

    #[test]
    fn hello_kind_byte_without_magic_is_bad_magic() {
        let result = HandshakeRecord::decode(&[RecordKind::Hello.to_u8(), 0, 0]);
        assert_eq!(result, Err(ProtocolError::BadMagic));
    }
}
