//! Sealframe Wire Format
//!
//! Wire-level building blocks for the Sealframe protocol: length-prefixed
//! message framing over a byte stream, the fixed-layout handshake records,
//! and the data-plane frame records.
//!
//! The transport (TCP in production, `tokio::io::duplex` in tests) only
//! guarantees in-order byte delivery. Everything above it is built from one
//! primitive: a message is `[u32 length, Big Endian][payload]`, and a call to
//! [`FramedStream::receive_message`] either yields a complete payload or an
//! error. Records are raw binary with Big Endian integers, mirroring the
//! framing prefix; no self-describing encoding is needed because every record
//! has a fixed layout selected by a one-byte kind.
//!
//! # Security
//!
//! - Length fields are attacker-controlled input. The framing layer enforces
//!   a maximum message length before allocating, so a hostile peer cannot
//!   request an unbounded buffer.
//! - Record parsing validates structure only. Nothing here authenticates or
//!   decrypts; that happens in `sealframe-crypto` after parsing.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod framing;
pub mod handshake;
pub mod record;

pub use errors::{FramingError, ProtocolError};
pub use framing::{
    DEFAULT_MAX_MESSAGE_LEN, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT, FramedStream,
    FramingConfig,
};
pub use handshake::{
    EXCHANGE_VALUE_LEN, ExchangeSignature, ExchangeValue, HandshakeRecord, Hello,
    IDENTITY_KEY_LEN, RecordKind, SALT_LEN, SIGNATURE_LEN,
};
pub use record::{AeadRecord, CBC_BLOCK_LEN, CbcRecord, IV_LEN, NONCE_LEN, TAG_LEN};
