//! Sealframe Cryptographic Primitives
//!
//! Cryptographic building blocks for Sealframe sessions. No I/O and no
//! global state: every key lives in an explicit value owned by its session,
//! and callers supply the RNG wherever randomness is drawn, which keeps the
//! whole crate deterministic under test.
//!
//! # Key Lifecycle
//!
//! ```text
//! Ed25519 identity (per session)          x25519 ephemeral (per session)
//!        │ signs                                  │
//!        ▼                                        ▼
//! exchange transcript ──────────────► raw shared secret
//!                                                 │
//!                                                 ▼
//!                    HKDF-SHA256(initiator_salt || responder_salt)
//!                                                 │
//!                                                 ▼
//!                                           Session Key
//!                                                 │
//!                                                 ▼
//!                              FrameCipher → per-frame seal/open
//! ```
//!
//! The ephemeral secret is consumed by the agreement (the type system makes
//! reuse impossible), and every secret buffer - shared secret, session key,
//! cipher key copy - is zeroed when dropped.
//!
//! # Security
//!
//! - Raw shared-secret bytes are never used as a cipher key; HKDF-SHA256
//!   whitens them and binds the derivation to both peers' salts and the
//!   negotiated suite.
//! - Salt concatenation order is fixed (initiator first) so both peers
//!   derive byte-identical keys; a disagreement here fails loudly at the
//!   first authenticated frame instead of decrypting garbage.
//! - AEAD nonces come from a strictly monotonic counter that refuses to
//!   wrap; the receiving side rejects replayed or reordered counters.
//! - Decryption fails closed: no plaintext is released on tag or padding
//!   failure.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod derive;
pub mod error;
pub mod exchange;
pub mod identity;

pub use cipher::{CipherSuite, FrameCipher, KEY_LEN, SealedFrame};
pub use derive::{SessionKey, derive_session_key};
pub use error::{ConfigError, CryptoError};
pub use exchange::{EphemeralExchange, SharedSecret};
pub use identity::{SessionIdentity, exchange_transcript, verify_exchange_signature};
