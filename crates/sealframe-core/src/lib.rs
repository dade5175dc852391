//! Sealframe Protocol Core
//!
//! Orchestration layer for secure frame streaming: the key exchange state
//! machine, the established session, and the producer/consumer controllers
//! that tie them to a transport.
//!
//! # Architecture
//!
//! ```text
//! FrameSource ──► producer controller ──► Session::encrypt_frame ──► FramedStream
//!                        │
//!                        └─ Handshake (sans-IO state machine)
//!                        ┌─ Handshake
//!                        │
//! FrameSink  ◄── consumer controller ◄── Session::decrypt_frame ◄── FramedStream
//! ```
//!
//! Each session runs on one task and exclusively owns its key material and
//! nonce counters, so no locking is needed anywhere in the core. Closing
//! the transport is the sole cancellation mechanism; framing deadlines keep
//! in-flight reads and writes from hanging.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod controller;
pub mod error;
pub mod handshake;
pub mod queue;
pub mod session;

pub use controller::{
    FrameSink, FrameSource, SessionStats, start_consumer_session, start_producer_session,
};
pub use error::SessionError;
pub use handshake::{Handshake, HandshakeAction, HandshakeState, Role};
pub use queue::{DEFAULT_QUEUE_DEPTH, FrameQueueReceiver, FrameQueueSender, frame_queue};
pub use session::{Session, SessionConfig};

// The suite and framing knobs surface through `SessionConfig`; re-export
// them so most callers depend on this crate alone.
pub use sealframe_crypto::CipherSuite;
pub use sealframe_proto::FramingConfig;
