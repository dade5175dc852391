//! Session controller: handshake, then the streaming loop.
//!
//! One call, one session, one task. [`start_producer_session`] runs the key
//! exchange and then pulls frames from an external [`FrameSource`],
//! encrypting and sending until the source runs dry.
//! [`start_consumer_session`] is the mirror image: receive, decrypt, deliver
//! to an external [`FrameSink`].
//!
//! Error policy (the skip-vs-teardown split): after the handshake, a
//! frame-local cryptographic failure - corrupted tag, bad padding, replayed
//! counter - drops that frame with a warning and keeps the session alive.
//! Everything else tears the session down: the transport is closed, key
//! material is zeroed (the session object drops on every exit path), and the
//! single terminal error is returned to the caller. The controller never
//! reconnects; retry policy belongs to the caller.

use std::{io, time::Instant};

use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::OsRng;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

use sealframe_crypto::FrameCipher;
use sealframe_proto::{FramedStream, FramingError, HandshakeRecord};

use crate::{
    error::SessionError,
    handshake::{Handshake, HandshakeAction},
    queue::FrameQueueReceiver,
    session::{Session, SessionConfig},
};

/// Supplier of raw frame bytes (camera capture, file reader, test fixture).
///
/// Lives outside the protocol core; capture hardware and encoders are the
/// caller's concern.
#[async_trait]
pub trait FrameSource: Send {
    /// Produce the next frame, or `None` when the stream is finished.
    async fn next_frame(&mut self) -> io::Result<Option<Bytes>>;
}

/// Consumer of decrypted frame bytes (display window, file writer, test
/// fixture).
///
/// Only ever invoked with successfully authenticated plaintext.
#[async_trait]
pub trait FrameSink: Send {
    /// Deliver one decrypted frame.
    async fn deliver(&mut self, frame: Bytes) -> io::Result<()>;
}

/// A frame queue drains straight into the producer loop.
#[async_trait]
impl FrameSource for FrameQueueReceiver {
    async fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
        Ok(self.recv().await)
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames encrypted and sent
    pub frames_sent: u64,
    /// Frames decrypted and delivered to the sink
    pub frames_received: u64,
    /// Frames dropped due to frame-local cryptographic failures
    pub frames_skipped: u64,
}

/// Run a producer session: handshake, then encrypt-and-send until the
/// source is exhausted.
///
/// The transport is closed on every exit path; key material lives only
/// inside this call and is zeroed when it returns.
///
/// # Errors
///
/// The first fatal [`SessionError`]; see the module docs for the policy.
pub async fn start_producer_session<T, S>(
    transport: T,
    source: S,
    config: SessionConfig,
) -> Result<SessionStats, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    S: FrameSource,
{
    let mut framed = FramedStream::with_config(transport, config.framing.clone());
    let result = run_producer(&mut framed, source, &config).await;
    let _ = framed.shutdown().await;
    result
}

/// Run a consumer session: handshake, then receive-decrypt-deliver until
/// the peer closes the connection.
///
/// # Errors
///
/// The first fatal [`SessionError`]; frame-local failures are skipped, not
/// returned.
pub async fn start_consumer_session<T, K>(
    transport: T,
    sink: K,
    config: SessionConfig,
) -> Result<SessionStats, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    K: FrameSink,
{
    let mut framed = FramedStream::with_config(transport, config.framing.clone());
    let result = run_consumer(&mut framed, sink, &config).await;
    let _ = framed.shutdown().await;
    result
}

async fn run_producer<T, S>(
    framed: &mut FramedStream<T>,
    mut source: S,
    config: &SessionConfig,
) -> Result<SessionStats, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    S: FrameSource,
{
    let cipher = run_handshake(framed, config).await?;
    let mut session = Session::new(cipher);
    let mut stats = SessionStats::default();

    while let Some(frame) = source.next_frame().await.map_err(SessionError::Source)? {
        let payload = session.encrypt_frame(&frame)?;
        framed.send_message(&payload).await?;
        stats.frames_sent += 1;
        trace!(len = frame.len(), counter = session.frames_sealed(), "frame sent");
    }

    info!(frames_sent = stats.frames_sent, "producer session complete");
    Ok(stats)
}

async fn run_consumer<T, K>(
    framed: &mut FramedStream<T>,
    mut sink: K,
    config: &SessionConfig,
) -> Result<SessionStats, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    K: FrameSink,
{
    let cipher = run_handshake(framed, config).await?;
    let mut session = Session::new(cipher);
    let mut stats = SessionStats::default();

    loop {
        let payload = match framed.receive_message().await {
            Ok(payload) => payload,
            // The peer closing the stream is the normal end of a session.
            Err(FramingError::ConnectionClosed) => break,
            Err(err) => return Err(err.into()),
        };

        match session.decrypt_frame(&payload) {
            Ok(frame) => {
                sink.deliver(frame).await.map_err(SessionError::Sink)?;
                stats.frames_received += 1;
            },
            Err(err) if err.is_frame_local() => {
                stats.frames_skipped += 1;
                warn!(error = %err, "dropped undecryptable frame");
            },
            Err(err) => return Err(err),
        }
    }

    info!(
        frames_received = stats.frames_received,
        frames_skipped = stats.frames_skipped,
        "consumer session complete"
    );
    Ok(stats)
}

/// Drive the handshake state machine over the framed transport.
async fn run_handshake<T>(
    framed: &mut FramedStream<T>,
    config: &SessionConfig,
) -> Result<FrameCipher, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let started = Instant::now();
    let mut handshake = Handshake::new(config.role, config.suite, &mut OsRng);

    for action in handshake.start()? {
        execute(framed, action).await?;
    }

    while !handshake.is_complete() {
        let payload = framed.receive_message().await?;
        let record = HandshakeRecord::decode(&payload)?;

        for action in handshake.handle_record(record)? {
            execute(framed, action).await?;
        }
    }

    debug!(
        role = ?config.role,
        suite = %config.suite,
        elapsed = ?started.elapsed(),
        "key exchange complete"
    );

    handshake.into_cipher()
}

async fn execute<T>(
    framed: &mut FramedStream<T>,
    action: HandshakeAction,
) -> Result<(), SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    match action {
        HandshakeAction::Send(record) => {
            framed.send_message(&record.encode()).await?;
            Ok(())
        },
    }
}
