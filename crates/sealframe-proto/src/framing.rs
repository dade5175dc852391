//! Length-prefixed message framing over a byte stream.
//!
//! The transport guarantees ordered bytes, not message boundaries. This
//! module delimits messages as `[u32 length, Big Endian][payload]` and
//! exposes an all-or-nothing interface: [`FramedStream::receive_message`]
//! either returns one complete payload or an error, never a partial read.
//!
//! # Security
//!
//! The length prefix is attacker-controlled. It is validated against
//! [`FramingConfig::max_message_len`] before any allocation, so a hostile
//! peer cannot make the receiver reserve an unbounded buffer.

use std::{io, time::Duration};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::timeout,
};

use crate::errors::FramingError;

/// Default cap on a single framed message (16 MiB).
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// Default deadline for receiving one complete message.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for sending one complete message.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Framing limits and deadlines.
#[derive(Debug, Clone)]
pub struct FramingConfig {
    /// Maximum accepted (and produced) message length in bytes
    pub max_message_len: usize,
    /// Deadline for one `receive_message` call
    pub read_timeout: Duration,
    /// Deadline for one `send_message` call
    pub write_timeout: Duration,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Length-delimited message stream.
///
/// Wraps any ordered byte stream (`TcpStream` in production,
/// `tokio::io::duplex` in tests). A single task owns the stream, so sends
/// cannot interleave; the prefix and payload are assembled into one buffer
/// and written together.
///
/// In-flight calls return promptly when the peer closes the transport or
/// the configured deadline elapses; neither side can hang the session
/// indefinitely.
#[derive(Debug)]
pub struct FramedStream<S> {
    stream: S,
    config: FramingConfig,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream with default limits.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, FramingConfig::default())
    }

    /// Wrap a stream with explicit limits.
    pub fn with_config(stream: S, config: FramingConfig) -> Self {
        Self { stream, config }
    }

    /// Configured limits and deadlines.
    #[must_use]
    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    /// Send one complete message: `[u32 BE length][payload]`.
    ///
    /// # Errors
    ///
    /// - `FramingError::MessageTooLarge` if the payload exceeds the limit
    /// - `FramingError::Timeout` if the write deadline elapses
    /// - `FramingError::ConnectionClosed` / `FramingError::Io` on transport
    ///   failure
    pub async fn send_message(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        let max = self.effective_max();
        if payload.len() > max {
            return Err(FramingError::MessageTooLarge { len: payload.len(), max });
        }

        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.put_slice(payload);

        let deadline = self.config.write_timeout;
        timeout(deadline, async {
            self.stream.write_all(&buf).await?;
            self.stream.flush().await
        })
        .await
        .map_err(|_| FramingError::Timeout { deadline })?
        .map_err(map_io)
    }

    /// Receive one complete message.
    ///
    /// Reads exactly 4 prefix bytes, validates the claimed length against
    /// the configured maximum, then reads exactly that many payload bytes.
    ///
    /// # Errors
    ///
    /// - `FramingError::MessageTooLarge` if the prefix exceeds the limit
    /// - `FramingError::ConnectionClosed` if the peer closes mid-message
    /// - `FramingError::Timeout` if the read deadline elapses
    /// - `FramingError::Io` on any other transport failure
    pub async fn receive_message(&mut self) -> Result<Bytes, FramingError> {
        let deadline = self.config.read_timeout;
        let max = self.effective_max();

        timeout(deadline, async {
            let mut len_buf = [0u8; 4];
            self.stream.read_exact(&mut len_buf).await.map_err(map_io)?;

            let len = u32::from_be_bytes(len_buf) as usize;
            if len > max {
                return Err(FramingError::MessageTooLarge { len, max });
            }

            let mut body = vec![0u8; len];
            self.stream.read_exact(&mut body).await.map_err(map_io)?;
            Ok(Bytes::from(body))
        })
        .await
        .map_err(|_| FramingError::Timeout { deadline })?
    }

    /// Shut down the write half, signalling end-of-stream to the peer.
    pub async fn shutdown(&mut self) -> Result<(), FramingError> {
        self.stream.shutdown().await.map_err(map_io)
    }

    /// Consume the wrapper and return the underlying stream.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Configured maximum clamped to what the u32 prefix can express.
    fn effective_max(&self) -> usize {
        self.config.max_message_len.min(u32::MAX as usize)
    }
}

/// A clean EOF inside `read_exact` means the peer closed the connection;
/// everything else stays an I/O error.
fn map_io(err: io::Error) -> FramingError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FramingError::ConnectionClosed
    } else {
        FramingError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (FramedStream<tokio::io::DuplexStream>, FramedStream<tokio::io::DuplexStream>) {
        let (a, b) = tokio::io::duplex(256 * 1024);
        (FramedStream::new(a), FramedStream::new(b))
    }

    #[tokio::test]
    async fn round_trip_small_message() {
        let (mut tx, mut rx) = pair();

        tx.send_message(b"hello frame").await.unwrap();
        let got = rx.receive_message().await.unwrap();

        assert_eq!(&got[..], b"hello frame");
    }

    #[tokio::test]
    async fn round_trip_empty_message() {
        let (mut tx, mut rx) = pair();

        tx.send_message(b"").await.unwrap();
        let got = rx.receive_message().await.unwrap();

        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn round_trip_preserves_order() {
        let (mut tx, mut rx) = pair();

        tx.send_message(b"one").await.unwrap();
        tx.send_message(b"").await.unwrap();
        tx.send_message(b"three").await.unwrap();

        assert_eq!(&rx.receive_message().await.unwrap()[..], b"one");
        assert!(rx.receive_message().await.unwrap().is_empty());
        assert_eq!(&rx.receive_message().await.unwrap()[..], b"three");
    }

    #[tokio::test]
    async fn sender_rejects_oversized_payload() {
        let (a, _b) = tokio::io::duplex(1024);
        let config = FramingConfig { max_message_len: 16, ..FramingConfig::default() };
        let mut tx = FramedStream::with_config(a, config);

        let result = tx.send_message(&[0u8; 17]).await;
        assert!(matches!(result, Err(FramingError::MessageTooLarge { len: 17, max: 16 })));
    }

    #[tokio::test]
    async fn receiver_rejects_oversized_length_prefix() {
        let (a, b) = tokio::io::duplex(1024);
        let mut tx = FramedStream::new(a);
        let config = FramingConfig { max_message_len: 8, ..FramingConfig::default() };
        let mut rx = FramedStream::with_config(b, config);

        // Sender's limit is the default, so this goes out on the wire.
        tx.send_message(&[0u8; 64]).await.unwrap();

        let result = rx.receive_message().await;
        assert!(matches!(result, Err(FramingError::MessageTooLarge { len: 64, max: 8 })));
    }

    #[tokio::test]
    async fn peer_close_mid_message_is_connection_closed() {
        let (a, b) = tokio::io::duplex(1024);
        let mut rx = FramedStream::new(b);

        // Write a prefix claiming 100 bytes, then drop the stream.
        {
            let mut raw = a;
            raw.write_all(&100u32.to_be_bytes()).await.unwrap();
            raw.write_all(b"partial").await.unwrap();
        }

        let result = rx.receive_message().await;
        assert!(matches!(result, Err(FramingError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn clean_close_before_prefix_is_connection_closed() {
        let (a, b) = tokio::io::duplex(1024);
        drop(a);
        let mut rx = FramedStream::new(b);

        let result = rx.receive_message().await;
        assert!(matches!(result, Err(FramingError::ConnectionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_hits_read_deadline() {
        let (_a, b) = tokio::io::duplex(1024);
        let config = FramingConfig {
            read_timeout: Duration::from_millis(50),
            ..FramingConfig::default()
        };
        let mut rx = FramedStream::with_config(b, config);

        let result = rx.receive_message().await;
        assert!(matches!(result, Err(FramingError::Timeout { .. })));
    }

    #[tokio::test]
    async fn large_message_round_trips() {
        let (mut tx, mut rx) = pair();
        let payload = vec![0xA5u8; 64 * 1024];

        let send = tx.send_message(&payload);
        let recv = rx.receive_message();
        let (sent, got) = tokio::join!(send, recv);

        sent.unwrap();
        assert_eq!(&got.unwrap()[..], &payload[..]);
    }
}
