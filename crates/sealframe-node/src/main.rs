//! Sealframe node binary.
//!
//! Thin TCP glue around the protocol core: `send` encrypts and streams
//! frame files to a peer, `recv` accepts one connection and writes the
//! decrypted frames back out as numbered files. Camera capture and display
//! stay outside; anything that can produce frame files can feed this.
//!
//! # Usage
//!
//! ```bash
//! # Consumer: accept one session, write frames into ./frames-out
//! sealframe-node recv --bind 0.0.0.0:7100 --output frames-out
//!
//! # Producer: stream every file in ./frames to the consumer
//! sealframe-node send --connect 127.0.0.1:7100 --input frames
//! ```

use std::{
    collections::VecDeque,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use sealframe_core::{
    CipherSuite, FrameSink, FrameSource, SessionConfig, start_consumer_session,
    start_producer_session,
};
use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealframe secure frame streaming node
#[derive(Parser, Debug)]
#[command(name = "sealframe-node")]
#[command(about = "Stream encrypted frames between two peers over TCP")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce: encrypt frame files and stream them to a consumer
    Send {
        /// Address of the consumer to connect to
        #[arg(long)]
        connect: String,

        /// Cipher suite (must match the consumer)
        #[arg(long, value_enum, default_value = "chacha20poly1305")]
        suite: SuiteArg,

        /// Frame file, or directory of frame files streamed in name order
        #[arg(long)]
        input: PathBuf,
    },

    /// Consume: accept one producer and write decrypted frames to disk
    Recv {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:7100")]
        bind: String,

        /// Cipher suite (must match the producer)
        #[arg(long, value_enum, default_value = "chacha20poly1305")]
        suite: SuiteArg,

        /// Directory to write numbered frame files into
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SuiteArg {
    /// ChaCha20-Poly1305 AEAD (preferred)
    Chacha20poly1305,
    /// AES-256-GCM AEAD
    Aes256Gcm,
    /// AES-256-CBC with PKCS7 (legacy, unauthenticated)
    Aes256Cbc,
}

impl From<SuiteArg> for CipherSuite {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::Chacha20poly1305 => Self::ChaCha20Poly1305,
            SuiteArg::Aes256Gcm => Self::Aes256Gcm,
            SuiteArg::Aes256Cbc => Self::Aes256CbcPkcs7,
        }
    }
}

/// Streams each file in a directory (name order) as one frame.
struct FileFrameSource {
    paths: VecDeque<PathBuf>,
}

impl FileFrameSource {
    fn open(input: &Path) -> io::Result<Self> {
        let mut paths = Vec::new();
        if input.is_dir() {
            for entry in std::fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() {
                    paths.push(path);
                }
            }
            paths.sort();
        } else {
            paths.push(input.to_path_buf());
        }
        Ok(Self { paths: paths.into() })
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(&path).await?;
        tracing::debug!(path = %path.display(), len = bytes.len(), "frame loaded");
        Ok(Some(Bytes::from(bytes)))
    }
}

/// Writes each delivered frame as `frame-NNNNNN.bin` in the output dir.
struct FileFrameSink {
    dir: PathBuf,
    index: u64,
}

#[async_trait]
impl FrameSink for FileFrameSink {
    async fn deliver(&mut self, frame: Bytes) -> io::Result<()> {
        let path = self.dir.join(format!("frame-{:06}.bin", self.index));
        tokio::fs::write(&path, &frame).await?;
        tracing::debug!(path = %path.display(), len = frame.len(), "frame written");
        self.index += 1;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match args.command {
        Command::Send { connect, suite, input } => {
            let source = FileFrameSource::open(&input)?;
            tracing::info!(frames = source.paths.len(), %connect, "connecting to consumer");

            let stream = TcpStream::connect(&connect).await?;
            stream.set_nodelay(true)?;

            let config = SessionConfig::initiator(suite.into());
            let stats = start_producer_session(stream, source, config).await?;

            tracing::info!(frames_sent = stats.frames_sent, "session finished");
        },
        Command::Recv { bind, suite, output } => {
            std::fs::create_dir_all(&output)?;

            let listener = TcpListener::bind(&bind).await?;
            tracing::info!(addr = %listener.local_addr()?, "listening for producer");

            let (stream, peer) = listener.accept().await?;
            stream.set_nodelay(true)?;
            tracing::info!(%peer, "producer connected");

            let sink = FileFrameSink { dir: output, index: 0 };
            let config = SessionConfig::responder(suite.into());
            let stats = start_consumer_session(stream, sink, config).await?;

            tracing::info!(
                frames_received = stats.frames_received,
                frames_skipped = stats.frames_skipped,
                "session finished"
            );
        },
    }

    Ok(())
}
