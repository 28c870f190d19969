//! Transport abstraction for the progress feed
//!
//! The monitor pulls ordered byte chunks through these traits and never
//! sees HTTP directly. That keeps the pump testable against scripted
//! streams and lets captured feeds be replayed from files.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open progress stream: {reason}")]
    Connect { reason: String },

    #[error("Progress stream rejected with HTTP status {status}")]
    Status { status: u16 },

    #[error("Session expired: authenticated stream request rejected")]
    SessionExpired,

    #[error("Progress stream interrupted: {reason}")]
    Interrupted { reason: String },

    #[error("I/O failure on progress stream: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a connect error from any displayable cause
    pub fn connect(reason: impl Into<String>) -> Self {
        Self::Connect {
            reason: reason.into(),
        }
    }

    /// Create a mid-stream interruption error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// True when the failure means the bearer session is no longer valid
    pub fn is_session_expiry(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// One open progress stream delivering ordered byte chunks.
///
/// `Ok(None)` is a clean end of stream; every error is fatal for the
/// session it feeds.
#[async_trait]
pub trait ProgressByteStream: Send {
    async fn next_chunk(&mut self) -> TransportResult<Option<Vec<u8>>>;
}

/// Opens progress streams for monitored sources.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    type Stream: ProgressByteStream + 'static;

    async fn open(&self, source_id: &str) -> TransportResult<Self::Stream>;
}

/// Default read size for [`ReaderByteStream`].
const READER_CHUNK_SIZE: usize = 4096;

/// Byte stream over any [`AsyncRead`], used to replay captured feeds from
/// files or test readers.
#[derive(Debug)]
pub struct ReaderByteStream<R> {
    reader: R,
    chunk_size: usize,
}

impl<R> ReaderByteStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, READER_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl<R> ProgressByteStream for ReaderByteStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_chunk(&mut self) -> TransportResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let read = self.reader.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok(Some(buf))
    }
}
