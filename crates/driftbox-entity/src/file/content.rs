//! Transient byte-content handle.
//!
//! Content is never part of the persisted metadata record; it rides along
//! with the aggregate only while an upload or download is in flight.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, ReadBuf};

/// A single-pass byte source.
pub trait ContentStream: AsyncRead + Send + Unpin {}

impl<T: AsyncRead + Send + Unpin + ?Sized> ContentStream for T {}

/// A byte source that can be rewound to its start.
pub trait SeekableContent: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin + ?Sized> SeekableContent for T {}

/// The byte content of a file while in flight.
///
/// Single pass, unless the underlying source supports rewinding. The
/// content store rewinds rewindable sources before writing, so one handle
/// can be reused for store-then-verify flows.
pub enum FileContent {
    /// A rewindable source, e.g. an open file or an in-memory buffer.
    Seekable(Box<dyn SeekableContent>),
    /// A one-shot source, e.g. a request body.
    Stream(Box<dyn ContentStream>),
}

impl FileContent {
    /// Wrap a rewindable reader.
    pub fn from_seekable(reader: impl SeekableContent + 'static) -> Self {
        Self::Seekable(Box::new(reader))
    }

    /// Wrap a one-shot reader.
    pub fn from_stream(reader: impl ContentStream + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// In-memory content; rewindable.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Seekable(Box::new(io::Cursor::new(bytes.into())))
    }

    /// An empty content handle.
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// Whether the source supports rewinding.
    pub fn is_seekable(&self) -> bool {
        matches!(self, Self::Seekable(_))
    }

    /// Rewind to the start of the source; a no-op for one-shot sources.
    pub async fn rewind(&mut self) -> io::Result<()> {
        match self {
            Self::Seekable(reader) => reader.rewind().await.map(|_| ()),
            Self::Stream(_) => Ok(()),
        }
    }
}

impl AsyncRead for FileContent {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Seekable(reader) => Pin::new(reader).poll_read(cx, buf),
            Self::Stream(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seekable(_) => f.write_str("FileContent::Seekable(..)"),
            Self::Stream(_) => f.write_str("FileContent::Stream(..)"),
        }
    }
}
