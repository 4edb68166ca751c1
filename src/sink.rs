//! Offset-addressed writes onto a strictly sequential stream.
//!
//! The [`Downloader`](crate::download::Downloader) hands every chunk it
//! receives to a [`WriteAt`] together with the chunk's absolute offset in the
//! object. Standard output cannot honour positioned writes, so
//! [`SequentialSink`] drops the offset and appends the payload in call order.
//!
//! ## Precondition
//!
//! This is only correct while **every** caller delivers writes for exactly one
//! object at a time, at strictly increasing, contiguous, non-overlapping
//! offsets. The sink cannot detect a violation: out-of-order or interleaved
//! writes silently corrupt the output instead of failing.
//!
//! The crate upholds this by construction:
//!
//! - the downloader fetches parts one after another with a single worker
//! - the pipeline downloads one object at a time
//! - `write_at` takes `&mut self`, so two downloads can never share a sink

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Random-access write contract used by the downloader.
#[async_trait]
pub trait WriteAt: Send {
    /// Write `buf` at `offset`, returning the number of bytes written.
    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;
}

/// Adapter that accepts offset-addressed writes and forwards them, in call
/// order, to an ordinal stream such as stdout.
///
/// See the [module documentation](self) for the ordering precondition.
pub struct SequentialSink<W: AsyncWrite + Unpin + Send> {
    inner: W,
    /// Virtual position: total bytes forwarded so far, across all objects
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin + Send> SequentialSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Total bytes forwarded to the underlying stream.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush the underlying stream.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the sink, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl SequentialSink<tokio::io::Stdout> {
    /// Sink over the process's standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> WriteAt for SequentialSink<W> {
    async fn write_at(&mut self, buf: &[u8], _offset: u64) -> io::Result<usize> {
        // Offset intentionally ignored; see the module-level precondition.
        self.inner.write_all(buf).await?;
        self.bytes_written += buf.len() as u64;
        Ok(buf.len())
    }
}
