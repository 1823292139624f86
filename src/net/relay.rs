//! Byte-stream forwarder.
//!
//! Copies bytes both ways between two established connections until either
//! direction finishes, then closes both. No inspection of the bytes.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::error::GatewayResult;
use crate::observability::metrics;

/// Which copy finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Caller to backend.
    Upstream,
    /// Backend to caller.
    Downstream,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
        }
    }
}

/// Summary of a finished pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub ended_by: Direction,
    pub upstream_bytes: u64,
    pub downstream_bytes: u64,
}

/// Relay between `caller` and `backend` until one direction ends.
///
/// Whichever way the first copy ends (EOF or error), both write halves are
/// shut down and both connections dropped before this returns. The error of
/// the finishing direction, if any, is returned after cleanup.
pub async fn forward<A, B>(caller: A, backend: B) -> GatewayResult<RelayOutcome>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (caller_read, mut caller_write) = tokio::io::split(caller);
    let (backend_read, mut backend_write) = tokio::io::split(backend);
    let mut caller_read = Counted::new(caller_read);
    let mut backend_read = Counted::new(backend_read);

    let (ended_by, result) = tokio::select! {
        r = tokio::io::copy(&mut caller_read, &mut backend_write) => (Direction::Upstream, r),
        r = tokio::io::copy(&mut backend_read, &mut caller_write) => (Direction::Downstream, r),
    };
    let upstream_bytes = caller_read.read;
    let downstream_bytes = backend_read.read;

    // Already-closed peers make shutdown fail; nothing to do about it.
    let _ = backend_write.shutdown().await;
    let _ = caller_write.shutdown().await;

    metrics::record_forwarded_bytes(Direction::Upstream.label(), upstream_bytes);
    metrics::record_forwarded_bytes(Direction::Downstream.label(), downstream_bytes);

    tracing::debug!(
        ended_by = ended_by.label(),
        upstream_bytes,
        downstream_bytes,
        "Relay finished"
    );

    result?;
    Ok(RelayOutcome {
        ended_by,
        upstream_bytes,
        downstream_bytes,
    })
}

/// Reader that counts the bytes it hands out, so a copy cancelled by
/// `select!` still reports how far it got.
struct Counted<R> {
    inner: R,
    read: u64,
}

impl<R> Counted<R> {
    fn new(inner: R) -> Self {
        Self { inner, read: 0 }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Counted<R> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            self.read += (buf.filled().len() - before) as u64;
        }
        poll
    }
}
