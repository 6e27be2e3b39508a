// Isolated stream module
// Write half of a connection that adds the isolation headers to response
// heads hyper writes on its own (400, 414, 431 and friends)

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::http::isolation::{EMBEDDER_POLICY, OPENER_POLICY, REQUIRE_CORP, SAME_ORIGIN};

const HEAD_END: &[u8] = b"\r\n\r\n";

/// Stream wrapper handed to hyper in place of the socket.
///
/// It reports itself as non-vectored, so hyper flattens every response into
/// one buffer with the head at its start. A write that starts a fresh buffer
/// and begins with a status line is checked, and missing isolation headers
/// are spliced in before the blank line. Responses built by the handler
/// already carry both and pass through untouched.
pub struct IsolatedStream<S> {
    inner: S,
    /// Rewritten bytes already acknowledged to hyper but not yet sent
    pending: Vec<u8>,
    sent: usize,
    /// The next write begins a new buffer rather than continuing a short write
    at_boundary: bool,
}

impl<S> IsolatedStream<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            sent: 0,
            at_boundary: true,
        }
    }
}

impl<S: AsyncWrite + Unpin> IsolatedStream<S> {
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.sent < self.pending.len() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending[self.sent..]))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.sent += n;
        }
        self.pending.clear();
        self.sent = 0;
        Poll::Ready(Ok(()))
    }
}

/// Copy of `buf` with the missing isolation headers added to its head,
/// or `None` when the buffer is not a response head or needs nothing.
pub fn isolate_head(buf: &[u8]) -> Option<Vec<u8>> {
    if !buf.starts_with(b"HTTP/1.") {
        return None;
    }
    let head_end = buf.windows(HEAD_END.len()).position(|w| w == HEAD_END)?;
    // keep the CRLF of the last header line, insert before the blank line
    let split = head_end + 2;
    let head = buf[..split].to_ascii_lowercase();

    let required = [(EMBEDDER_POLICY, REQUIRE_CORP), (OPENER_POLICY, SAME_ORIGIN)];
    let mut extra = Vec::new();
    for (name, value) in &required {
        let line_start = format!("\r\n{}:", name.as_str());
        if !contains(&head, line_start.as_bytes()) {
            extra.extend_from_slice(name.as_str().as_bytes());
            extra.extend_from_slice(b": ");
            extra.extend_from_slice(value.as_bytes());
            extra.extend_from_slice(b"\r\n");
        }
    }
    if extra.is_empty() {
        return None;
    }

    let mut out = Vec::with_capacity(buf.len() + extra.len());
    out.extend_from_slice(&buf[..split]);
    out.extend_from_slice(&extra);
    out.extend_from_slice(&buf[split..]);
    Some(out)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

impl<S: AsyncRead + Unpin> AsyncRead for IsolatedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for IsolatedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;

        if this.at_boundary {
            if let Some(rewritten) = isolate_head(buf) {
                this.pending = rewritten;
                // the whole of `buf` now belongs to `pending`; whatever is
                // left unsent goes out on the next write, flush or shutdown
                if let Poll::Ready(Err(e)) = this.poll_drain(cx) {
                    return Poll::Ready(Err(e));
                }
                return Poll::Ready(Ok(buf.len()));
            }
        }

        let n = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.at_boundary = n == buf.len();
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
