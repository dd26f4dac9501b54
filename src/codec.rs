//! Wire codec: dot-stuffing, multi-line body framing, article accumulation.
//!
//! Multi-line responses are assembled into a single buffer so the optional
//! GZIP framing negotiated via `XFEATURE COMPRESS GZIP TERMINATOR` can wrap
//! the whole body (everything after the status line, terminator included)
//! in one stream. Decompressing that stream yields the uncompressed
//! protocol bytes verbatim.

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Builder for a dot-stuffed multi-line response body.
pub struct MultilineBody {
    buf: Vec<u8>,
}

impl MultilineBody {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append one logical line, applying dot-stuffing.
    pub fn push_line(&mut self, line: &str) {
        if line.starts_with('.') {
            self.buf.push(b'.');
        }
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Append a block of CRLF-separated text as individual stuffed lines.
    pub fn push_text(&mut self, text: &str) {
        for line in text.split("\r\n") {
            self.push_line(line);
        }
    }

    /// Finish with the `.\r\n` terminator, gzipping the whole body when the
    /// session negotiated the compression extension.
    pub fn into_wire(mut self, gzip: bool) -> Result<Vec<u8>> {
        self.buf.extend_from_slice(b".\r\n");
        if gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&self.buf)?;
            Ok(encoder.finish()?)
        } else {
            Ok(self.buf)
        }
    }
}

impl Default for MultilineBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a status line followed by a finished multi-line body.
pub async fn send_multiline<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: &str,
    body: MultilineBody,
    gzip: bool,
) -> Result<()> {
    writer.write_all(status.as_bytes()).await?;
    writer.write_all(&body.into_wire(gzip)?).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a dot-terminated article from the peer, unstuffing leading dots.
///
/// Line-at-a-time reading makes the terminator check immune to the
/// cross-chunk split where `\r\n` ends one read and `.\r\n` begins the
/// next. Returns the accumulated text without the terminator. A peer that
/// closes the connection mid-article surfaces as an `std::io::Error` so
/// callers can tell a dead transport from a backend failure.
pub async fn read_article<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut msg = String::new();
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before article terminator",
            )
            .into());
        }
        if line == ".\r\n" || line == ".\n" {
            break;
        }
        if let Some(unstuffed) = line.strip_prefix("..") {
            msg.push('.');
            msg.push_str(unstuffed);
        } else {
            msg.push_str(&line);
        }
    }
    Ok(msg)
}
