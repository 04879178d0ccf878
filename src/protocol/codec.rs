//! Protocol codec
//!
//! Message framing on a byte stream plus JSON encoding helpers.
//!
//! ## Framing
//!
//! ### Raw (default)
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  one read() of at most read_buffer_size bytes │  = one message
//! └──────────────────────────────────────────────┘
//! ```
//! No delimiter. A payload larger than the buffer is split across reads and
//! each piece is handled as its own (usually malformed) message.
//!
//! ### Line
//! ```text
//! ┌──────────────────────────────┬──────┐
//! │          JSON text           │ \n   │
//! └──────────────────────────────┴──────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};

use crate::config::{Config, Framing};
use crate::error::{FlameError, Result};
use super::{Request, Response};

// =============================================================================
// Message Reader
// =============================================================================

/// Reads one message at a time from a stream according to a [`Framing`]
pub struct MessageReader<R> {
    inner: R,
    framing: Framing,
    /// Scratch space for a single read() call
    chunk: Vec<u8>,
    /// Bytes received but not yet returned (line framing only)
    pending: BytesMut,
    max_line_length: usize,
    eof: bool,
}

impl<R: Read> MessageReader<R> {
    pub fn new(inner: R, framing: Framing, read_buffer_size: usize, max_line_length: usize) -> Self {
        Self {
            inner,
            framing,
            chunk: vec![0u8; read_buffer_size.max(1)],
            pending: BytesMut::new(),
            max_line_length,
            eof: false,
        }
    }

    /// Build a reader using the framing settings from a server config
    pub fn from_config(inner: R, config: &Config) -> Self {
        Self::new(
            inner,
            config.framing,
            config.read_buffer_size,
            config.max_line_length,
        )
    }

    /// Read the next message
    ///
    /// Returns `Ok(None)` once the peer has closed its side and nothing is
    /// left to deliver.
    pub fn read_message(&mut self) -> Result<Option<Bytes>> {
        match self.framing {
            Framing::Raw => self.read_raw(),
            Framing::Line => self.read_line(),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    fn read_raw(&mut self) -> Result<Option<Bytes>> {
        let n = self.fill_chunk()?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(Bytes::copy_from_slice(&self.chunk[..n])))
    }

    fn read_line(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
                let mut line = self.pending.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                return Ok(Some(line.freeze()));
            }

            if self.pending.len() > self.max_line_length {
                return Err(FlameError::Protocol(format!(
                    "message exceeds {} bytes without a newline",
                    self.max_line_length
                )));
            }

            if self.eof {
                // Deliver an unterminated trailing message before reporting close
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.pending.split().freeze()));
            }

            let n = self.fill_chunk()?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&self.chunk[..n]);
            }
        }
    }

    fn fill_chunk(&mut self) -> Result<usize> {
        loop {
            match self.inner.read(&mut self.chunk) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Write one message, adding the delimiter the framing requires
pub fn write_message<W: Write>(writer: &mut W, framing: Framing, payload: &[u8]) -> Result<()> {
    writer.write_all(payload)?;
    if framing == Framing::Line {
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

// =============================================================================
// JSON Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Serializing these types cannot fail in practice; if it ever does the
/// client still gets a well-formed error object.
pub fn encode_response(response: &Response) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|e| {
        tracing::error!("failed to encode response: {}", e);
        br#"{"error":"Internal encoding error"}"#.to_vec()
    })
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(request)?)
}
