//! Client
//!
//! Blocking client speaking the server's wire contract. Used by the load
//! generator and by tests.

use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::Framing;
use crate::error::{FlameError, Result};
use crate::protocol::{decode_response, encode_request, write_message, Request, Response};

/// Size of a single read while waiting for a response
const READ_CHUNK: usize = 4096;

/// A persistent connection to a flameload server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    framing: Framing,
}

impl Client {
    /// Connect to `addr` using `framing`
    pub fn connect(addr: impl ToSocketAddrs, framing: Framing) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            framing,
        })
    }

    /// Give up on a response after `timeout` (None waits forever)
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a typed request and decode the response
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        let payload = encode_request(request)?;
        let reply = self.send_raw(&payload)?;
        decode_response(&reply)
    }

    /// Send raw bytes as one message and return the raw response
    pub fn send_raw(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        write_message(&mut self.writer, self.framing, payload)?;
        self.read_reply()
    }

    /// Close the write side so the server sees an orderly disconnect
    pub fn close(self) -> Result<()> {
        self.writer.get_ref().shutdown(Shutdown::Write)?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<Vec<u8>> {
        match self.framing {
            Framing::Line => self.read_line_reply(),
            Framing::Raw => self.read_json_reply(),
        }
    }

    fn read_line_reply(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let n = self.reader.read_until(b'\n', &mut line).map_err(map_timeout)?;
        if n == 0 {
            return Err(eof());
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Ok(line)
    }

    /// Raw framing has no delimiter: keep reading until the bytes form a
    /// complete JSON value.
    fn read_json_reply(&mut self) -> Result<Vec<u8>> {
        let mut reply = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = match self.reader.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_timeout(e)),
            };
            if n == 0 {
                return if reply.is_empty() { Err(eof()) } else { Ok(reply) };
            }
            reply.extend_from_slice(&chunk[..n]);

            match serde_json::from_slice::<serde_json::Value>(&reply) {
                Ok(_) => return Ok(reply),
                Err(e) if e.is_eof() => continue,
                // Not JSON at all; hand back what arrived
                Err(_) => return Ok(reply),
            }
        }
    }
}

fn eof() -> FlameError {
    FlameError::Io(std::io::Error::new(
        ErrorKind::UnexpectedEof,
        "server closed the connection",
    ))
}

fn map_timeout(e: std::io::Error) -> FlameError {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => FlameError::Timeout,
        _ => FlameError::Io(e),
    }
}
