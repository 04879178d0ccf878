//! Connection Handler
//!
//! Handles individual client connections.

use std::io::BufWriter;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;

use crate::config::{Config, Framing};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::protocol::{write_message, MessageReader};
use super::registry::RegistryGuard;

/// Handles a single client connection
///
/// Owns both halves of the socket and the registry entry, so dropping the
/// connection closes the socket and deregisters it.
pub struct Connection {
    /// Framed reader over the TCP stream
    reader: MessageReader<TcpStream>,

    /// TCP stream writer (buffered so each response is one write)
    writer: BufWriter<TcpStream>,

    framing: Framing,

    /// Shared, stateless request router
    dispatcher: Arc<Dispatcher>,

    /// Registry entry, released on drop
    guard: RegistryGuard,

    /// Peer address for logging
    peer_addr: SocketAddr,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up framed I/O and applies socket options from the config.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        guard: RegistryGuard,
        dispatcher: Arc<Dispatcher>,
        config: &Config,
    ) -> Result<Self> {
        // Accepted sockets inherit O_NONBLOCK from the listener on some platforms
        stream.set_nonblocking(false)?;
        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: MessageReader::from_config(read_stream, config),
            writer: BufWriter::new(write_stream),
            framing: config.framing,
            dispatcher,
            guard,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads messages in a loop and sends responses, strictly in order.
    /// Returns `Ok` when the client disconnects (cleanly or by reset) and
    /// `Err` for any other I/O failure.
    pub fn handle(&mut self) -> Result<()> {
        let conn_id = self.guard.id();
        tracing::debug!(conn_id = %conn_id, peer = %self.peer_addr, "Connection established");

        loop {
            let message = match self.reader.read_message() {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!(conn_id = %conn_id, peer = %self.peer_addr, "Client disconnected");
                    return Ok(());
                }
                Err(e) if e.is_disconnect() => {
                    tracing::info!(
                        conn_id = %conn_id, peer = %self.peer_addr,
                        "Client disconnected: {}", e
                    );
                    return Ok(());
                }
                Err(e) if e.is_timeout() => {
                    tracing::debug!(conn_id = %conn_id, peer = %self.peer_addr, "Read timeout");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        conn_id = %conn_id, peer = %self.peer_addr,
                        "Error reading from client: {}", e
                    );
                    return Err(e);
                }
            };

            tracing::debug!(
                conn_id = %conn_id, peer = %self.peer_addr, bytes = message.len(),
                "Received: {}", String::from_utf8_lossy(&message)
            );

            let response = self.dispatcher.dispatch(&message);
            self.guard.record_request();

            if let Err(e) = write_message(&mut self.writer, self.framing, &response) {
                if e.is_disconnect() {
                    tracing::info!(
                        conn_id = %conn_id, peer = %self.peer_addr,
                        "Client disconnected before response could be sent: {}", e
                    );
                    return Ok(());
                }
                tracing::warn!(
                    conn_id = %conn_id, peer = %self.peer_addr,
                    "Error writing to client: {}", e
                );
                return Err(e);
            }
        }
    }

    /// Requests answered so far on this connection
    pub fn requests(&self) -> u64 {
        self.guard.requests()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Both handles refer to the same socket; one shutdown closes it for
        // the peer even if a clone were still alive somewhere.
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// Serve one accepted connection until it closes
///
/// Entry point of each per-connection thread. Errors are logged here and
/// go no further: one connection failing never affects another.
pub fn serve(
    stream: TcpStream,
    peer_addr: SocketAddr,
    guard: RegistryGuard,
    dispatcher: Arc<Dispatcher>,
    config: &Config,
) {
    let conn_id = guard.id();

    let mut connection = match Connection::new(stream, peer_addr, guard, dispatcher, config) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, peer = %peer_addr, "Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.handle() {
        tracing::warn!(conn_id = %conn_id, peer = %peer_addr, "Connection closed with error: {}", e);
    }

    tracing::debug!(
        conn_id = %conn_id, peer = %peer_addr, requests = connection.requests(),
        "Connection closed"
    );
}
