//! Error types for flameload
//!
//! Provides a unified error type for server, client and load generator
//! operations. Payload-level problems never reach this type on the server:
//! the dispatcher turns them into response values.

use thiserror::Error;

/// Result type alias using FlameError
pub type Result<T> = std::result::Result<T, FlameError>;

/// Unified error type for flameload operations
#[derive(Debug, Error)]
pub enum FlameError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    /// Binding or listening on the configured address failed. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A single accept call failed. The accept loop logs these and continues.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("timed out waiting for a response")]
    Timeout,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Process Errors
    // -------------------------------------------------------------------------
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl FlameError {
    /// True when the error means the peer went away (orderly or not).
    ///
    /// Covers EOF in the middle of a read as well as reset, abort and
    /// broken pipe on either direction.
    pub fn is_disconnect(&self) -> bool {
        match self {
            FlameError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// True when a configured socket timeout fired.
    ///
    /// Unix reports `WouldBlock`, Windows reports `TimedOut`.
    pub fn is_timeout(&self) -> bool {
        match self {
            FlameError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            FlameError::Timeout => true,
            _ => false,
        }
    }
}
