//! # flameload
//!
//! A minimal request/response server for generating profiling load:
//! - JSON requests over a persistent TCP connection
//! - One OS thread per connection, requests answered strictly in order
//! - CPU-bound (recursive Fibonacci, chained SHA-256) and I/O-bound
//!   (sleep) workloads
//! - Load generator and timed runs for profiling sessions
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Listener / Acceptor                      │
//! │            (accept loop, one thread per connection)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ spawn
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Connection Handler                         │
//! │           (read message → dispatch → write response)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Dispatcher                              │
//! │        (decode, route by type, errors become responses)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!        ┌──────────┬───┴──────┬──────────┐
//!        ▼          ▼          ▼          ▼
//!   ┌────────┐ ┌─────────┐ ┌────────┐ ┌────────┐
//!   │  echo  │ │ compute │ │  hash  │ │  slow  │
//!   └────────┘ └─────────┘ └────────┘ └────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod workload;
pub mod dispatcher;
pub mod network;
pub mod client;
pub mod loadgen;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlameError, Result};
pub use config::{Config, Framing, WorkloadLimits};
pub use dispatcher::Dispatcher;
pub use network::{Server, ShutdownHandle};
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flameload
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
