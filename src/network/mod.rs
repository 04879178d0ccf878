//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop on the caller's thread
//! - One OS thread per accepted connection
//! - Messages routed through the Dispatcher
//! - Open connections tracked in an advisory registry

mod server;
mod connection;
mod registry;
mod shutdown;

pub use server::{run, Server};
pub use connection::{serve, Connection};
pub use registry::{ConnectionId, ConnectionInfo, ConnectionRegistry, RegistryGuard, RegistryStats};
pub use shutdown::{install_signal_handler, ShutdownHandle};
