//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{FlameError, Result};
use super::connection::serve;
use super::registry::{ConnectionRegistry, RegistryStats};
use super::shutdown::ShutdownHandle;

/// TCP server for flameload
///
/// The accept loop runs on the caller's thread; every accepted connection
/// runs on a thread of its own.
pub struct Server {
    config: Arc<Config>,
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listening socket described by `config`
    ///
    /// Address reuse is enabled. Any failure here is returned as
    /// [`FlameError::Bind`] before a single connection is accepted.
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let listener = bind_listener(&config.listen_addr, config.backlog)?;
        let local_addr = listener.local_addr().map_err(|source| FlameError::Bind {
            addr: config.listen_addr.clone(),
            source,
        })?;

        // Non-blocking accept lets the loop notice shutdown requests
        listener
            .set_nonblocking(true)
            .map_err(|source| FlameError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;

        tracing::info!("Server listening on {}", local_addr);

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::from_config(&config)),
            config: Arc::new(config),
            listener,
            local_addr,
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Address the server is actually bound to (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that stops [`Server::run`] from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Registry of open connections
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accept connections until shutdown is requested
    ///
    /// Accept errors are logged and the loop keeps going. On return the
    /// listening socket is closed; connections already being served keep
    /// running on their own threads.
    pub fn run(self) -> Result<RegistryStats> {
        let poll_interval = self.config.accept_poll_interval();

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => self.spawn_connection(stream, peer_addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll_interval),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Transient (EMFILE, ECONNABORTED, ...); back off and retry
                    tracing::warn!("{}", FlameError::Accept(e));
                    thread::sleep(poll_interval);
                }
            }
        }

        let stats = self.registry.stats();
        tracing::info!(
            open = stats.open,
            accepted = stats.accepted,
            "Server shutting down, no longer accepting connections"
        );
        Ok(stats)
    }

    /// Register the connection and start its handler thread
    fn spawn_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        tracing::info!(peer = %peer_addr, "Connection from {}", peer_addr);

        let guard = self.registry.register(peer_addr);
        let conn_id = guard.id();
        let dispatcher = Arc::clone(&self.dispatcher);
        let config = Arc::clone(&self.config);

        let spawned = thread::Builder::new()
            .name(format!("flameload-conn-{}", conn_id))
            .stack_size(self.config.stack_size)
            .spawn(move || serve(stream, peer_addr, guard, dispatcher, &config));

        // On failure the closure (stream and guard included) is dropped,
        // which closes the socket and deregisters it.
        if let Err(e) = spawned {
            tracing::error!(conn_id = %conn_id, peer = %peer_addr, "Failed to spawn connection thread: {}", e);
        }
    }
}

/// Bind and listen on the first address `addr` resolves to that works
///
/// IPv4 addresses are tried before IPv6 ones so `localhost` lands on
/// 127.0.0.1 where both exist.
fn bind_listener(addr: &str, backlog: i32) -> Result<TcpListener> {
    let bind_error = |source: std::io::Error| FlameError::Bind {
        addr: addr.to_string(),
        source,
    };

    let mut candidates: Vec<SocketAddr> = addr.to_socket_addrs().map_err(bind_error)?.collect();
    candidates.sort_by_key(|a| a.is_ipv6());

    let mut last_error = None;
    for candidate in candidates {
        match bind_socket(candidate, backlog) {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                tracing::debug!("Could not bind {}: {}", candidate, e);
                last_error = Some(e);
            }
        }
    }

    Err(bind_error(last_error.unwrap_or_else(|| {
        std::io::Error::new(ErrorKind::AddrNotAvailable, "address resolved to nothing")
    })))
}

fn bind_socket(addr: SocketAddr, backlog: i32) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

/// Bind `config` and serve until shutdown
pub fn run(config: Config) -> Result<RegistryStats> {
    Server::bind(config)?.run()
}
