//! Connection Registry
//!
//! Advisory bookkeeping of open connections. Written at accept and at close,
//! read only by tooling (stats, shutdown drain); never consulted while
//! serving requests.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Identity of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the registry remembers about an open connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub peer_addr: SocketAddr,
    pub opened_at: Instant,
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Connections currently open
    pub open: usize,
    /// Connections ever accepted
    pub accepted: u64,
    /// Connections closed
    pub closed: u64,
    /// Requests answered on closed connections
    pub requests: u64,
}

/// Set of open connections keyed by [`ConnectionId`]
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    open: Mutex<HashMap<ConnectionId, ConnectionInfo>>,
    /// Signalled whenever a connection is removed
    closed_cv: Condvar,
    next_id: AtomicU64,
    accepted: AtomicU64,
    closed: AtomicU64,
    requests: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly accepted connection
    ///
    /// The returned guard removes the entry exactly once when dropped.
    pub fn register(self: &Arc<Self>, peer_addr: SocketAddr) -> RegistryGuard {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let info = ConnectionInfo {
            peer_addr,
            opened_at: Instant::now(),
        };

        self.open.lock().insert(id, info);
        self.accepted.fetch_add(1, Ordering::Relaxed);

        RegistryGuard {
            registry: Arc::clone(self),
            id,
            requests: 0,
        }
    }

    fn release(&self, id: ConnectionId, requests: u64) {
        let removed = self.open.lock().remove(&id).is_some();
        if removed {
            self.closed.fetch_add(1, Ordering::Relaxed);
            self.requests.fetch_add(requests, Ordering::Relaxed);
        }
        self.closed_cv.notify_all();
    }

    /// Number of connections currently open
    pub fn open_connections(&self) -> usize {
        self.open.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_connections() == 0
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.open.lock().contains_key(&id)
    }

    /// Copy of the open set, sorted by id
    pub fn snapshot(&self) -> Vec<(ConnectionId, ConnectionInfo)> {
        let mut entries: Vec<_> = self
            .open
            .lock()
            .iter()
            .map(|(id, info)| (*id, info.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            open: self.open_connections(),
            accepted: self.accepted.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }

    /// Block until no connection is open or `timeout` elapses
    ///
    /// Returns true if the registry drained in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut open = self.open.lock();
        while !open.is_empty() {
            if self.closed_cv.wait_until(&mut open, deadline).timed_out() {
                return open.is_empty();
            }
        }
        true
    }
}

/// Scoped registration of one connection
///
/// Owned by the connection handler; dropping it (on any exit path,
/// including unwinding) removes the connection from the registry.
#[derive(Debug)]
pub struct RegistryGuard {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
    requests: u64,
}

impl RegistryGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Count an answered request; folded into the registry on close
    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.release(self.id, self.requests);
    }
}
