//! Registry Tests
//!
//! Tests verify:
//! - Register/release bookkeeping and stats
//! - Release happens exactly once, on guard drop
//! - Concurrent registration from many threads
//! - wait_idle drains and times out

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flameload::network::ConnectionRegistry;

fn peer(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_registry_is_empty() {
    let registry = ConnectionRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.stats().accepted, 0);
}

#[test]
fn test_register_and_drop() {
    let registry = Arc::new(ConnectionRegistry::new());

    let guard = registry.register(peer(4000));
    let id = guard.id();
    assert!(registry.contains(id));
    assert_eq!(registry.open_connections(), 1);

    drop(guard);
    assert!(!registry.contains(id));
    assert!(registry.is_empty());

    let stats = registry.stats();
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.closed, 1);
}

#[test]
fn test_ids_are_unique() {
    let registry = Arc::new(ConnectionRegistry::new());
    let a = registry.register(peer(1));
    let b = registry.register(peer(2));
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_snapshot_is_sorted_and_carries_peer() {
    let registry = Arc::new(ConnectionRegistry::new());
    let _a = registry.register(peer(5001));
    let _b = registry.register(peer(5002));

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot[0].0 < snapshot[1].0);
    assert_eq!(snapshot[0].1.peer_addr, peer(5001));
    assert_eq!(snapshot[1].1.peer_addr, peer(5002));
}

#[test]
fn test_request_counts_fold_in_on_close() {
    let registry = Arc::new(ConnectionRegistry::new());

    let mut guard = registry.register(peer(6000));
    guard.record_request();
    guard.record_request();
    guard.record_request();
    assert_eq!(guard.requests(), 3);
    // Not visible until the connection closes
    assert_eq!(registry.stats().requests, 0);

    drop(guard);
    assert_eq!(registry.stats().requests, 3);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_register_and_release() {
    let registry = Arc::new(ConnectionRegistry::new());

    let mut handles = vec![];
    for t in 0..8u16 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            for i in 0..100u16 {
                let mut guard = registry.register(peer(t * 1000 + i));
                guard.record_request();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = registry.stats();
    assert_eq!(stats.open, 0);
    assert_eq!(stats.accepted, 800);
    assert_eq!(stats.closed, 800);
    assert_eq!(stats.requests, 800);
}

#[test]
fn test_guard_released_when_thread_panics() {
    let registry = Arc::new(ConnectionRegistry::new());

    let registry_clone = Arc::clone(&registry);
    let result = thread::spawn(move || {
        let _guard = registry_clone.register(peer(7000));
        panic!("handler blew up");
    })
    .join();

    assert!(result.is_err());
    assert!(registry.is_empty());
}

// =============================================================================
// Drain Tests
// =============================================================================

#[test]
fn test_wait_idle_on_empty_registry() {
    let registry = ConnectionRegistry::new();
    assert!(registry.wait_idle(Duration::from_millis(1)));
}

#[test]
fn test_wait_idle_returns_when_last_connection_closes() {
    let registry = Arc::new(ConnectionRegistry::new());
    let guard = registry.register(peer(8000));

    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        drop(guard);
    });

    let start = Instant::now();
    assert!(registry.wait_idle(Duration::from_secs(5)));
    assert!(start.elapsed() < Duration::from_secs(5));
    closer.join().unwrap();
}

#[test]
fn test_wait_idle_times_out() {
    let registry = Arc::new(ConnectionRegistry::new());
    let _guard = registry.register(peer(9000));

    let start = Instant::now();
    assert!(!registry.wait_idle(Duration::from_millis(50)));
    assert!(start.elapsed() >= Duration::from_millis(50));
}
