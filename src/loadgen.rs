//! Load Generator
//!
//! Drives a server with a random mix of requests so there is something to
//! profile. Mirrors the traffic shapes of a profiling session:
//! - a single request
//! - one persistent connection issuing many requests
//! - many clients opening a fresh connection per request
//! - a phased scenario combining the above

use std::net::{SocketAddr, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::client::Client;
use crate::config::Framing;
use crate::error::{FlameError, Result};
use crate::protocol::{now, Request, RequestKind, Response};

/// Pause between requests on a persistent connection
pub const DEFAULT_PERSISTENT_PAUSE: Duration = Duration::from_millis(100);

/// Outcome of a load run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Requests that got a response
    pub requests: u64,
    /// Requests that failed at the transport level
    pub errors: u64,
    pub elapsed: Duration,
}

impl LoadReport {
    fn merge(&mut self, other: &LoadReport) {
        self.requests += other.requests;
        self.errors += other.errors;
        self.elapsed = self.elapsed.max(other.elapsed);
    }

    /// Answered requests per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.requests as f64 / secs
        } else {
            0.0
        }
    }
}

/// Pick a random request with the standard load mix
///
/// Inputs stay small enough that a single request finishes in well under
/// a second on current hardware.
pub fn random_request<R: Rng + ?Sized>(rng: &mut R) -> Request {
    const KINDS: [RequestKind; 4] = [
        RequestKind::Echo,
        RequestKind::Compute,
        RequestKind::Hash,
        RequestKind::Slow,
    ];

    match KINDS.choose(rng).copied().unwrap_or(RequestKind::Echo) {
        RequestKind::Echo => Request::echo(format!("Hello from client at {}", now())),
        RequestKind::Compute => Request::compute(rng.gen_range(20..=35)),
        RequestKind::Hash => Request::hash(
            format!("data_{}", rng.gen_range(1..=1000)),
            rng.gen_range(1000..=5000),
        ),
        RequestKind::Slow => Request::slow(rng.gen_range(0.05..0.2)),
    }
}

/// Connect, send one request, and return its response
pub fn single(addr: SocketAddr, framing: Framing, request: &Request) -> Result<Response> {
    let mut client = Client::connect(addr, framing)?;
    let response = client.request(request)?;
    client.close()?;
    Ok(response)
}

/// Keep one connection open for `duration`, sending a random request
/// every `pause`
pub fn persistent(
    addr: SocketAddr,
    framing: Framing,
    duration: Duration,
    pause: Duration,
) -> Result<LoadReport> {
    let mut rng = rand::thread_rng();
    let mut client = Client::connect(addr, framing)?;
    tracing::info!("Connected to {}", addr);

    let start = Instant::now();
    let mut report = LoadReport::default();

    while start.elapsed() < duration {
        let request = random_request(&mut rng);
        client.request(&request)?;
        report.requests += 1;

        if report.requests % 10 == 0 {
            tracing::info!("Sent {} requests...", report.requests);
        }
        thread::sleep(pause);
    }

    report.elapsed = start.elapsed();
    client.close()?;
    tracing::info!(
        "Completed {} requests in {:.1} seconds",
        report.requests,
        report.elapsed.as_secs_f64()
    );
    Ok(report)
}

/// Run `clients` concurrent workers for `duration`, each opening a new
/// connection per request
pub fn load_test(
    addr: SocketAddr,
    framing: Framing,
    clients: usize,
    duration: Duration,
) -> Result<LoadReport> {
    tracing::info!(
        "Starting load test with {} concurrent clients for {} seconds",
        clients,
        duration.as_secs_f64()
    );

    let (tx, rx) = channel::unbounded::<(String, LoadReport)>();
    let mut workers = Vec::with_capacity(clients);

    for i in 0..clients {
        let tx = tx.clone();
        let name = format!("Client-{}", i + 1);
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let report = client_worker(&name, addr, framing, duration);
                let _ = tx.send((name, report));
            })?;
        workers.push(worker);
    }
    drop(tx);

    let mut total = LoadReport::default();
    for (name, report) in rx.iter() {
        tracing::info!("{} completed {} requests", name, report.requests);
        total.merge(&report);
    }

    for worker in workers {
        if worker.join().is_err() {
            total.errors += 1;
        }
    }

    tracing::info!("Load test completed");
    Ok(total)
}

fn client_worker(name: &str, addr: SocketAddr, framing: Framing, duration: Duration) -> LoadReport {
    let mut rng = rand::thread_rng();
    let start = Instant::now();
    let mut report = LoadReport::default();

    while start.elapsed() < duration {
        let request = random_request(&mut rng);
        match single(addr, framing, &request) {
            Ok(_) => report.requests += 1,
            Err(e) => {
                tracing::warn!("{} error: {}", name, e);
                report.errors += 1;
            }
        }
        thread::sleep(Duration::from_secs_f64(rng.gen_range(0.01..0.1)));
    }

    report.elapsed = start.elapsed();
    report
}

/// Phased profiling scenario lasting roughly `total`
///
/// 1. Warm up: one persistent connection for 5 s
/// 2. CPU: 50 `compute` requests with inputs 25..=34, 200 ms apart
/// 3. Mixed: 3 load-test clients for whatever time remains
pub fn profile_scenario(addr: SocketAddr, framing: Framing, total: Duration) -> Result<LoadReport> {
    let start = Instant::now();
    let mut report = LoadReport::default();

    tracing::info!("Phase 1: Warm up...");
    report.merge(&persistent(
        addr,
        framing,
        Duration::from_secs(5),
        DEFAULT_PERSISTENT_PAUSE,
    )?);

    tracing::info!("Phase 2: CPU intensive load...");
    for i in 0..50 {
        match single(addr, framing, &Request::compute(25 + (i % 10))) {
            Ok(_) => report.requests += 1,
            Err(e) => {
                tracing::warn!("compute request failed: {}", e);
                report.errors += 1;
            }
        }
        thread::sleep(Duration::from_millis(200));
    }

    tracing::info!("Phase 3: Mixed concurrent load...");
    if let Some(remaining) = total.checked_sub(start.elapsed()) {
        report.merge(&load_test(addr, framing, 3, remaining)?);
    }

    report.elapsed = start.elapsed();
    Ok(report)
}

/// Resolve a `host:port` string to one socket address
///
/// IPv4 results win over IPv6 ones, matching the order the server binds
/// in, so `localhost` reaches a default server even where the resolver
/// lists `::1` first.
pub fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()?
        .min_by_key(|candidate| candidate.is_ipv6())
        .ok_or_else(|| FlameError::Config(format!("address '{}' resolved to nothing", addr)))
}
