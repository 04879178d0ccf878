//! flameload Server Binary
//!
//! Starts the TCP server, optionally for a fixed run time.

use std::time::Duration;

use clap::Parser;
use flameload::network::{install_signal_handler, Server};
use flameload::{Config, Framing};
use tracing_subscriber::{fmt, EnvFilter};

/// flameload Server
#[derive(Parser, Debug)]
#[command(name = "flameload-server")]
#[command(about = "Request/response TCP server that generates load for profiling")]
#[command(version)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to bind
    #[arg(short, long, default_value = "8888")]
    port: u16,

    /// Message framing: raw (one read per message) or line (newline-delimited)
    #[arg(short, long, default_value = "raw")]
    framing: Framing,

    /// Bytes per read; in raw framing this is the maximum message size
    #[arg(long, default_value = "1024")]
    read_buffer_size: usize,

    /// Maximum line length in line framing
    #[arg(long, default_value = "65536")]
    max_line_length: usize,

    /// Close connections idle for this many milliseconds (0 = never)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Stack size of each connection thread in KiB
    #[arg(long, default_value = "8192")]
    stack_size_kib: usize,

    /// Hard cap on compute recursion depth; must fit in the thread stack
    #[arg(long, default_value = "10000")]
    max_recursion_depth: u32,

    /// Largest Fibonacci index accepted by compute requests
    #[arg(long)]
    max_fib: Option<i64>,

    /// Largest iteration count accepted by hash requests
    #[arg(long)]
    max_hash_iterations: Option<i64>,

    /// Longest delay in seconds accepted by slow requests
    #[arg(long)]
    max_delay: Option<f64>,

    /// Stop accepting after this many seconds (default: run until signalled)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Seconds to wait for open connections to finish after shutdown
    #[arg(long, default_value = "5")]
    grace_secs: f64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flameload=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("flameload Server v{}", flameload::VERSION);
    tracing::info!("Listen address: {}:{}", args.host, args.port);
    tracing::info!("Framing: {}", args.framing);

    // Build config from args
    let mut builder = Config::builder()
        .host_port(&args.host, args.port)
        .framing(args.framing)
        .read_buffer_size(args.read_buffer_size)
        .max_line_length(args.max_line_length)
        .read_timeout_ms(args.read_timeout_ms)
        .stack_size(args.stack_size_kib.saturating_mul(1024))
        .max_recursion_depth(args.max_recursion_depth);
    if let Some(max) = args.max_fib {
        builder = builder.max_fib_input(max);
    }
    if let Some(max) = args.max_hash_iterations {
        builder = builder.max_hash_iterations(max);
    }
    if let Some(max) = args.max_delay {
        builder = builder.max_delay_secs(max);
    }
    let config = builder.build();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    let registry = server.registry();

    if let Err(e) = install_signal_handler(shutdown.clone()) {
        tracing::warn!("Signal handling unavailable: {}", e);
    }

    if let Some(secs) = args.duration {
        match Duration::try_from_secs_f64(secs) {
            Ok(duration) => {
                tracing::info!("Running for {:.1} seconds", secs);
                if let Err(e) = shutdown.shutdown_after(duration) {
                    tracing::error!("Failed to start run timer: {}", e);
                    std::process::exit(1);
                }
            }
            Err(e) => {
                tracing::error!("Invalid --duration {}: {}", secs, e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    // Let in-flight connections finish
    let grace = Duration::try_from_secs_f64(args.grace_secs).unwrap_or_default();
    if !registry.wait_idle(grace) {
        tracing::warn!(
            "{} connection(s) still open after {:.1}s grace period",
            registry.open_connections(),
            grace.as_secs_f64()
        );
    }

    let stats = registry.stats();
    tracing::info!(
        accepted = stats.accepted,
        closed = stats.closed,
        requests = stats.requests,
        "Server stopped"
    );
}
