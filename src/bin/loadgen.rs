//! flameload Load Generator
//!
//! Command-line traffic source for a running flameload server.

use std::time::Duration;

use clap::{Parser, Subcommand};
use flameload::loadgen::{self, LoadReport};
use flameload::protocol::{Request, Response};
use flameload::{Client, Framing};
use tracing_subscriber::{fmt, EnvFilter};

/// flameload load generator
#[derive(Parser, Debug)]
#[command(name = "flameload-loadgen")]
#[command(about = "Load generator for the flameload server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "localhost:8888")]
    server: String,

    /// Message framing (must match the server)
    #[arg(short, long, default_value = "raw")]
    framing: Framing,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send an echo request
    Echo {
        /// Message to echo
        #[arg(default_value = "Hello from single client!")]
        message: String,
    },

    /// Send a compute (Fibonacci) request
    Compute {
        /// Fibonacci index
        number: i64,
    },

    /// Send a hash request
    Hash {
        /// Input data
        #[arg(default_value = "default")]
        data: String,

        /// Number of SHA-256 rounds
        #[arg(short, long, default_value = "10000")]
        iterations: i64,
    },

    /// Send a slow request
    Slow {
        /// Delay in seconds
        #[arg(default_value = "0.1")]
        delay: f64,
    },

    /// Send a payload verbatim
    Raw {
        /// Bytes to send
        payload: String,
    },

    /// Keep one connection open and send random requests
    Persistent {
        /// Duration in seconds
        #[arg(short, long, default_value = "30")]
        duration: u64,
    },

    /// Run concurrent clients, one connection per request
    Load {
        /// Number of concurrent clients
        #[arg(short, long, default_value = "5")]
        clients: usize,

        /// Duration in seconds
        #[arg(short, long, default_value = "20")]
        duration: u64,
    },

    /// Warm-up, CPU and mixed phases back to back
    Scenario {
        /// Total duration in seconds
        #[arg(short, long, default_value = "45")]
        duration: u64,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> flameload::Result<()> {
    let addr = loadgen::resolve(&args.server)?;
    let framing = args.framing;

    let request = match args.command {
        Commands::Echo { message } => Request::echo(message),
        Commands::Compute { number } => Request::compute(number),
        Commands::Hash { data, iterations } => Request::hash(data, iterations),
        Commands::Slow { delay } => Request::slow(delay),
        Commands::Raw { payload } => {
            let mut client = Client::connect(addr, framing)?;
            let reply = client.send_raw(payload.as_bytes())?;
            println!("Response: {}", String::from_utf8_lossy(&reply));
            return client.close();
        }
        Commands::Persistent { duration } => {
            let report = loadgen::persistent(
                addr,
                framing,
                Duration::from_secs(duration),
                loadgen::DEFAULT_PERSISTENT_PAUSE,
            )?;
            print_report(&report);
            return Ok(());
        }
        Commands::Load { clients, duration } => {
            let report = loadgen::load_test(addr, framing, clients, Duration::from_secs(duration))?;
            print_report(&report);
            return Ok(());
        }
        Commands::Scenario { duration } => {
            let report = loadgen::profile_scenario(addr, framing, Duration::from_secs(duration))?;
            print_report(&report);
            return Ok(());
        }
    };

    let response: Response = loadgen::single(addr, framing, &request)?;
    println!("Response: {}", serde_json::to_string(&response)?);
    Ok(())
}

fn print_report(report: &LoadReport) {
    println!(
        "{} requests, {} errors in {:.1}s ({:.1} req/s)",
        report.requests,
        report.errors,
        report.elapsed.as_secs_f64(),
        report.throughput()
    );
}
