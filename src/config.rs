//! Configuration for flameload
//!
//! Centralized configuration with defaults that reproduce the reference
//! behaviour: `localhost:8888`, one 1024-byte read per message, no timeouts
//! and no caps on workload inputs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FlameError, Result};
use crate::workload::DEFAULT_MAX_RECURSION_DEPTH;

/// Default connection thread stack size (8 MiB)
pub const DEFAULT_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Smallest accepted connection thread stack size (64 KiB)
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// Main configuration for a flameload server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Listener Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (host:port). Resolved at bind time.
    pub listen_addr: String,

    /// Listen backlog passed to listen(2)
    pub backlog: i32,

    /// How often the accept loop wakes up to check for shutdown (milliseconds).
    /// An idle loop sleeps this long between accepts, so it is also the worst
    /// case delay before a new connection is picked up.
    pub accept_poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// How message boundaries are found on the byte stream
    pub framing: Framing,

    /// Size of a single read. In `Raw` framing this caps the message size.
    pub read_buffer_size: usize,

    /// Longest accepted line in `Line` framing (bytes, excluding the newline)
    pub max_line_length: usize,

    /// Connection read timeout (milliseconds, 0 = wait forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = wait forever)
    pub write_timeout_ms: u64,

    /// Disable Nagle's algorithm on accepted sockets
    pub nodelay: bool,

    /// Stack size of each connection thread (bytes)
    pub stack_size: usize,

    // -------------------------------------------------------------------------
    // Workload Configuration
    // -------------------------------------------------------------------------
    /// Optional caps on workload inputs
    pub limits: WorkloadLimits,

    /// Hard cap on `compute` recursion depth, independent of `limits`.
    /// Must fit in `stack_size`.
    pub max_recursion_depth: u32,
}

/// Message framing on the connection byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// One `read()` of at most `read_buffer_size` bytes is one message.
    /// Larger payloads are truncated; responses carry no delimiter.
    #[default]
    Raw,

    /// Messages are terminated by `\n` (a preceding `\r` is stripped).
    /// Responses are written with a trailing `\n`.
    Line,
}

impl Framing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framing::Raw => "raw",
            Framing::Line => "line",
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Framing::Raw),
            "line" | "newline" => Ok(Framing::Line),
            other => Err(format!("unknown framing '{}' (expected 'raw' or 'line')", other)),
        }
    }
}

/// Caps on workload inputs
///
/// All unset by default: the naive Fibonacci and long hash chains are the
/// load being profiled. Test suites set them to keep inputs bounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorkloadLimits {
    /// Largest Fibonacci index accepted by `compute`
    pub max_fib_input: Option<i64>,

    /// Largest iteration count accepted by `hash`
    pub max_hash_iterations: Option<i64>,

    /// Longest delay accepted by `slow` (seconds)
    pub max_delay_secs: Option<f64>,
}

impl WorkloadLimits {
    /// No caps at all
    pub fn unbounded() -> Self {
        Self::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "localhost:8888".to_string(),
            backlog: 128,
            accept_poll_interval_ms: 50,
            framing: Framing::Raw,
            read_buffer_size: 1024,
            max_line_length: 64 * 1024, // 64 KB
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            nodelay: true,
            stack_size: DEFAULT_STACK_SIZE,
            limits: WorkloadLimits::default(),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values that would make the server unusable
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(FlameError::Config("read_buffer_size must be > 0".to_string()));
        }
        if self.max_line_length == 0 {
            return Err(FlameError::Config("max_line_length must be > 0".to_string()));
        }
        if self.backlog <= 0 {
            return Err(FlameError::Config(format!(
                "backlog must be positive, got {}",
                self.backlog
            )));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(FlameError::Config(format!(
                "stack_size must be at least {} bytes, got {}",
                MIN_STACK_SIZE, self.stack_size
            )));
        }
        if self.max_recursion_depth == 0 {
            return Err(FlameError::Config("max_recursion_depth must be > 0".to_string()));
        }
        if let Some(max) = self.limits.max_delay_secs {
            if !max.is_finite() || max < 0.0 {
                return Err(FlameError::Config(format!(
                    "max_delay_secs must be a non-negative number, got {}",
                    max
                )));
            }
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_interval_ms.max(1))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the listen address from separate host and port
    pub fn host_port(mut self, host: &str, port: u16) -> Self {
        self.config.listen_addr = format!("{}:{}", host, port);
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Set the accept loop's shutdown poll interval (in milliseconds)
    pub fn accept_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_interval_ms = ms;
        self
    }

    /// Set the message framing
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// Set the per-read buffer size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the maximum line length for line framing (in bytes)
    pub fn max_line_length(mut self, size: usize) -> Self {
        self.config.max_line_length = size;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Enable or disable TCP_NODELAY on accepted sockets
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Set the connection thread stack size (in bytes)
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = bytes;
        self
    }

    /// Set the hard cap on `compute` recursion depth
    pub fn max_recursion_depth(mut self, depth: u32) -> Self {
        self.config.max_recursion_depth = depth;
        self
    }

    /// Set all workload limits at once
    pub fn limits(mut self, limits: WorkloadLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Cap the Fibonacci index accepted by `compute`
    pub fn max_fib_input(mut self, max: i64) -> Self {
        self.config.limits.max_fib_input = Some(max);
        self
    }

    /// Cap the iteration count accepted by `hash`
    pub fn max_hash_iterations(mut self, max: i64) -> Self {
        self.config.limits.max_hash_iterations = Some(max);
        self
    }

    /// Cap the delay accepted by `slow` (in seconds)
    pub fn max_delay_secs(mut self, max: f64) -> Self {
        self.config.limits.max_delay_secs = Some(max);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
