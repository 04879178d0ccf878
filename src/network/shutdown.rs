//! Shutdown signalling
//!
//! A shared flag the accept loop polls, plus the ways to raise it:
//! explicitly, after a fixed run time, or on SIGINT/SIGTERM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{FlameError, Result};

/// Cloneable handle that stops a running server
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the server to stop accepting connections
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Trigger shutdown once `duration` has passed
    ///
    /// This is how a profiling run bounds the server's lifetime.
    pub fn shutdown_after(&self, duration: Duration) -> Result<JoinHandle<()>> {
        let handle = self.clone();
        let timer = thread::Builder::new()
            .name("flameload-timer".to_string())
            .spawn(move || {
                thread::sleep(duration);
                tracing::info!("Run time of {:?} elapsed, initiating shutdown", duration);
                handle.shutdown();
            })?;
        Ok(timer)
    }
}

/// Trigger shutdown on SIGINT or SIGTERM
///
/// Spawns a background thread that waits for the first signal.
#[cfg(unix)]
pub fn install_signal_handler(handle: ShutdownHandle) -> Result<JoinHandle<()>> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(FlameError::Signal)?;
    let waiter = thread::Builder::new()
        .name("flameload-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                tracing::info!(signal, "Received shutdown signal, initiating shutdown...");
                handle.shutdown();
            }
        })?;
    Ok(waiter)
}

/// Signals are not wired up on this platform; only explicit and timed
/// shutdown are available.
#[cfg(not(unix))]
pub fn install_signal_handler(_handle: ShutdownHandle) -> Result<JoinHandle<()>> {
    Err(FlameError::Signal(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "signal handling requires a unix platform",
    )))
}
