//! Artificial delay workload
//!
//! Blocks only the calling connection's thread.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use crate::protocol::Response;

/// Text reported after sleeping for `delay`
pub fn slow_message(delay: impl Display) -> String {
    format!("Completed slow operation with {}s delay", delay)
}

/// Sleep for `duration`, then report `delay` as the client sent it
pub fn slow(duration: Duration, delay: impl Display) -> Response {
    thread::sleep(duration);
    Response::slow(slow_message(delay))
}
