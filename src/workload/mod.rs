//! Workload Module
//!
//! The four simulated workloads behind the dispatcher.
//!
//! ## Workloads
//! - `echo`: string formatting only
//! - `compute`: naive double-recursive Fibonacci (CPU, deep call tree)
//! - `hash`: chained SHA-256 over hex digests (CPU, flat loop)
//! - `slow`: thread sleep (blocking I/O stand-in)
//!
//! Each handler is a plain function of its inputs plus the current time.
//! None of them share state, retry, or yield; the CPU-bound ones occupy
//! the connection's thread for their whole duration.

mod echo;
mod compute;
mod hash;
mod slow;

pub use echo::echo;
pub use compute::{check_recursion_depth, compute, fibonacci, DEFAULT_MAX_RECURSION_DEPTH};
pub use hash::{hash, iterated_sha256, HASH_RESULT_LEN};
pub use slow::{slow, slow_message};

use thiserror::Error;

use crate::config::WorkloadLimits;

/// A workload input above its configured cap
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{what} {value} exceeds the configured limit of {limit}")]
pub struct LimitExceeded {
    pub what: &'static str,
    pub value: String,
    pub limit: String,
}

impl WorkloadLimits {
    pub fn check_fib_input(&self, number: i64) -> Result<(), LimitExceeded> {
        match self.max_fib_input {
            Some(limit) if number > limit => Err(LimitExceeded {
                what: "Fibonacci input",
                value: number.to_string(),
                limit: limit.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn check_hash_iterations(&self, iterations: i64) -> Result<(), LimitExceeded> {
        match self.max_hash_iterations {
            Some(limit) if iterations > limit => Err(LimitExceeded {
                what: "Hash iteration count",
                value: iterations.to_string(),
                limit: limit.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn check_delay(&self, delay_secs: f64) -> Result<(), LimitExceeded> {
        match self.max_delay_secs {
            Some(limit) if delay_secs > limit => Err(LimitExceeded {
                what: "Delay",
                value: format!("{}s", delay_secs),
                limit: format!("{}s", limit),
            }),
            _ => Ok(()),
        }
    }
}
