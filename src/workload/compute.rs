//! Fibonacci workload
//!
//! Deliberately the exponential double recursion: the point is a deep,
//! wide call tree for the profiler to sample. Recursion depth equals the
//! input and the work grows as O(φ^n).

use crate::protocol::Response;

use super::LimitExceeded;

/// Deepest recursion `compute` will start by default
///
/// Keeps the call chain well inside a connection thread's stack. Inputs
/// this large never finish anyway; larger ones would overflow the stack
/// and abort the whole process.
pub const DEFAULT_MAX_RECURSION_DEPTH: u32 = 10_000;

/// n-th Fibonacci number by naive recursion
///
/// `fib(n) = n` for `n <= 1`, so negative inputs come back unchanged.
pub fn fibonacci(n: i64) -> i64 {
    if n <= 1 {
        return n;
    }
    fibonacci(n - 1) + fibonacci(n - 2)
}

/// Reject inputs whose recursion would go deeper than `max_depth` frames
pub fn check_recursion_depth(number: i64, max_depth: u32) -> Result<(), LimitExceeded> {
    if number > i64::from(max_depth) {
        return Err(LimitExceeded {
            what: "Fibonacci recursion depth",
            value: number.to_string(),
            limit: max_depth.to_string(),
        });
    }
    Ok(())
}

/// Compute `fib(number)` and report it with the input
pub fn compute(number: i64) -> Response {
    let result = fibonacci(number);
    Response::compute(number, result)
}
