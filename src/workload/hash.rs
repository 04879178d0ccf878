//! Iterative hashing workload

use sha2::{Digest, Sha256};

use crate::protocol::Response;

/// Number of characters of the final digest returned to the client
pub const HASH_RESULT_LEN: usize = 32;

/// Apply SHA-256 `iterations` times, each round hashing the previous
/// round's lowercase hex digest. Starts from `data`.
///
/// With `iterations <= 0` the input is returned unchanged.
pub fn iterated_sha256(data: &str, iterations: i64) -> String {
    let mut current = data.to_string();
    for _ in 0..iterations.max(0) {
        let digest = Sha256::digest(current.as_bytes());
        current = format!("{:x}", digest);
    }
    current
}

/// Hash `data` `iterations` times and return the first 32 characters
pub fn hash(data: &str, iterations: i64) -> Response {
    let digest = iterated_sha256(data, iterations);
    let result: String = digest.chars().take(HASH_RESULT_LEN).collect();
    Response::hash(result, iterations)
}
