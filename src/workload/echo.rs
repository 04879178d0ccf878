//! Echo workload

use crate::protocol::Response;

/// Prefix every echo reply starts with
pub const ECHO_PREFIX: &str = "Echo: ";

/// Reply with the message prefixed by `"Echo: "`
pub fn echo(message: &str) -> Response {
    let mut response = String::with_capacity(ECHO_PREFIX.len() + message.len());
    response.push_str(ECHO_PREFIX);
    response.push_str(message);
    Response::echo(response)
}
