//! Dispatcher Module
//!
//! Turns one raw message into one encoded response.
//!
//! ## Responsibilities
//! - Decode the message into a typed [`Request`]
//! - Enforce the configured [`WorkloadLimits`]
//! - Route to the matching workload
//! - Convert every failure into a response value
//!
//! Nothing here returns an error: a connection only closes for transport
//! reasons, never because of what a client sent.

use crate::config::{Config, WorkloadLimits};
use crate::protocol::{encode_response, Request, RequestError, Response};
use crate::workload;

/// Routes decoded requests to workload handlers
///
/// Stateless apart from its limits; shared between connection threads
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    limits: WorkloadLimits,
    max_recursion_depth: u32,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(WorkloadLimits::default())
    }
}

impl Dispatcher {
    /// Create a dispatcher enforcing `limits` and the default recursion cap
    pub fn new(limits: WorkloadLimits) -> Self {
        Self {
            limits,
            max_recursion_depth: workload::DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    /// Create a dispatcher with the limits and recursion cap of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.limits).with_max_recursion_depth(config.max_recursion_depth)
    }

    pub fn with_max_recursion_depth(mut self, depth: u32) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn limits(&self) -> &WorkloadLimits {
        &self.limits
    }

    pub fn max_recursion_depth(&self) -> u32 {
        self.max_recursion_depth
    }

    /// Handle a raw message and return the encoded response
    pub fn dispatch(&self, raw: &[u8]) -> Vec<u8> {
        let response = self.handle(raw);
        encode_response(&response)
    }

    /// Handle a raw message and return the response value
    pub fn handle(&self, raw: &[u8]) -> Response {
        let text = String::from_utf8_lossy(raw);

        match Request::decode(&text) {
            Ok(request) => self.execute(request),
            Err(e) if e.is_malformed() => {
                tracing::trace!("Malformed request, echoing raw payload: {}", e);
                workload::echo(&text)
            }
            Err(RequestError::UnknownType(kind)) => {
                tracing::debug!(kind = %kind, "Unknown request type");
                Response::unknown_type()
            }
            Err(e) => {
                tracing::debug!("Rejected request: {}", e);
                Response::error(e.to_string())
            }
        }
    }

    /// Execute a decoded request
    pub fn execute(&self, request: Request) -> Response {
        tracing::trace!(kind = %request.kind(), "Executing request");

        match request {
            Request::Echo { message } => workload::echo(&message),

            Request::Compute { number } => {
                let checked = workload::check_recursion_depth(number, self.max_recursion_depth)
                    .and_then(|()| self.limits.check_fib_input(number));
                match checked {
                    Ok(()) => workload::compute(number),
                    Err(e) => Response::error(e.to_string()),
                }
            }

            Request::Hash { data, iterations } => {
                match self.limits.check_hash_iterations(iterations) {
                    Ok(()) => workload::hash(&data, iterations),
                    Err(e) => Response::error(e.to_string()),
                }
            }

            Request::Slow { delay } => {
                let duration = match delay.to_duration() {
                    Ok(duration) => duration,
                    Err(e) => return Response::error(e.to_string()),
                };
                if let Err(e) = self.limits.check_delay(delay.as_secs_f64()) {
                    return Response::error(e.to_string());
                }
                workload::slow(duration, &delay)
            }
        }
    }
}
