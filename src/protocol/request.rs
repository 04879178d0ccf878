//! Request definitions
//!
//! Represents typed requests from clients and their decoding rules.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

/// Default Fibonacci index for `compute`
pub const DEFAULT_FIB_INPUT: i64 = 1000;

/// Default input for `hash`
pub const DEFAULT_HASH_DATA: &str = "default";

/// Default iteration count for `hash`
pub const DEFAULT_HASH_ITERATIONS: i64 = 10_000;

/// Default delay for `slow` (seconds)
pub const DEFAULT_DELAY_SECS: f64 = 0.1;

/// Request kinds understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Echo,
    Compute,
    Hash,
    Slow,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Echo => "echo",
            RequestKind::Compute => "compute",
            RequestKind::Hash => "hash",
            RequestKind::Slow => "slow",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "echo" => Ok(RequestKind::Echo),
            "compute" => Ok(RequestKind::Compute),
            "hash" => Ok(RequestKind::Hash),
            "slow" => Ok(RequestKind::Slow),
            other => Err(RequestError::UnknownType(other.to_string())),
        }
    }
}

/// A decoded request
///
/// Fields missing from the JSON object take their documented defaults.
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    /// Echo a message back
    Echo {
        #[serde(default)]
        message: String,
    },

    /// Naive recursive Fibonacci of `number`
    Compute {
        #[serde(default = "default_fib_input")]
        number: i64,
    },

    /// SHA-256 chained `iterations` times starting from `data`
    Hash {
        #[serde(default = "default_hash_data")]
        data: String,
        #[serde(default = "default_hash_iterations")]
        iterations: i64,
    },

    /// Sleep for `delay` seconds
    Slow {
        #[serde(default)]
        delay: Delay,
    },
}

fn default_fib_input() -> i64 {
    DEFAULT_FIB_INPUT
}

fn default_hash_data() -> String {
    DEFAULT_HASH_DATA.to_string()
}

fn default_hash_iterations() -> i64 {
    DEFAULT_HASH_ITERATIONS
}

impl Request {
    /// Decode a request from message text
    ///
    /// A missing `type` means `echo`. Anything that is not a JSON object is
    /// reported as malformed so the caller can fall back to a raw echo.
    pub fn decode(text: &str) -> Result<Self, RequestError> {
        let mut value: Value = serde_json::from_str(text).map_err(RequestError::Malformed)?;
        let object = value.as_object_mut().ok_or(RequestError::NotAnObject)?;

        let kind = match object.get("type") {
            None => RequestKind::Echo,
            Some(Value::String(s)) => s.parse::<RequestKind>()?,
            Some(other) => return Err(RequestError::UnknownType(other.to_string())),
        };
        object.insert("type".to_string(), Value::from(kind.as_str()));

        serde_json::from_value(value).map_err(RequestError::InvalidFields)
    }

    /// Get the request kind
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Echo { .. } => RequestKind::Echo,
            Request::Compute { .. } => RequestKind::Compute,
            Request::Hash { .. } => RequestKind::Hash,
            Request::Slow { .. } => RequestKind::Slow,
        }
    }

    pub fn echo(message: impl Into<String>) -> Self {
        Request::Echo {
            message: message.into(),
        }
    }

    pub fn compute(number: i64) -> Self {
        Request::Compute { number }
    }

    pub fn hash(data: impl Into<String>, iterations: i64) -> Self {
        Request::Hash {
            data: data.into(),
            iterations,
        }
    }

    pub fn slow(delay_secs: f64) -> Self {
        Request::Slow {
            delay: Delay::from_secs_f64(delay_secs),
        }
    }
}

/// Delay requested by `slow`, in seconds
///
/// Keeps the JSON number as sent so the reply message shows `1` for an
/// integer and `0.25` for a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delay(Number);

impl Delay {
    /// Build a delay from seconds. Non-finite values collapse to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        Number::from_f64(secs).map_or_else(|| Delay(Number::from(0u8)), Delay)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or(0.0)
    }

    /// Convert to a sleepable duration, rejecting negative or oversized values
    pub fn to_duration(&self) -> Result<Duration, RequestError> {
        let secs = self.as_secs_f64();
        if secs < 0.0 {
            return Err(RequestError::InvalidDelay(self.to_string()));
        }
        Duration::try_from_secs_f64(secs).map_err(|_| RequestError::InvalidDelay(self.to_string()))
    }
}

impl Default for Delay {
    fn default() -> Self {
        Delay::from_secs_f64(DEFAULT_DELAY_SECS)
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Why a message could not become a [`Request`]
#[derive(Debug, Error)]
pub enum RequestError {
    /// Not valid JSON (including truncated JSON)
    #[error("malformed request: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Valid JSON, but not an object
    #[error("request is not a JSON object")]
    NotAnObject,

    #[error("Unknown request type")]
    UnknownType(String),

    /// Known type, but a field has the wrong shape
    #[error("Invalid request: {0}")]
    InvalidFields(#[source] serde_json::Error),

    #[error("Invalid request: delay {0} is not a non-negative number of seconds")]
    InvalidDelay(String),
}

impl RequestError {
    /// True for payloads that should be echoed back verbatim
    pub fn is_malformed(&self) -> bool {
        matches!(self, RequestError::Malformed(_) | RequestError::NotAnObject)
    }
}
