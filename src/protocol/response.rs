//! Response definitions
//!
//! Represents responses to clients. Every workload reply carries the
//! wall-clock time it was produced; error responses carry only a message.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::RequestKind;

/// Message sent for a `type` the dispatcher does not know
pub const UNKNOWN_REQUEST_TYPE: &str = "Unknown request type";

/// A successful workload reply, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reply {
    Echo {
        response: String,
        timestamp: f64,
    },
    Compute {
        input: i64,
        result: i64,
        timestamp: f64,
    },
    Hash {
        result: String,
        iterations: i64,
        timestamp: f64,
    },
    Slow {
        message: String,
        timestamp: f64,
    },
}

/// A response to send to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Reply(Reply),
    Error { error: String },
}

impl Response {
    pub fn echo(response: impl Into<String>) -> Self {
        Response::Reply(Reply::Echo {
            response: response.into(),
            timestamp: now(),
        })
    }

    pub fn compute(input: i64, result: i64) -> Self {
        Response::Reply(Reply::Compute {
            input,
            result,
            timestamp: now(),
        })
    }

    pub fn hash(result: impl Into<String>, iterations: i64) -> Self {
        Response::Reply(Reply::Hash {
            result: result.into(),
            iterations,
            timestamp: now(),
        })
    }

    pub fn slow(message: impl Into<String>) -> Self {
        Response::Reply(Reply::Slow {
            message: message.into(),
            timestamp: now(),
        })
    }

    /// Create an ERROR response
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    /// The fixed response for unrecognised request types
    pub fn unknown_type() -> Self {
        Response::error(UNKNOWN_REQUEST_TYPE)
    }

    /// Kind of request this answers, `None` for errors
    pub fn kind(&self) -> Option<RequestKind> {
        match self {
            Response::Reply(Reply::Echo { .. }) => Some(RequestKind::Echo),
            Response::Reply(Reply::Compute { .. }) => Some(RequestKind::Compute),
            Response::Reply(Reply::Hash { .. }) => Some(RequestKind::Hash),
            Response::Reply(Reply::Slow { .. }) => Some(RequestKind::Slow),
            Response::Error { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        match self {
            Response::Reply(Reply::Echo { timestamp, .. })
            | Response::Reply(Reply::Compute { timestamp, .. })
            | Response::Reply(Reply::Hash { timestamp, .. })
            | Response::Reply(Reply::Slow { timestamp, .. }) => Some(*timestamp),
            Response::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Seconds since the Unix epoch as a float
pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
