//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (JSON objects)
//!
//! ### Request Format
//! ```text
//! { "type": "echo",    "message": string }
//! { "type": "compute", "number": int }
//! { "type": "hash",    "data": string, "iterations": int }
//! { "type": "slow",    "delay": float }
//! ```
//! A missing `type` means `echo`. Payloads that are not JSON objects are
//! answered as an echo of the raw text.
//!
//! ### Response Format
//! ```text
//! { "type": "echo",    "response": string, "timestamp": float }
//! { "type": "compute", "input": int, "result": int, "timestamp": float }
//! { "type": "hash",    "result": string, "iterations": int, "timestamp": float }
//! { "type": "slow",    "message": string, "timestamp": float }
//! { "error": string }
//! ```
//!
//! Message boundaries are described in [`codec`].

mod request;
mod response;
pub mod codec;

pub use request::{
    Delay, Request, RequestError, RequestKind, DEFAULT_DELAY_SECS, DEFAULT_FIB_INPUT,
    DEFAULT_HASH_DATA, DEFAULT_HASH_ITERATIONS,
};
pub use response::{now, Reply, Response, UNKNOWN_REQUEST_TYPE};
pub use codec::{decode_response, encode_request, encode_response, write_message, MessageReader};
