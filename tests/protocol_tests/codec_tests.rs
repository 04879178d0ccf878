//! Codec Tests
//!
//! Tests for message framing and JSON encoding.

use std::io::{self, Cursor, Read};

use flameload::config::{Config, Framing};
use flameload::protocol::{
    decode_response, encode_request, encode_response, write_message, MessageReader, Request,
    Response,
};
use flameload::FlameError;

// =============================================================================
// Helper Readers
// =============================================================================

/// Hands out the scripted chunks one read() at a time
struct ChunkedReader {
    chunks: Vec<io::Result<Vec<u8>>>,
}

impl ChunkedReader {
    fn new(chunks: Vec<io::Result<Vec<u8>>>) -> Self {
        let mut chunks = chunks;
        chunks.reverse();
        Self { chunks }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
        }
    }
}

fn raw_reader(bytes: &[u8], buffer: usize) -> MessageReader<Cursor<Vec<u8>>> {
    MessageReader::new(Cursor::new(bytes.to_vec()), Framing::Raw, buffer, 1024)
}

fn line_reader(bytes: &[u8], max_line: usize) -> MessageReader<Cursor<Vec<u8>>> {
    MessageReader::new(Cursor::new(bytes.to_vec()), Framing::Line, 16, max_line)
}

// =============================================================================
// Raw Framing Tests
// =============================================================================

#[test]
fn test_raw_single_read_is_one_message() {
    let payload = br#"{"type":"echo","message":"hi"}"#;
    let mut reader = raw_reader(payload, 1024);

    let message = reader.read_message().unwrap().unwrap();
    assert_eq!(&message[..], &payload[..]);
    assert!(reader.read_message().unwrap().is_none());
}

#[test]
fn test_raw_truncates_at_buffer_size() {
    let payload = vec![b'x'; 2000];
    let mut reader = raw_reader(&payload, 1024);

    let first = reader.read_message().unwrap().unwrap();
    let second = reader.read_message().unwrap().unwrap();
    assert_eq!(first.len(), 1024);
    assert_eq!(second.len(), 976);
    assert!(reader.read_message().unwrap().is_none());
}

#[test]
fn test_raw_empty_stream_is_closed() {
    let mut reader = raw_reader(b"", 1024);
    assert!(reader.read_message().unwrap().is_none());
}

#[test]
fn test_raw_retries_interrupted_reads() {
    let inner = ChunkedReader::new(vec![
        Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
        Ok(b"hello".to_vec()),
    ]);
    let mut reader = MessageReader::new(inner, Framing::Raw, 1024, 1024);

    let message = reader.read_message().unwrap().unwrap();
    assert_eq!(&message[..], b"hello");
}

#[test]
fn test_raw_reset_is_reported_as_disconnect() {
    let inner = ChunkedReader::new(vec![Err(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "reset by peer",
    ))]);
    let mut reader = MessageReader::new(inner, Framing::Raw, 1024, 1024);

    let err = reader.read_message().unwrap_err();
    assert!(err.is_disconnect());
    assert!(!err.is_timeout());
}

#[test]
fn test_reader_from_config_uses_read_buffer_size() {
    let config = Config::builder().read_buffer_size(4).build();
    let mut reader = MessageReader::from_config(Cursor::new(b"abcdef".to_vec()), &config);

    assert_eq!(reader.framing(), Framing::Raw);
    assert_eq!(&reader.read_message().unwrap().unwrap()[..], b"abcd");
    assert_eq!(&reader.read_message().unwrap().unwrap()[..], b"ef");
}

// =============================================================================
// Line Framing Tests
// =============================================================================

#[test]
fn test_line_splits_on_newlines() {
    let mut reader = line_reader(b"first\nsecond\r\nthird", 1024);

    assert_eq!(&reader.read_message().unwrap().unwrap()[..], b"first");
    assert_eq!(&reader.read_message().unwrap().unwrap()[..], b"second");
    // Unterminated trailing data is still delivered before close
    assert_eq!(&reader.read_message().unwrap().unwrap()[..], b"third");
    assert!(reader.read_message().unwrap().is_none());
}

#[test]
fn test_line_reassembles_across_reads() {
    let inner = ChunkedReader::new(vec![
        Ok(br#"{"type":"#.to_vec()),
        Ok(br#""compute","number":5}"#.to_vec()),
        Ok(b"\n".to_vec()),
    ]);
    let mut reader = MessageReader::new(inner, Framing::Line, 64, 1024);

    let message = reader.read_message().unwrap().unwrap();
    assert_eq!(&message[..], br#"{"type":"compute","number":5}"#);
    assert!(reader.read_message().unwrap().is_none());
}

#[test]
fn test_line_empty_line_is_a_message() {
    let mut reader = line_reader(b"\nnext\n", 1024);

    assert_eq!(&reader.read_message().unwrap().unwrap()[..], b"");
    assert_eq!(&reader.read_message().unwrap().unwrap()[..], b"next");
}

#[test]
fn test_line_too_long_is_protocol_error() {
    let payload = vec![b'a'; 100];
    let mut reader = line_reader(&payload, 32);

    match reader.read_message() {
        Err(FlameError::Protocol(msg)) => assert!(msg.contains("32")),
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_write_raw_has_no_delimiter() {
    let mut out = Vec::new();
    write_message(&mut out, Framing::Raw, b"{}").unwrap();
    assert_eq!(out, b"{}");
}

#[test]
fn test_write_line_appends_newline() {
    let mut out = Vec::new();
    write_message(&mut out, Framing::Line, b"{}").unwrap();
    write_message(&mut out, Framing::Line, b"[]").unwrap();
    assert_eq!(out, b"{}\n[]\n");
}

// =============================================================================
// JSON Encoding Tests
// =============================================================================

#[test]
fn test_encode_unknown_type_response_exact() {
    let bytes = encode_response(&Response::unknown_type());
    assert_eq!(bytes, br#"{"error":"Unknown request type"}"#);
}

#[test]
fn test_encode_echo_response_shape() {
    let bytes = encode_response(&Response::echo("Echo: hi"));
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["type"], "echo");
    assert_eq!(value["response"], "Echo: hi");
    assert!(value["timestamp"].as_f64().unwrap() > 0.0);
    assert_eq!(value.as_object().unwrap().len(), 3);
}

#[test]
fn test_encode_compute_response_shape() {
    let bytes = encode_response(&Response::compute(10, 55));
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["type"], "compute");
    assert_eq!(value["input"], 10);
    assert_eq!(value["result"], 55);
    assert!(value["timestamp"].is_f64());
}

#[test]
fn test_decode_response_distinguishes_errors() {
    let reply = decode_response(br#"{"type":"hash","result":"abc","iterations":3,"timestamp":1.5}"#)
        .unwrap();
    assert!(!reply.is_error());
    assert_eq!(reply.timestamp(), Some(1.5));

    let error = decode_response(br#"{"error":"Unknown request type"}"#).unwrap();
    assert_eq!(error, Response::unknown_type());
    assert_eq!(error.timestamp(), None);
}

#[test]
fn test_encode_request_is_tagged() {
    let bytes = encode_request(&Request::hash("abc", 3)).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["type"], "hash");
    assert_eq!(value["data"], "abc");
    assert_eq!(value["iterations"], 3);
}
