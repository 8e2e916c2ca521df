//! Framed JSON messages over a byte stream.
//!
//! Wire format: 2-byte magic ("PV") + 4-byte little-endian payload length +
//! JSON payload. Values travel as `f64`, which is exact for the supported
//! integer kinds; element-kind conversion happens in the carrier layer, not
//! on the wire.

use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::time::{Duration, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use pvserve_carrier::Leaf;
use pvserve_channel::{ConversionError, EVENT_LOG, EVENT_VALUE};

/// Message header: magic (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "PV" (0x50 0x56).
pub const MAGIC: [u8; 2] = [0x50, 0x56];

/// Default maximum payload size: 256 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 256 * 1024;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Errors that can occur encoding/decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The message header contains an invalid magic number.
    #[error("invalid message magic (expected 0x5056 \"PV\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("message I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,

    /// The payload is not valid JSON for the expected message.
    #[error("message payload error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;

/// Derived-metadata fields a `get` may request alongside the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MetaField {
    HighLimit,
    LowLimit,
}

/// Event categories a connection may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Value,
    Log,
}

impl EventKind {
    pub fn mask(self) -> u8 {
        match self {
            EventKind::Value => EVENT_VALUE,
            EventKind::Log => EVENT_LOG,
        }
    }
}

/// Client-to-server request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Read a channel's value, optionally with derived metadata.
    Get {
        name: String,
        #[serde(default)]
        meta: Vec<MetaField>,
        #[serde(default)]
        count: Option<usize>,
    },
    /// Write a channel's value.
    Put { name: String, values: Vec<f64> },
    /// Register this connection for change notifications.
    ///
    /// An empty event list subscribes to all categories.
    Subscribe {
        #[serde(default)]
        events: Vec<EventKind>,
    },
}

/// Error classification carried in negative acknowledgments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unsupported,
    NoMemory,
    SizeMismatch,
    NotFound,
    BadRequest,
}

impl From<&ConversionError> for ErrorKind {
    fn from(err: &ConversionError) -> Self {
        match err {
            ConversionError::Unsupported => ErrorKind::Unsupported,
            ConversionError::NoMemory => ErrorKind::NoMemory,
            ConversionError::SizeMismatch { .. } => ErrorKind::SizeMismatch,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::NoMemory => "no_memory",
            ErrorKind::SizeMismatch => "size_mismatch",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
        };
        f.write_str(name)
    }
}

/// A channel value plus quality metadata, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBody {
    pub name: String,
    pub kind: String,
    pub values: Vec<f64>,
    pub severity: u16,
    pub status: u16,
    pub timestamp_secs: u64,
    pub timestamp_nanos: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_limit: Option<f64>,
}

impl ValueBody {
    /// Build a wire body from a filled value leaf.
    pub fn from_leaf(name: &str, leaf: &Leaf) -> Self {
        let (timestamp_secs, timestamp_nanos) = leaf
            .stamp()
            .and_then(|stamp| stamp.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| (elapsed.as_secs(), elapsed.subsec_nanos()))
            .unwrap_or((0, 0));
        Self {
            name: name.to_string(),
            kind: leaf.kind().name().to_string(),
            values: leaf.values_f64(),
            severity: leaf.severity().code(),
            status: leaf.status().code(),
            timestamp_secs,
            timestamp_nanos,
            high_limit: None,
            low_limit: None,
        }
    }
}

/// Server-to-client response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Successful read.
    Value(ValueBody),
    /// Successful write or subscription.
    Ok,
    /// Negative acknowledgment for one request.
    Error { kind: ErrorKind, message: String },
    /// Change notification pushed to a subscribed connection.
    Event { mask: u8, value: ValueBody },
}

/// Encode one message into the wire format.
pub fn encode_message(
    payload: &impl Serialize,
    dst: &mut BytesMut,
    max_payload: usize,
) -> Result<()> {
    let body = serde_json::to_vec(payload)?;
    if body.len() > max_payload {
        return Err(WireError::PayloadTooLarge {
            size: body.len(),
            max: max_payload,
        });
    }
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(body.len() as u32);
    dst.put_slice(&body);
    Ok(())
}

/// Decode one message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer.
pub fn decode_message<M: DeserializeOwned>(
    src: &mut BytesMut,
    max_payload: usize,
) -> Result<Option<M>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(WireError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    if payload_len > max_payload {
        return Err(WireError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len);
    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete messages.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    max_payload: usize,
}

impl<T: Read> MessageReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(WireError::ConnectionClosed)` when EOF is reached.
    pub fn read_message<M: DeserializeOwned>(&mut self) -> Result<M> {
        loop {
            if let Some(message) = decode_message(&mut self.buf, self.max_payload)? {
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == IoErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                return Err(WireError::ConnectionClosed);
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next complete message if one is available (non-blocking).
    ///
    /// Returns `Ok(None)` when the stream would block before a complete
    /// message is buffered.
    pub fn try_read_message<M: DeserializeOwned>(&mut self) -> Result<Option<M>> {
        loop {
            if let Some(message) = decode_message(&mut self.buf, self.max_payload)? {
                return Ok(Some(message));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == IoErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == IoErrorKind::WouldBlock
                        || err.kind() == IoErrorKind::TimedOut =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}

/// Writes complete messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    max_payload: usize,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Encode and write one message, retrying short and would-block writes.
    pub fn write_message(&mut self, payload: &impl Serialize) -> Result<()> {
        let mut buf = BytesMut::new();
        encode_message(payload, &mut buf, self.max_payload)?;

        let mut remaining = &buf[..];
        while !remaining.is_empty() {
            match self.inner.write(remaining) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => remaining = &remaining[n..],
                Err(err) if err.kind() == IoErrorKind::Interrupted => continue,
                Err(err) if err.kind() == IoErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        match self.inner.flush() {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == IoErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(WireError::Io(err)),
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}
