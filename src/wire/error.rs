//! Wire-level error taxonomy.
//!
//! Every failure while delimiting or decoding an HTTP/1.1 message lands in
//! [`WireError`]. The server uses [`WireError::status_hint`] to decide
//! whether a response can still be written before the connection closes.

use thiserror::Error;

/// Errors raised while reading, framing or decoding a message.
#[derive(Debug, Error)]
pub enum WireError {
    /// Status line, request line or a header line failed to parse.
    #[error("Malformed message head: {0}")]
    MalformedHead(String),

    /// The peer closed the stream before the message was complete.
    #[error("Stream closed after {received} bytes before the message was complete")]
    TruncatedStream { received: usize },

    /// A chunk size line was not hexadecimal, or chunk data was cut short.
    #[error("Invalid chunked framing: {0}")]
    ChunkFraming(String),

    /// The declared Content-Encoding does not match the body bytes.
    #[error("Failed to decode {encoding} content: {source}")]
    ContentDecoding {
        encoding: String,
        #[source]
        source: std::io::Error,
    },

    /// Both Transfer-Encoding and Content-Length are present.
    #[error("Ambiguous framing: both Transfer-Encoding and Content-Length are present")]
    AmbiguousFraming,

    /// Content-Length is not a non-negative integer, or duplicates disagree.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// A transfer coding the receiver cannot frame (requests only).
    #[error("Unsupported transfer coding: {0}")]
    UnsupportedTransferCoding(String),

    /// A chunked request body arrived while chunked requests are disabled.
    #[error("Chunked request bodies are not accepted")]
    ChunkedRequestRefused,

    /// The message head grew past the configured limit.
    #[error("Message head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    /// The message body grew past the configured limit.
    #[error("Message body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Status code a server should answer with before closing, if any.
    ///
    /// `None` means the peer is gone or the failure happened after the
    /// request was fully read, so the connection is closed silently.
    pub fn status_hint(&self) -> Option<u16> {
        match self {
            WireError::MalformedHead(_)
            | WireError::AmbiguousFraming
            | WireError::InvalidContentLength(_)
            | WireError::ChunkFraming(_) => Some(400),
            WireError::UnsupportedTransferCoding(_) => Some(501),
            WireError::ChunkedRequestRefused => Some(411),
            WireError::HeadTooLarge { .. } => Some(431),
            WireError::BodyTooLarge { .. } => Some(413),
            WireError::TruncatedStream { .. }
            | WireError::ContentDecoding { .. }
            | WireError::Io(_) => None,
        }
    }

    /// True when the error means the peer went away mid-message.
    pub fn is_truncation(&self) -> bool {
        matches!(self, WireError::TruncatedStream { .. })
    }
}
