//! HTTP/1.1 message framing shared by the client and the server.
//!
//! # Data Flow
//! ```text
//! outgoing:  OutgoingRequest / OutgoingResponse
//!     → framer.rs (start line + headers + blank line + body bytes)
//!     → socket write
//!
//! incoming:  socket
//!     → reader.rs (read_until CRLFCRLF, look-ahead buffer kept)
//!     → framer.rs (decode head)
//!     → body.rs (select framing, read body under a size limit)
//!     → content.rs (undo Content-Encoding, decode charset)
//! ```
//!
//! # Design Decisions
//! - Framing selection is pure and never guesses: conflicting length
//!   indicators are an error
//! - Running out of bytes mid-message is always an error, except for a
//!   close-delimited body
//! - Nothing in this module opens sockets; any `AsyncRead` works

pub mod body;
pub mod chunked;
pub mod content;
pub mod error;
pub mod framer;
pub mod headers;
pub mod message;
pub mod reader;

pub use body::{read_body, Framing};
pub use content::Payload;
pub use error::WireError;
pub use headers::Headers;
pub use message::{Method, OutgoingRequest, OutgoingResponse, RequestHead, ResponseHead};
pub use reader::StreamReader;
