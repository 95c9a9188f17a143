//! HTTP/1.1 client subsystem.
//!
//! # Data Flow
//! ```text
//! URL string
//!     → url.rs (ParsedUrl: scheme, host, port, path)
//!     → session.rs (new socket per attempt, optional TLS via tls.rs)
//!     → wire (encode request, decode response head/body/content)
//!     → redirect? rewrite request, resolve Location, loop
//!     → Response
//! ```
//!
//! # Design Decisions
//! - No connection reuse: each attempt, redirects included, owns its socket
//! - Redirects are a bounded loop, never recursion
//! - A failed attempt is never retried

pub mod error;
pub mod session;
pub mod tls;
pub mod url;

pub use error::ClientError;
pub use session::{Client, Response};
pub use url::{ParsedUrl, Scheme};
