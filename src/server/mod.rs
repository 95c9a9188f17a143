//! HTTP/1.1 server subsystem.
//!
//! # Data Flow
//! ```text
//! Listener::accept
//!     → dispatcher.rs (one task per connection, optional TLS handshake)
//!     → wire (read head, select framing, read body)
//!     → auth.rs (bearer token check for the secure prefix)
//!     → handlers.rs (method-based response)
//!     → dispatcher.rs (version echo, Connection header, write, keep-alive)
//! ```
//!
//! # Design Decisions
//! - Requests on one connection are strictly serialized
//! - Connection tasks share only immutable, Arc-held state
//! - A fault in one connection never reaches the accept loop

pub mod auth;
pub mod dispatcher;
pub mod handlers;

pub use auth::BearerGuard;
pub use dispatcher::Server;
pub use handlers::{DemoHandler, Handler, HandlerError, IncomingRequest};
