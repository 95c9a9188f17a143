//! HTTP/1.1 wire toolkit: a framing-aware client and a keep-alive server
//! built on the same message codec.

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;
pub mod wire;

pub use client::{Client, ParsedUrl};
pub use config::WireConfig;
pub use lifecycle::Shutdown;
pub use server::Server;
