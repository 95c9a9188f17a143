//! Client error types.

use thiserror::Error;

use crate::wire::WireError;

/// Errors from one client exchange or redirect chain.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The URL (or a redirect `Location`) could not be used.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// TCP connection could not be established.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS setup or handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Connecting or the exchange exceeded its deadline.
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// The response could not be framed or decoded.
    #[error(transparent)]
    Wire(#[from] WireError),
}
