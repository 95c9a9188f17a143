//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client
//! and the server. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Placeholder shared secret shipped in the defaults.
pub const DEFAULT_BEARER_TOKEN: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WireConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Head and body size limits.
    pub limits: LimitsConfig,

    /// Bearer-token protection for a path prefix.
    pub auth: AuthConfig,

    /// Client behaviour (redirects, timeouts).
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            tls: None,
            max_connections: 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Server-side timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a keep-alive connection may sit idle between requests.
    pub idle_secs: u64,

    /// Upper bound on reading one full request (head and body).
    pub request_secs: u64,

    /// How long shutdown waits for in-flight connections.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_secs: 10,
            request_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

/// Message size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of a request line plus headers.
    pub max_head_bytes: usize,

    /// Maximum decoded request body size.
    pub max_body_bytes: usize,

    /// Accept `Transfer-Encoding: chunked` request bodies.
    pub accept_chunked_requests: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_head_bytes: 64 * 1024,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            accept_chunked_requests: true,
        }
    }
}

/// Shared-secret protection for a path prefix.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Paths starting with this prefix require the bearer token.
    /// Empty disables the check.
    pub secure_prefix: String,

    /// Token expected in `Authorization: Bearer <token>`.
    pub bearer_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secure_prefix: "/secure".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            bearer_token: DEFAULT_BEARER_TOKEN.to_string(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Redirects followed before the redirect response is returned as-is.
    pub max_redirects: u32,

    /// TCP connect (and TLS handshake) timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Timeout for writing one request and reading its response.
    pub request_timeout_secs: u64,

    /// Maximum response head size.
    pub max_head_bytes: usize,

    /// Maximum response body size before content decoding.
    pub max_body_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            max_head_bytes: 64 * 1024,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "h1wire=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}
