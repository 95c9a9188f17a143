//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits sane)
//! - Check addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WireConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::WireConfig;

/// Smallest head limit that still fits a realistic request line and headers.
const MIN_HEAD_BYTES: usize = 1024;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &WireConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        fail(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        );
    }
    if config.listener.max_connections == 0 {
        fail("listener.max_connections", "must be greater than 0".into());
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            fail("listener.tls", "cert_path and key_path are both required".into());
        }
    }

    if config.timeouts.idle_secs == 0 {
        fail("timeouts.idle_secs", "must be greater than 0".into());
    }
    if config.timeouts.request_secs == 0 {
        fail("timeouts.request_secs", "must be greater than 0".into());
    }

    if config.limits.max_head_bytes < MIN_HEAD_BYTES {
        fail(
            "limits.max_head_bytes",
            format!("must be at least {MIN_HEAD_BYTES}"),
        );
    }

    if !config.auth.secure_prefix.is_empty() {
        if !config.auth.secure_prefix.starts_with('/') {
            fail("auth.secure_prefix", "must start with '/'".into());
        }
        if config.auth.bearer_token.trim().is_empty() {
            fail(
                "auth.bearer_token",
                "required when secure_prefix is set".into(),
            );
        }
    }

    if config.client.connect_timeout_secs == 0 {
        fail("client.connect_timeout_secs", "must be greater than 0".into());
    }
    if config.client.request_timeout_secs == 0 {
        fail("client.request_timeout_secs", "must be greater than 0".into());
    }
    if config.client.max_head_bytes < MIN_HEAD_BYTES {
        fail(
            "client.max_head_bytes",
            format!("must be at least {MIN_HEAD_BYTES}"),
        );
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        fail(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
