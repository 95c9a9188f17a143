//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → WireConfig (validated, immutable)
//!     → shared via Arc to the server, cloned into the client
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the bearer token is read once at
//!   startup and never changes afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AuthConfig, ClientConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig,
    TlsConfig, WireConfig,
};
