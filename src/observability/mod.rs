//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / client session / connection tracker
//!     → logging.rs (structured events with connection and request IDs)
//!     → metrics.rs (counters, gauges, histograms)
//! ```
//!
//! # Design Decisions
//! - Request ID (UUID v4) and connection ID attached to every server span
//! - Metrics are cheap facade calls; the exporter is opt-in

pub mod logging;
pub mod metrics;
