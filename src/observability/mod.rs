//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; a request ID flows through the
//!   middleware stack
//! - Metrics are cheap (atomic increments) and exposed for Prometheus
//!   scrape on a dedicated listener

pub mod metrics;
