//! Observability subsystem.
//!
//! Structured logs via `tracing`, request metrics via the `metrics` facade
//! with an optional Prometheus exporter. Both are initialized once from
//! `main`; the core never depends on log formatting or destination.

pub mod logging;
pub mod metrics;
