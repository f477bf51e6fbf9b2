//! # Observability
//!
//! Prometheus metrics served on `/metrics`.

pub mod metrics;
