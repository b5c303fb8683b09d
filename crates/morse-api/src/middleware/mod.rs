//! # Middleware Stack
//!
//! - [`metrics`]: request counters and latency histograms, plus the
//!   Prometheus scrape handler.
//!
//! Request tracing and CORS come from `tower-http` layers applied in
//! [`crate::app`].

pub mod metrics;
