//! Request middleware for the echo routes.

pub mod metrics;

pub use metrics::record_metrics;
