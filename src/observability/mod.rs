//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Echo handler
//!     → logging.rs (structured log events, request ID in the trace span)
//!     → metrics.rs (request counter, latency histogram)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → GET /metrics (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
