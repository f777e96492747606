//! Liveness and readiness probes.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     HealthConfig.readiness_delay_secs → Readiness (start instant + delay)
//!
//! GET /healthz/live  → 200 while the process serves requests
//! GET /healthz/ready → 503 until the delay has elapsed, then 200
//! ```
//!
//! # Design Decisions
//! - Probes carry their own router state and are merged into the main router
//! - Probe requests bypass the echo handler and its metrics

pub mod probes;

pub use probes::{probe_routes, Readiness, LIVENESS_PATH, READINESS_PATH};
