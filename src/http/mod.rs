//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Plain TCP listener ──┐                      ┌─ /healthz/live, /healthz/ready
//!                      ├─ request ID, timeout ┼─ /metrics
//! TLS listener ────────┘  (Transport ext.)    └─ any other path
//!                                                 → middleware (metrics)
//!                                                 → server.rs echo handler
//!                                                 → Inspector::snapshot
//!                                                 → JSON response
//! ```
//!
//! # Design Decisions
//! - One router serves both listeners; only the Transport extension differs
//! - Bodies are buffered up to twice the decode cap, then handed to the
//!   decoder which truncates to the cap

pub mod middleware;
pub mod server;

pub use server::{AppState, HttpServer, METRICS_PATH};
