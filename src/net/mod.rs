//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup, TLS enabled:
//!     cert + key on disk? ── yes → load, parse leaf (tls.rs)
//!                        └─ no  → generate self-signed RSA certificate
//!     → Certificate (PEM, rustls ServerConfig, descriptor)
//!     → axum-server rustls listener
//! ```
//!
//! # Design Decisions
//! - A present but unusable pair is fatal; only a missing pair triggers
//!   generation
//! - Generated material stays in memory

pub mod tls;
