//! Request Echo Library
//!
//! Diagnostic HTTP service that answers every request with a structured
//! description of what it received and of the server that received it.

pub mod config;
pub mod health;
pub mod http;
pub mod inspect;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod platform;

pub use config::schema::EchoConfig;
pub use http::HttpServer;
pub use inspect::{Inspector, RequestSnapshot};
pub use lifecycle::Shutdown;
