//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides)
//!     → validation.rs (semantic checks)
//!     → EchoConfig (validated, immutable)
//!     → handed to each subsystem's constructor
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Environment overrides are passed in explicitly; nothing else reads the
//!   process environment

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::EchoConfig;
pub use schema::HealthConfig;
pub use schema::InspectConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::TlsConfig;
