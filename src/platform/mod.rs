//! Server-side facts reported with every snapshot.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     OS host name, routed IPv4 address (host.rs)
//!     process environment, passed in by main
//!         → environment subset (environment.rs)
//!         → Downward-API pod metadata (kubernetes.rs)
//!     → ServerFacts (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Captured once; handlers never read the environment
//! - Variables are passed as pairs so capture is testable

pub mod environment;
pub mod host;
pub mod kubernetes;

use std::collections::BTreeMap;

pub use environment::environment_subset;
pub use host::HostFacts;
pub use kubernetes::KubernetesFacts;

/// Everything about the server that does not change per request.
#[derive(Debug, Clone, Default)]
pub struct ServerFacts {
    pub host: HostFacts,
    pub environment: BTreeMap<String, String>,
    pub kubernetes: Option<KubernetesFacts>,
}

impl ServerFacts {
    /// Capture server facts from the host and the given variables.
    pub fn capture(display: &[String], vars: &BTreeMap<String, String>) -> Self {
        Self::with_host(HostFacts::detect(), display, vars)
    }

    pub fn with_host(host: HostFacts, display: &[String], vars: &BTreeMap<String, String>) -> Self {
        let kubernetes = KubernetesFacts::from_vars(vars);
        let environment = environment_subset(display, vars, kubernetes.is_some());
        Self {
            host,
            environment,
            kubernetes,
        }
    }
}
