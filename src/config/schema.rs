//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the echo
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default ceiling for decoded request bodies (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Header names probed for embedded tokens, in probe order.
pub const DEFAULT_TOKEN_HEADERS: [&str; 4] =
    ["Authorization", "X-JWT-Token", "X-Auth-Token", "JWT-Token"];

/// Root configuration for the echo service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EchoConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Request introspection settings.
    pub inspect: InspectConfig,

    /// Liveness/readiness probe settings.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address for the plain HTTP listener (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Secure listener configuration.
    pub tls: TlsConfig,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: TlsConfig::default(),
        }
    }
}

/// TLS configuration for the secure listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Serve HTTPS alongside plain HTTP.
    pub enabled: bool,

    /// Bind address for the HTTPS listener.
    pub bind_address: String,

    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "0.0.0.0:8443".to_string(),
            cert_path: "/certs/tls.crt".to_string(),
            key_path: "/certs/tls.key".to_string(),
        }
    }
}

/// Request introspection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Bodies larger than this are truncated before decoding.
    pub max_body_size: usize,

    /// Ordered header names probed for tokens.
    pub token_headers: Vec<String>,

    /// Environment variables reported in the server block.
    /// Empty means only `HOSTNAME`.
    pub environment_display: Vec<String>,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            token_headers: DEFAULT_TOKEN_HEADERS.iter().map(|s| s.to_string()).collect(),
            environment_display: Vec::new(),
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    /// Seconds after startup before the readiness probe reports ready.
    pub readiness_delay_secs: u64,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Emit access logs for probe and metrics requests.
    pub log_healthchecks: bool,

    /// Enable the `/metrics` endpoint.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_healthchecks: false,
            metrics_enabled: true,
        }
    }
}
