//! Configuration validation.
//!
//! Serde handles the syntax; this pass checks value ranges and addresses and
//! reports every problem at once.

use std::net::SocketAddr;

use crate::config::schema::EchoConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &EchoConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    let tls = &config.listener.tls;
    if tls.enabled {
        check_address(&mut errors, "listener.tls.bind_address", &tls.bind_address);
        if tls.cert_path.trim().is_empty() {
            errors.push(error("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(error("listener.tls.key_path", "must not be empty"));
        }
    }

    if config.inspect.max_body_size == 0 {
        errors.push(error("inspect.max_body_size", "must be greater than zero"));
    }
    if config.inspect.token_headers.iter().all(|h| h.trim().is_empty()) {
        errors.push(error("inspect.token_headers", "must name at least one header"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(error("timeouts.request_secs", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(error(field, &format!("invalid socket address {:?}: {}", value, e)));
    }
}

fn error(field: &'static str, message: &str) -> ValidationError {
    ValidationError {
        field,
        message: message.to_string(),
    }
}
