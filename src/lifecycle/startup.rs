//! Startup orchestration.
//!
//! Validates the config, provisions the certificate when TLS is enabled,
//! captures server facts and builds the [`HttpServer`]. Binding is left to
//! the caller.

use std::collections::BTreeMap;
use std::path::Path;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::EchoConfig;
use crate::http::HttpServer;
use crate::net::tls::{obtain_certificate, TlsError};
use crate::platform::ServerFacts;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join(.0))]
    Config(Vec<ValidationError>),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Prepare the server from a fully overridden config and the process
/// environment snapshot.
pub async fn prepare(
    config: EchoConfig,
    vars: &BTreeMap<String, String>,
    metrics: Option<PrometheusHandle>,
) -> Result<HttpServer, StartupError> {
    validate_config(&config).map_err(StartupError::Config)?;

    let tls = &config.listener.tls;
    let certificate = if tls.enabled {
        Some(obtain_certificate(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?)
    } else {
        None
    };

    let facts = ServerFacts::capture(&config.inspect.environment_display, vars);
    tracing::info!(
        hostname = %facts.host.hostname,
        kubernetes = facts.kubernetes.is_some(),
        environment_vars = facts.environment.len(),
        "Server facts captured"
    );

    Ok(HttpServer::new(config, facts, certificate, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_reports_all_errors() {
        let mut config = EchoConfig::default();
        config.listener.bind_address = "nope".into();
        config.inspect.max_body_size = 0;

        match prepare(config, &BTreeMap::new(), None).await {
            Err(StartupError::Config(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_plain_config_prepares() {
        let server = prepare(EchoConfig::default(), &BTreeMap::new(), None).await.unwrap();
        assert!(!server.config().listener.tls.enabled);
    }
}
