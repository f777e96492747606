//! Shared utilities for integration tests.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use request_echo::config::EchoConfig;
use request_echo::lifecycle::{self, Shutdown};

/// Config bound to the given loopback ports. TLS is enabled when
/// `tls_addr` is given, with certificate paths that do not exist so a
/// self-signed one is generated.
pub fn config_for(addr: SocketAddr, tls_addr: Option<SocketAddr>) -> EchoConfig {
    let mut config = EchoConfig::default();
    config.listener.bind_address = addr.to_string();
    if let Some(tls_addr) = tls_addr {
        let dir = std::env::temp_dir().join(format!("request-echo-missing-{}", tls_addr.port()));
        config.listener.tls.enabled = true;
        config.listener.tls.bind_address = tls_addr.to_string();
        config.listener.tls.cert_path = dir.join("tls.crt").display().to_string();
        config.listener.tls.key_path = dir.join("tls.key").display().to_string();
    }
    config
}

/// Start the server in the background; dropping the returned coordinator
/// does not stop it, call `trigger`.
pub async fn start_server(config: EchoConfig, vars: BTreeMap<String, String>) -> Shutdown {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let server = lifecycle::prepare(config, &vars, None).await.unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
