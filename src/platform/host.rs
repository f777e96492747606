//! Host identity.

use std::net::{IpAddr, UdpSocket};

use serde::Serialize;

/// Used when the OS host name cannot be read.
pub const FALLBACK_HOSTNAME: &str = "request-echo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostFacts {
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_address: Option<String>,
}

impl Default for HostFacts {
    fn default() -> Self {
        Self {
            hostname: FALLBACK_HOSTNAME.to_string(),
            host_address: None,
        }
    }
}

impl HostFacts {
    pub fn detect() -> Self {
        Self {
            hostname: local_hostname(),
            host_address: routed_ipv4().map(|ip| ip.to_string()),
        }
    }
}

/// OS host name, or [`FALLBACK_HOSTNAME`].
pub fn local_hostname() -> String {
    match gethostname::gethostname().into_string() {
        Ok(name) if !name.trim().is_empty() => name,
        _ => {
            tracing::warn!(fallback = FALLBACK_HOSTNAME, "Failed to read host name");
            FALLBACK_HOSTNAME.to_string()
        }
    }
}

/// The non-loopback IPv4 address outbound traffic would leave from.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
fn routed_ipv4() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:9").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_never_empty() {
        assert!(!local_hostname().is_empty());
    }

    #[test]
    fn test_detected_address_is_not_loopback() {
        if let Some(addr) = HostFacts::detect().host_address {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(!ip.is_loopback());
        }
    }
}
