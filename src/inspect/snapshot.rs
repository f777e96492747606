//! Request snapshot assembly.
//!
//! Combines the body decoder, token extractor and header utilities with the
//! startup-time server facts into one immutable [`RequestSnapshot`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderMap, Method};
use serde::Serialize;

use crate::config::InspectConfig;
use crate::inspect::body::{BodyDecoder, BodyDescriptor};
use crate::inspect::cookies::{parse_request_cookies, CookieDescriptor};
use crate::inspect::headers::{self, CompressionDescriptor};
use crate::inspect::token::{TokenDescriptor, TokenExtractor};
use crate::net::tls::CertificateDescriptor;
use crate::platform::{KubernetesFacts, ServerFacts};

/// Listener a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Plain,
    Secure,
}

impl Transport {
    pub fn protocol(&self) -> &'static str {
        match self {
            Transport::Plain => "http",
            Transport::Secure => "https",
        }
    }
}

/// Per-request TLS facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestTls {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBlock {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    pub headers: BTreeMap<String, String>,
    pub remote_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<CookieDescriptor>,
    pub compression: CompressionDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<RequestTls>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerBlock {
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_address: Option<String>,
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<CertificateDescriptor>,
}

/// Everything known about one request and the server that received it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub request: RequestBlock,
    pub server: ServerBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesFacts>,
    #[serde(rename = "jwtTokens", skip_serializing_if = "BTreeMap::is_empty")]
    pub tokens: BTreeMap<String, TokenDescriptor>,
}

/// The raw request facts the transport hands over.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: &'a str,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
    pub peer: Option<SocketAddr>,
    pub transport: Transport,
    /// Encoding chosen for the response, if already known.
    pub response_encoding: Option<&'a str>,
}

/// Builds snapshots; shared by every request.
#[derive(Debug, Clone)]
pub struct Inspector {
    decoder: BodyDecoder,
    tokens: TokenExtractor,
    server: Arc<ServerFacts>,
    certificate: Option<Arc<CertificateDescriptor>>,
}

impl Inspector {
    pub fn new(
        config: &InspectConfig,
        server: Arc<ServerFacts>,
        certificate: Option<Arc<CertificateDescriptor>>,
    ) -> Self {
        Self {
            decoder: BodyDecoder::new(config.max_body_size),
            tokens: TokenExtractor::new(config.token_headers.clone()),
            server,
            certificate,
        }
    }

    pub fn decoder(&self) -> &BodyDecoder {
        &self.decoder
    }

    pub fn snapshot(&self, parts: RequestParts<'_>) -> RequestSnapshot {
        let headers = headers::header_map(parts.headers);

        let body = if decodes_body(parts.method) {
            let content_type = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            self.decoder.parse(parts.body, content_type)
        } else {
            None
        };

        let cookies = parse_request_cookies(
            parts
                .headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );

        let request = RequestBlock {
            method: parts.method.to_string(),
            path: parts.path.to_string(),
            query: parts.query.to_string(),
            remote_address: headers::remote_address(parts.headers, parts.peer),
            body,
            cookies,
            compression: headers::compression(parts.headers, parts.response_encoding),
            tls: (parts.transport == Transport::Secure).then_some(RequestTls { enabled: true }),
            headers: headers.clone(),
        };

        let server = ServerBlock {
            hostname: self.server.host.hostname.clone(),
            host_address: self.server.host.host_address.clone(),
            environment: self.server.environment.clone(),
            tls: self.certificate.as_deref().cloned(),
        };

        RequestSnapshot {
            request,
            server,
            kubernetes: self.server.kubernetes.clone(),
            tokens: self.tokens.extract(&headers),
        }
    }
}

/// Only methods that conventionally carry a body are decoded.
fn decodes_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::body::BodyContent;
    use crate::platform::HostFacts;
    use axum::http::HeaderValue;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde_json::json;

    fn inspector() -> Inspector {
        let server = ServerFacts {
            host: HostFacts {
                hostname: "test-host".into(),
                host_address: Some("10.0.0.1".into()),
            },
            environment: BTreeMap::from([("HOSTNAME".to_string(), "test-host".to_string())]),
            kubernetes: None,
        };
        Inspector::new(&InspectConfig::default(), Arc::new(server), None)
    }

    fn parts<'a>(method: &'a Method, headers: &'a HeaderMap, body: &'a [u8]) -> RequestParts<'a> {
        RequestParts {
            method,
            path: "/api/items",
            query: "page=2",
            headers,
            body,
            peer: Some("192.168.1.5:40000".parse().unwrap()),
            transport: Transport::Plain,
            response_encoding: None,
        }
    }

    #[test]
    fn test_post_json_snapshot() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; b=2"));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));

        let snapshot = inspector().snapshot(parts(&Method::POST, &headers, br#"{"name":"John","age":30}"#));

        let body = snapshot.request.body.as_ref().unwrap();
        assert_eq!(body.content, BodyContent::Structured(json!({"name": "John", "age": 30})));
        assert!(!body.is_binary);
        assert_eq!(snapshot.request.cookies.len(), 2);
        assert_eq!(snapshot.request.compression.accepted_encodings, vec!["gzip", "br"]);
        assert_eq!(snapshot.request.remote_address, "192.168.1.5");
        assert_eq!(snapshot.request.query, "page=2");
        assert!(snapshot.request.tls.is_none());
        assert!(snapshot.server.tls.is_none());
        assert!(snapshot.tokens.is_empty());
    }

    #[test]
    fn test_get_body_is_not_decoded() {
        let headers = HeaderMap::new();
        let snapshot = inspector().snapshot(parts(&Method::GET, &headers, b"ignored"));
        assert!(snapshot.request.body.is_none());
    }

    #[test]
    fn test_tokens_are_collected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let value = format!("Bearer {}.{}.sig", header, payload);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());

        let snapshot = inspector().snapshot(parts(&Method::GET, &headers, b""));
        assert_eq!(snapshot.tokens.len(), 1);
        assert_eq!(snapshot.tokens["Authorization"].payload["sub"], json!("x"));
        // The full value is still echoed with the headers.
        assert_eq!(snapshot.request.headers["authorization"], value);
    }

    #[test]
    fn test_secure_transport_carries_certificate() {
        let cert = crate::net::tls::generate_self_signed("secure-host").unwrap();
        let inspector = Inspector::new(
            &InspectConfig::default(),
            Arc::new(ServerFacts::default()),
            Some(Arc::new(cert.descriptor().clone())),
        );

        let headers = HeaderMap::new();
        let mut request = parts(&Method::GET, &headers, b"");
        request.transport = Transport::Secure;
        let snapshot = inspector.snapshot(request);

        assert_eq!(snapshot.request.tls, Some(RequestTls { enabled: true }));
        assert_eq!(snapshot.server.tls.as_ref().map(|t| t.enabled), Some(true));
    }

    #[test]
    fn test_serialized_shape() {
        let headers = HeaderMap::new();
        let snapshot = inspector().snapshot(parts(&Method::GET, &headers, b""));
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["request"]["method"], "GET");
        assert_eq!(value["request"]["remoteAddress"], "192.168.1.5");
        assert_eq!(value["request"]["compression"], json!({"supported": false}));
        assert_eq!(value["server"]["hostname"], "test-host");
        assert_eq!(value["server"]["hostAddress"], "10.0.0.1");
        assert!(value.get("jwtTokens").is_none());
        assert!(value.get("kubernetes").is_none());
    }
}
