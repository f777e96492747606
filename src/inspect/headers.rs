//! Header-derived request facts.
//!
//! # Responsibilities
//! - Flatten the header map for echoing
//! - Resolve the client address through proxy headers
//! - Report compression negotiation
//! - Honor the status-override request header

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;

/// Header through which a client requests a response status.
pub const STATUS_OVERRIDE_HEADER: &str = "x-set-response-status-code";

/// Compression negotiation facts for one request.
///
/// `supported` only reflects what the client offered; the encoding actually
/// used is reported separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionDescriptor {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accepted_encodings: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub response_encoding: String,
    pub supported: bool,
}

/// Flatten headers into name → value; repeated headers are comma-joined.
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}

/// Client address: first `X-Forwarded-For` entry, then `X-Real-IP`, then
/// the transport peer.
pub fn remote_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = forwarded {
        return addr.to_string();
    }

    if let Some(addr) = header_str(headers, "x-real-ip").map(str::trim).filter(|v| !v.is_empty()) {
        return addr.to_string();
    }

    peer.map(|p| p.ip().to_string()).unwrap_or_default()
}

/// Parse `Accept-Encoding` into an ordered token list.
///
/// `response_encoding` is whatever the transport chose, if known.
pub fn compression(headers: &HeaderMap, response_encoding: Option<&str>) -> CompressionDescriptor {
    let accepted_encodings: Vec<String> = header_str(headers, "accept-encoding")
        .map(|v| {
            v.split(',')
                .filter_map(|part| part.split(';').next())
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    CompressionDescriptor {
        supported: !accepted_encodings.is_empty(),
        accepted_encodings,
        response_encoding: response_encoding.unwrap_or_default().to_string(),
    }
}

/// Requested response status, if the override header holds a code in
/// 200..=599. Anything else falls back to 200.
pub fn response_status(headers: &HeaderMap) -> StatusCode {
    header_str(headers, STATUS_OVERRIDE_HEADER)
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|code| (200..=599).contains(code))
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_status_override() {
        assert_eq!(response_status(&headers(&[(STATUS_OVERRIDE_HEADER, "404")])), StatusCode::NOT_FOUND);
        assert_eq!(response_status(&headers(&[(STATUS_OVERRIDE_HEADER, "599")])).as_u16(), 599);
        assert_eq!(response_status(&headers(&[(STATUS_OVERRIDE_HEADER, "700")])), StatusCode::OK);
        assert_eq!(response_status(&headers(&[(STATUS_OVERRIDE_HEADER, "abc")])), StatusCode::OK);
        assert_eq!(response_status(&headers(&[(STATUS_OVERRIDE_HEADER, "199")])), StatusCode::OK);
        assert_eq!(response_status(&HeaderMap::new()), StatusCode::OK);
    }

    #[test]
    fn test_remote_address_precedence() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();

        let h = headers(&[("x-forwarded-for", " 1.1.1.1 , 2.2.2.2"), ("x-real-ip", "3.3.3.3")]);
        assert_eq!(remote_address(&h, Some(peer)), "1.1.1.1");

        let h = headers(&[("x-real-ip", "3.3.3.3")]);
        assert_eq!(remote_address(&h, Some(peer)), "3.3.3.3");

        assert_eq!(remote_address(&HeaderMap::new(), Some(peer)), "10.0.0.9");
        assert_eq!(remote_address(&HeaderMap::new(), None), "");
    }

    #[test]
    fn test_compression_facts_are_independent() {
        let h = headers(&[("accept-encoding", "gzip;q=1.0, br, deflate;q=0.5, ")]);
        let facts = compression(&h, None);
        assert_eq!(facts.accepted_encodings, vec!["gzip", "br", "deflate"]);
        assert!(facts.supported);
        assert!(facts.response_encoding.is_empty());

        let facts = compression(&HeaderMap::new(), Some("gzip"));
        assert!(!facts.supported);
        assert_eq!(facts.response_encoding, "gzip");
    }

    #[test]
    fn test_header_map_joins_repeats() {
        let h = headers(&[("accept", "text/html"), ("accept", "application/json"), ("x-one", "1")]);
        let map = header_map(&h);
        assert_eq!(map["accept"], "text/html, application/json");
        assert_eq!(map["x-one"], "1");
    }
}
