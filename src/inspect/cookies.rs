//! Inbound cookie echo and outbound cookie requests.
//!
//! Clients ask for a cookie to be set with the `x-set-cookie` header, using
//! the usual `name=value; Attr=val; Flag` grammar.

use chrono::{DateTime, NaiveDateTime, Utc};
use cookie::Cookie;
use serde::Serialize;

/// Header through which a client requests an outbound cookie.
pub const SET_COOKIE_REQUEST_HEADER: &str = "x-set-cookie";

/// A cookie as reported in the snapshot or requested for the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieDescriptor {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub http_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

/// Parse the pairs of one or more `Cookie` header values.
///
/// Pairs without `=` are skipped.
pub fn parse_request_cookies<'a, I>(header_values: I) -> Vec<CookieDescriptor>
where
    I: IntoIterator<Item = &'a str>,
{
    header_values
        .into_iter()
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .map(|c| CookieDescriptor {
            name: c.name().to_string(),
            value: c.value().to_string(),
            ..Default::default()
        })
        .collect()
}

/// Parse an `x-set-cookie` value into a full cookie.
///
/// Unknown attributes are ignored; `None` if there is no `name=value`.
pub fn parse_set_cookie(header_value: &str) -> Option<CookieDescriptor> {
    let mut parts = header_value.split(';');
    let (name, value) = parts.next()?.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = CookieDescriptor {
        name: name.to_string(),
        value: value.trim().to_string(),
        ..Default::default()
    };

    for attribute in parts {
        let (key, value) = match attribute.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (attribute.trim(), None),
        };

        match (key.to_ascii_lowercase().as_str(), value) {
            ("domain", Some(v)) => cookie.domain = Some(v.to_string()),
            ("path", Some(v)) => cookie.path = Some(v.to_string()),
            ("expires", Some(v)) => cookie.expires = parse_expires(v),
            ("max-age", Some(v)) => cookie.max_age = v.parse().ok(),
            ("httponly", _) => cookie.http_only = true,
            ("secure", _) => cookie.secure = true,
            ("samesite", Some(v)) => cookie.same_site = SameSite::parse(v),
            _ => {}
        }
    }

    Some(cookie)
}

/// Try the accepted `Expires` formats in order; first match wins.
pub fn parse_expires(value: &str) -> Option<DateTime<Utc>> {
    // IMF-fixdate, e.g. "Mon, 02 Jan 2006 15:04:05 GMT".
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Obsolete RFC 850, e.g. "Monday, 02-Jan-06 15:04:05 GMT".
    if let Some((stamp, zone)) = value.rsplit_once(' ') {
        if zone.chars().all(|c| c.is_ascii_alphabetic()) {
            if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, "%A, %d-%b-%y %H:%M:%S") {
                return Some(naive.and_utc());
            }
        }
    }

    // asctime, e.g. "Mon Jan  2 15:04:05 2006".
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%a %b %e %H:%M:%S %Y") {
        return Some(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl CookieDescriptor {
    /// Render as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let mut cookie = Cookie::new(self.name.clone(), self.value.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        if let Some(expires) = self.expires {
            if let Ok(at) = time::OffsetDateTime::from_unix_timestamp(expires.timestamp()) {
                cookie.set_expires(at);
            }
        }
        if let Some(max_age) = self.max_age {
            cookie.set_max_age(time::Duration::seconds(max_age));
        }
        if self.http_only {
            cookie.set_http_only(true);
        }
        if self.secure {
            cookie.set_secure(true);
        }
        if let Some(same_site) = self.same_site {
            cookie.set_same_site(match same_site {
                SameSite::Strict => cookie::SameSite::Strict,
                SameSite::Lax => cookie::SameSite::Lax,
                SameSite::None => cookie::SameSite::None,
            });
        }
        cookie.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_full_attribute_set() {
        let cookie = parse_set_cookie("a=b; Path=/x; HttpOnly; Secure; SameSite=Strict").unwrap();
        assert_eq!(cookie.name, "a");
        assert_eq!(cookie.value, "b");
        assert_eq!(cookie.path.as_deref(), Some("/x"));
        assert!(cookie.http_only);
        assert!(cookie.secure);
        assert_eq!(cookie.same_site, Some(SameSite::Strict));
        assert_eq!(cookie.domain, None);
    }

    #[test]
    fn test_attributes_are_case_insensitive() {
        let cookie =
            parse_set_cookie("session=xyz; DOMAIN=example.com; max-age=3600; samesite=lax; unknown=1")
                .unwrap();
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.max_age, Some(3600));
        assert_eq!(cookie.same_site, Some(SameSite::Lax));
    }

    #[test]
    fn test_invalid_values_are_dropped() {
        let cookie = parse_set_cookie("a=b; Max-Age=soon; SameSite=Sometimes; Expires=never").unwrap();
        assert_eq!(cookie.max_age, None);
        assert_eq!(cookie.same_site, None);
        assert_eq!(cookie.expires, None);
    }

    #[test]
    fn test_missing_pair_yields_nothing() {
        assert!(parse_set_cookie("").is_none());
        assert!(parse_set_cookie("justaname; Path=/").is_none());
        assert!(parse_set_cookie("=value").is_none());
    }

    #[test]
    fn test_expires_formats() {
        let expected = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        for value in [
            "Mon, 02 Jan 2006 15:04:05 GMT",
            "Monday, 02-Jan-06 15:04:05 GMT",
            "Mon Jan  2 15:04:05 2006",
            "2006-01-02T15:04:05Z",
        ] {
            assert_eq!(parse_expires(value), Some(expected), "format {}", value);
        }
        assert_eq!(parse_expires("2006-01-02"), None);
    }

    #[test]
    fn test_request_cookies() {
        let cookies = parse_request_cookies(["a=1; b=2; broken; c=", "d=4"]);
        let pairs: Vec<_> = cookies
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2"), ("c", ""), ("d", "4")]);
    }

    #[test]
    fn test_render_set_cookie() {
        let cookie = parse_set_cookie("a=b; Path=/x; HttpOnly; Secure; SameSite=Strict").unwrap();
        let rendered = cookie.to_set_cookie();
        assert!(rendered.starts_with("a=b"));
        assert!(rendered.contains("Path=/x"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Strict"));
    }
}
