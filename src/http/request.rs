//! Request normalization.
//!
//! # Responsibilities
//! - Extract routing-relevant information (method, host, scheme, port, path)
//! - Parse query string and form body parameters
//! - Expose header and token lookups used by the resolution pipeline
//!
//! # Design Decisions
//! - Built once per request and never mutated afterwards
//! - Hosts are lower-cased and stripped of their port at construction
//! - Parameter maps are ordered so that resolution is deterministic
//! - The path is percent-decoded per segment; `%2F` never splits a segment

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use axum::http::header;
use axum::http::request::Parts;
use axum::http::uri::Authority;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::{form_urlencoded, Url};

/// A query or body parameter value.
///
/// `name[]=a&name[]=b` collects into a list; repeated plain keys keep the
/// last value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    /// The scalar value, if this is not a list.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(value) => Some(value),
            ParamValue::List(_) => None,
        }
    }
}

/// Normalized transport metadata for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    method: String,
    scheme: String,
    host: String,
    port: u16,
    raw_path: String,
    path: String,
    query_params: BTreeMap<String, ParamValue>,
    body_params: BTreeMap<String, ParamValue>,
    headers: BTreeMap<String, String>,
}

impl RequestContext {
    /// Build a context from an absolute URL.
    pub fn from_url(method: &str, url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url)?;
        let scheme = url.scheme().to_ascii_lowercase();
        let port = url
            .port_or_known_default()
            .unwrap_or_else(|| default_port(&scheme));

        Ok(Self {
            method: method.to_ascii_uppercase(),
            host: url.host_str().unwrap_or_default().to_ascii_lowercase(),
            port,
            raw_path: url.path().to_string(),
            path: decode_path(url.path()),
            query_params: parse_params(url.query().unwrap_or_default().as_bytes()),
            body_params: BTreeMap::new(),
            headers: BTreeMap::new(),
            scheme,
        })
    }

    /// Build a context from the head of an HTTP request and its buffered body.
    ///
    /// The body is only parsed when it is form-encoded.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Self {
        let mut headers = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_ascii_lowercase())
                    .or_insert_with(|| value.to_string());
            }
        }

        let scheme = parts
            .uri
            .scheme_str()
            .map(str::to_string)
            .or_else(|| first_forwarded(&headers, "x-forwarded-proto"))
            .unwrap_or_else(|| "http".to_string())
            .to_ascii_lowercase();

        let authority = headers
            .get("host")
            .and_then(|h| h.parse::<Authority>().ok())
            .or_else(|| parts.uri.authority().cloned());

        let host = authority
            .as_ref()
            .map(|a| a.host().trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase())
            .unwrap_or_default();

        let port = first_forwarded(&headers, "x-forwarded-port")
            .and_then(|p| p.parse().ok())
            .or_else(|| authority.as_ref().and_then(Authority::port_u16))
            .unwrap_or_else(|| default_port(&scheme));

        let is_form = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        Self {
            method: parts.method.as_str().to_ascii_uppercase(),
            host,
            port,
            raw_path: parts.uri.path().to_string(),
            path: decode_path(parts.uri.path()),
            query_params: parse_params(parts.uri.query().unwrap_or_default().as_bytes()),
            body_params: if is_form { parse_params(body) } else { BTreeMap::new() },
            headers,
            scheme,
        }
    }

    /// Return a copy with an additional header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Return a copy with form-encoded body parameters.
    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body_params = parse_params(body);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Effective port (scheme default when none was given).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The path as received, still percent-encoded.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// The decoded path used for site matching and classification.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_param(&self, name: &str) -> Option<&ParamValue> {
        self.query_params.get(name)
    }

    /// Look up a parameter in the body first, then in the query string.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.body_params
            .get(name)
            .or_else(|| self.query_params.get(name))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The route token carried by this request, if any.
    ///
    /// The query parameter wins over the header.
    pub fn token(&self, param: &str, header: &str) -> Option<&str> {
        self.query_param(param)
            .and_then(ParamValue::as_str)
            .filter(|t| !t.is_empty())
            .or_else(|| self.header(header).filter(|t| !t.is_empty()))
    }
}

/// Default port for a scheme.
pub fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

fn first_forwarded(headers: &BTreeMap<String, String>, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decode each `/`-separated segment on its own. A decoded `/` is written
/// back as `%2F` so it stays inside its segment, and a segment that is not
/// valid UTF-8 once decoded is kept as received.
fn decode_path(raw: &str) -> String {
    raw.split('/')
        .map(|segment| match percent_decode_str(segment).decode_utf8() {
            Ok(decoded) => decoded.replace('/', "%2F"),
            Err(e) => {
                tracing::debug!(segment, error = %e, "Path segment is not valid UTF-8, keeping it encoded");
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_params(input: &[u8]) -> BTreeMap<String, ParamValue> {
    let mut params = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(input) {
        if let Some(name) = key.strip_suffix("[]") {
            match params.entry(name.to_string()) {
                Entry::Occupied(mut entry) => match entry.get_mut() {
                    ParamValue::List(values) => values.push(value.into_owned()),
                    single => *single = ParamValue::List(vec![value.into_owned()]),
                },
                Entry::Vacant(entry) => {
                    entry.insert(ParamValue::List(vec![value.into_owned()]));
                }
            }
        } else {
            params.insert(key.into_owned(), ParamValue::Single(value.into_owned()));
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_from_url() {
        let ctx = RequestContext::from_url("get", "https://A.Example.com/blog/post-1?p=2").unwrap();
        assert_eq!(ctx.method(), "GET");
        assert_eq!(ctx.scheme(), "https");
        assert_eq!(ctx.host(), "a.example.com");
        assert_eq!(ctx.port(), 443);
        assert_eq!(ctx.raw_path(), "/blog/post-1");
        assert_eq!(ctx.path(), "/blog/post-1");
        assert_eq!(ctx.query_param("p"), Some(&ParamValue::Single("2".into())));
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let ctx = RequestContext::from_url("GET", "https://a.example.com/blog/héllo-wörld").unwrap();
        assert_eq!(ctx.raw_path(), "/blog/h%C3%A9llo-w%C3%B6rld");
        assert_eq!(ctx.path(), "/blog/héllo-wörld");

        let ctx = RequestContext::from_url("GET", "https://a.example.com/a%2Fb/c%20d").unwrap();
        assert_eq!(ctx.path(), "/a%2Fb/c d");

        let ctx = RequestContext::from_url("GET", "https://a.example.com/bad/%FF").unwrap();
        assert_eq!(ctx.path(), "/bad/%FF");

        let parts = parts(Request::builder().uri("/news/caf%C3%A9").header("Host", "x.test"));
        assert_eq!(RequestContext::from_parts(&parts, b"").path(), "/news/café");
    }

    #[test]
    fn test_query_lists_and_repeats() {
        let ctx = RequestContext::from_url("GET", "http://x.test/?a[]=1&a[]=2&b=1&b=2").unwrap();
        assert_eq!(
            ctx.query_param("a"),
            Some(&ParamValue::List(vec!["1".into(), "2".into()]))
        );
        assert_eq!(ctx.query_param("b"), Some(&ParamValue::Single("2".into())));
    }

    #[test]
    fn test_from_parts_host_header_and_forwarded_proto() {
        let parts = parts(
            Request::builder()
                .method("POST")
                .uri("/admin/entries?x=1")
                .header("Host", "CMS.Example.com:8443")
                .header("X-Forwarded-Proto", "https, http"),
        );
        let ctx = RequestContext::from_parts(&parts, b"");
        assert_eq!(ctx.host(), "cms.example.com");
        assert_eq!(ctx.port(), 8443);
        assert_eq!(ctx.scheme(), "https");
        assert_eq!(ctx.raw_path(), "/admin/entries");
        assert_eq!(ctx.header("x-forwarded-proto"), Some("https, http"));
    }

    #[test]
    fn test_default_port_follows_scheme() {
        let parts = parts(
            Request::builder()
                .uri("/")
                .header("Host", "example.com")
                .header("X-Forwarded-Proto", "https"),
        );
        let ctx = RequestContext::from_parts(&parts, b"");
        assert_eq!(ctx.port(), 443);
    }

    #[test]
    fn test_body_params_only_for_forms() {
        let form = parts(
            Request::builder()
                .method("POST")
                .uri("/?action=query/action")
                .header("Content-Type", "application/x-www-form-urlencoded"),
        );
        let ctx = RequestContext::from_parts(&form, b"action=body/action");
        assert_eq!(
            ctx.param("action").and_then(ParamValue::as_str),
            Some("body/action")
        );

        let json = parts(
            Request::builder()
                .method("POST")
                .uri("/?action=query/action")
                .header("Content-Type", "application/json"),
        );
        let ctx = RequestContext::from_parts(&json, b"action=body/action");
        assert_eq!(
            ctx.param("action").and_then(ParamValue::as_str),
            Some("query/action")
        );
    }

    #[test]
    fn test_token_precedence() {
        let ctx = RequestContext::from_url("GET", "http://x.test/?token=from-query")
            .unwrap()
            .with_header("X-Route-Token", "from-header");
        assert_eq!(ctx.token("token", "x-route-token"), Some("from-query"));

        let ctx = RequestContext::from_url("GET", "http://x.test/?token=")
            .unwrap()
            .with_header("X-Route-Token", "from-header");
        assert_eq!(ctx.token("token", "X-Route-Token"), Some("from-header"));

        let ctx = RequestContext::from_url("GET", "http://x.test/").unwrap();
        assert_eq!(ctx.token("token", "X-Route-Token"), None);
    }
}
