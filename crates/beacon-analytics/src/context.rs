//! Per-request view of everything the payload builder reads.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::header::{ACCEPT_LANGUAGE, COOKIE, HOST, REFERER, USER_AGENT};
use axum::http::{Extensions, HeaderMap, HeaderValue, Request, Uri};
use cookie::Cookie;

use crate::session::SessionHandle;

/// Header carrying a carrier-supplied device identifier
pub const DEVICE_ID_HEADER: &str = "x-dcmguid";

/// Attributes injected by earlier middleware, looked up by name
///
/// Insert this into the request extensions to let upstream code supply a
/// per-request account override (see `AnalyticsSettings::request_key`).
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes(HashMap<String, String>);

impl RequestAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Read-only tracking context, captured before the inner handler runs
#[derive(Clone, Default)]
pub struct TrackingRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    pub remote_addr: Option<IpAddr>,
    pub session: Option<SessionHandle>,
    pub attributes: RequestAttributes,
}

impl TrackingRequest {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::from_parts(request.uri(), request.headers(), request.extensions())
    }

    pub fn from_parts(uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        let mut context = Self::from_uri_parts(uri);
        context.headers = headers.clone();
        context.cookies = parse_cookies(headers);
        context.remote_addr = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        context.session = extensions.get::<SessionHandle>().cloned();
        context.attributes = extensions
            .get::<RequestAttributes>()
            .cloned()
            .unwrap_or_default();
        context
    }

    /// Context with only a path and query string, no headers or session
    pub fn from_uri(uri: &str) -> Self {
        match uri.parse::<Uri>() {
            Ok(uri) => Self::from_uri_parts(&uri),
            Err(_) => Self {
                path: uri.to_string(),
                ..Default::default()
            },
        }
    }

    fn from_uri_parts(uri: &Uri) -> Self {
        let query = uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Self {
            path: uri.path().to_string(),
            query,
            ..Default::default()
        }
    }

    /// Last value wins when a key repeats
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_query_param(&self, key: &str) -> bool {
        self.query.iter().any(|(k, _)| k == key)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(USER_AGENT.as_str())
    }

    pub fn host(&self) -> Option<&str> {
        self.header(HOST.as_str())
    }

    pub fn referer(&self) -> Option<&str> {
        self.header(REFERER.as_str())
    }

    pub fn accept_language(&self) -> Option<&str> {
        self.header(ACCEPT_LANGUAGE.as_str())
    }

    pub fn device_id(&self) -> Option<&str> {
        self.header(DEVICE_ID_HEADER)
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse::<HeaderValue>() {
            self.headers.insert(name, value);
        }
        self.cookies = parse_cookies(&self.headers);
        self
    }

    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_attributes(mut self, attributes: RequestAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse(value).flatten() {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().to_string());
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use std::sync::Arc;

    #[test]
    fn test_from_request_extracts_metadata() {
        let session = SessionHandle(Arc::new(MemorySession::new()));
        let request = Request::builder()
            .uri("/blog/post?utm_source=news&r=http%3A%2F%2Fexample.com%2F")
            .header("user-agent", "TestAgent")
            .header("host", "example.com")
            .header("accept-language", "en-US")
            .header("x-dcmguid", "device-1")
            .header("cookie", "__uamobile=abc; other=1")
            .extension(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))))
            .extension(session)
            .extension(RequestAttributes::new().with("ga_account", "UA-42-1"))
            .body(())
            .unwrap();

        let context = TrackingRequest::from_request(&request);

        assert_eq!(context.path, "/blog/post");
        assert_eq!(context.query_param("utm_source"), Some("news"));
        assert_eq!(context.query_param("r"), Some("http://example.com/"));
        assert_eq!(context.user_agent(), Some("TestAgent"));
        assert_eq!(context.host(), Some("example.com"));
        assert_eq!(context.accept_language(), Some("en-US"));
        assert_eq!(context.device_id(), Some("device-1"));
        assert_eq!(context.cookie("__uamobile"), Some("abc"));
        assert_eq!(context.cookie("other"), Some("1"));
        assert_eq!(context.remote_addr, Some(IpAddr::from([10, 0, 0, 7])));
        assert!(context.session.is_some());
        assert_eq!(context.attributes.get("ga_account"), Some("UA-42-1"));
    }

    #[test]
    fn test_missing_metadata() {
        let context = TrackingRequest::from_uri("/");
        assert_eq!(context.path, "/");
        assert!(context.query.is_empty());
        assert_eq!(context.user_agent(), None);
        assert_eq!(context.cookie("__uamobile"), None);
        assert!(context.session.is_none());
        assert!(context.remote_addr.is_none());
    }

    #[test]
    fn test_repeated_query_key_last_wins() {
        let context = TrackingRequest::from_uri("/?p=/first&p=/second");
        assert_eq!(context.query_param("p"), Some("/second"));
    }
}
