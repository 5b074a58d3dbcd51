//! # Request Module
//!
//! Two types model the inbound side of a dispatch cycle:
//!
//! - [`RequestContext`] is the immutable snapshot of the HTTP request (method,
//!   query string, form body, raw body, cookies, headers). The host builds one
//!   per request and hands it to [`crate::App::run`]; nothing in the pipeline
//!   reads process-wide state.
//! - [`Request`] is what handlers and middleware see: a cheap view over the
//!   shared context plus the resolved action name and a mutable custom-data
//!   bag that middleware use to pass values down the chain.

use crate::config::AppConfig;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Maximum inline query/form/cookie pairs before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Ordered name/value pairs for query, form and cookie data.
pub type ParamVec = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// Ordered header pairs, names kept as received.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// Immutable snapshot of one inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// HTTP method
    pub method: Method,
    /// Query string parameters, in the order received
    pub query: ParamVec,
    /// Form-encoded body parameters
    pub form: ParamVec,
    /// Raw request body
    pub body: Vec<u8>,
    /// Cookies parsed from the `Cookie` header
    pub cookies: ParamVec,
    /// HTTP headers
    pub headers: HeaderVec,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestContext {
    /// Create an empty context for the given method.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query: ParamVec::new(),
            form: ParamVec::new(),
            body: Vec::new(),
            cookies: ParamVec::new(),
            headers: HeaderVec::new(),
        }
    }

    /// Build a context from raw HTTP parts.
    ///
    /// `target` is the request target as it appears on the request line
    /// (`/index?_=home&page=2`); its query string is decoded. Cookies come from
    /// the `Cookie` header, and the body is decoded as form parameters when the
    /// content type is `application/x-www-form-urlencoded`.
    ///
    /// # Errors
    ///
    /// Returns an error if `method` is not a valid HTTP method token.
    pub fn parse<I>(
        method: &str,
        target: &str,
        headers: I,
        body: Vec<u8>,
    ) -> Result<Self, http::method::InvalidMethod>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let method = Method::from_bytes(method.as_bytes())?;
        let headers: HeaderVec = headers.into_iter().collect();

        let query = target
            .split_once('?')
            .map(|(_, qs)| parse_urlencoded(qs.as_bytes()))
            .unwrap_or_default();

        let cookies = find_header(&headers, "cookie")
            .map(parse_cookies)
            .unwrap_or_default();

        let is_form = find_header(&headers, "content-type").is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        });
        let form = if is_form && !body.is_empty() {
            parse_urlencoded(&body)
        } else {
            ParamVec::new()
        };

        debug!(
            method = %method,
            query_count = query.len(),
            form_count = form.len(),
            cookie_count = cookies.len(),
            header_count = headers.len(),
            body_bytes = body.len(),
            "Request context parsed"
        );

        Ok(Self {
            method,
            query,
            form,
            body,
            cookies,
            headers,
        })
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append a form body parameter.
    #[must_use]
    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Append a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a query parameter. Duplicate names resolve to the last occurrence.
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        find_param(&self.query, name)
    }
}

/// Per-cycle view handed to middleware and handlers.
///
/// Cloning is cheap: the request snapshot and configuration are shared, only
/// the action name and the custom-data bag are owned.
#[derive(Debug, Clone)]
pub struct Request {
    context: Arc<RequestContext>,
    config: Arc<AppConfig>,
    action: String,
    data: HashMap<String, Value>,
}

impl Request {
    /// Create a request view with no resolved action and an empty data bag.
    #[must_use]
    pub fn new(context: Arc<RequestContext>, config: Arc<AppConfig>) -> Self {
        Self {
            context,
            config,
            action: String::new(),
            data: HashMap::new(),
        }
    }

    pub(crate) fn set_action(&mut self, action: impl Into<String>) {
        self.action = action.into();
    }

    /// HTTP method of the request.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.context.method
    }

    /// Resolved action name. Empty until the action has been resolved.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Dispatcher configuration in effect for this cycle.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Underlying request snapshot.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Get a query parameter by name.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        find_param(&self.context.query, name)
    }

    /// All query parameters, in the order received.
    #[must_use]
    pub fn queries(&self) -> &[(String, String)] {
        &self.context.query
    }

    /// Get a form body parameter by name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&str> {
        find_param(&self.context.form, name)
    }

    /// All form body parameters.
    #[must_use]
    pub fn inputs(&self) -> &[(String, String)] {
        &self.context.form
    }

    /// Raw request body.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.context.body
    }

    /// Decode the raw body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.context.body)
    }

    /// Get a cookie by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        find_param(&self.context.cookies, name)
    }

    /// All cookies.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.context.cookies
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.context.headers, name)
    }

    /// All headers, names as received.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.context.headers
    }

    /// Store a value in the custom-data bag, returning the request.
    ///
    /// Intended for middleware: `Ok(MiddlewareOutcome::Continue(req.with_data("user", json!(id))))`.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_data(key, value);
        self
    }

    /// Store a value in the custom-data bag.
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Get a value from the custom-data bag.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

fn find_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .rfind(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn parse_urlencoded(raw: &[u8]) -> ParamVec {
    url::form_urlencoded::parse(raw)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Split a `Cookie` header into name/value pairs.
///
/// Names and values are percent-decoded, matching what
/// [`crate::response::Cookie`] writes. A literal `+` is kept, so base64
/// tokens set by other software read back unchanged.
pub fn parse_cookies(header: &str) -> ParamVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((decode_cookie_part(name), decode_cookie_part(value)))
        })
        .collect()
}

fn decode_cookie_part(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_query_and_cookies() {
        let ctx = RequestContext::parse(
            "GET",
            "/app/?_=about&page=2",
            headers(&[("Cookie", "a=b; c=d"), ("X-Trace", "abc")]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(ctx.method, Method::GET);
        assert_eq!(ctx.query_param("_"), Some("about"));
        assert_eq!(ctx.query_param("page"), Some("2"));
        assert_eq!(ctx.cookies.len(), 2);
        assert!(ctx.form.is_empty());
    }

    #[test]
    fn test_parse_form_body() {
        let ctx = RequestContext::parse(
            "POST",
            "/?_=save",
            headers(&[("Content-Type", "application/x-www-form-urlencoded")]),
            b"title=Hello+World&tag=a%26b".to_vec(),
        )
        .unwrap();
        assert_eq!(find_param(&ctx.form, "title"), Some("Hello World"));
        assert_eq!(find_param(&ctx.form, "tag"), Some("a&b"));
        assert_eq!(ctx.body, b"title=Hello+World&tag=a%26b");
    }

    #[test]
    fn test_json_body_is_not_decoded_as_form() {
        let ctx = RequestContext::parse(
            "POST",
            "/",
            headers(&[("content-type", "application/json")]),
            br#"{"a":1}"#.to_vec(),
        )
        .unwrap();
        assert!(ctx.form.is_empty());
    }

    #[test]
    fn test_parse_rejects_invalid_method() {
        assert!(RequestContext::parse("G ET", "/", Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_parse_cookies_skips_empty_names() {
        let cookies = parse_cookies("a=b; ; =x; c");
        assert_eq!(cookies.len(), 2);
        assert_eq!(find_param(&cookies, "c"), Some(""));
    }

    #[test]
    fn test_cookie_written_by_response_reads_back_decoded() {
        let written = crate::response::Cookie::new("name", "Jane Doe & co; 100%")
            .path("/")
            .header_value();
        let pair = written.split("; ").next().unwrap().to_string();
        assert_eq!(pair, "name=Jane%20Doe%20%26%20co%3B%20100%25");

        let ctx = RequestContext::parse("GET", "/", headers(&[("Cookie", pair.as_str())]), Vec::new())
            .unwrap();
        let req = Request::new(Arc::new(ctx), Arc::new(AppConfig::default()));
        assert_eq!(req.cookie("name"), Some("Jane Doe & co; 100%"));
    }

    #[test]
    fn test_parse_cookies_keeps_plus_and_malformed_escapes() {
        let cookies = parse_cookies("token=ab+c/d==; raw=50%zz");
        assert_eq!(find_param(&cookies, "token"), Some("ab+c/d=="));
        assert_eq!(find_param(&cookies, "raw"), Some("50%zz"));
    }

    #[test]
    fn test_request_accessors() {
        let ctx = RequestContext::new(Method::POST)
            .with_query("_", "save")
            .with_query("page", "1")
            .with_query("page", "3")
            .with_form("title", "hi")
            .with_cookie("session", "s1")
            .with_header("X-Request-ID", "abc")
            .with_body(r#"{"n":5}"#);
        let mut req = Request::new(Arc::new(ctx), Arc::new(AppConfig::default()));
        req.set_action("save");

        assert_eq!(*req.method(), Method::POST);
        assert_eq!(req.action(), "save");
        assert_eq!(req.query("page"), Some("3"));
        assert_eq!(req.queries().len(), 3);
        assert_eq!(req.input("title"), Some("hi"));
        assert_eq!(req.cookie("session"), Some("s1"));
        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.headers()[0].0, "X-Request-ID");
        let body: serde_json::Value = req.json().unwrap();
        assert_eq!(body["n"], 5);
    }

    #[test]
    fn test_custom_data_bag() {
        let req = Request::new(
            Arc::new(RequestContext::default()),
            Arc::new(AppConfig::default()),
        )
        .with_data("user", "alice");
        assert_eq!(req.data("user"), Some(&Value::from("alice")));
        assert!(req.data("missing").is_none());
    }
}
