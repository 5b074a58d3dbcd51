//! # Response Module
//!
//! [`Response`] accumulates the outbound side of a dispatch cycle: a status
//! code (200 until changed), header lines, and a body buffer. Handlers and
//! middleware shape it through the setters below; the dispatcher finalizes it
//! exactly once with [`Response::send`], which yields the [`SentResponse`] the
//! host writes to the wire (header lines, then status, then body bytes).
//!
//! Redirects mark the response as halted. The dispatcher checks this flag
//! after every middleware, so a middleware that redirects stops the chain
//! just like one that returns [`Reply`] content.

use crate::config::AppConfig;
use crate::error::DispatchError;
use crate::markdown::MarkdownRenderer;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identification header added to every finalized response.
pub const POWERED_BY_HEADER: &str = "X-Powered-By";
/// Value of [`POWERED_BY_HEADER`].
pub const POWERED_BY: &str = "metime";
/// Complete identification header line.
pub const POWERED_BY_LINE: &str = "X-Powered-By: metime";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Payload a handler returns, or a middleware returns to halt the chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    /// Keep whatever the response already holds.
    #[default]
    Empty,
    /// Plain text body.
    Text(String),
    /// HTML body.
    Html(String),
    /// Markdown rendered to HTML.
    Markdown(String),
    /// JSON body.
    Json(Value),
}

impl Reply {
    /// Plain text reply.
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Text(body.into())
    }

    /// HTML reply.
    pub fn html(body: impl Into<String>) -> Self {
        Reply::Html(body.into())
    }

    /// Markdown reply, rendered to HTML when applied.
    pub fn markdown(body: impl Into<String>) -> Self {
        Reply::Markdown(body.into())
    }

    /// JSON reply.
    pub fn json(body: impl Into<Value>) -> Self {
        Reply::Json(body.into())
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Reply::Text(body.to_string())
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Reply::Text(body)
    }
}

impl From<Value> for Reply {
    fn from(body: Value) -> Self {
        Reply::Json(body)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

/// A `Set-Cookie` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: Option<Duration>,
    path: Option<String>,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// Session cookie with the given name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    /// Expire the cookie after `ttl`. A zero duration deletes it.
    #[must_use]
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.max_age = Some(ttl);
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Render the `Set-Cookie` header value.
    ///
    /// The name and value are percent-encoded. `Path` and `Domain` lose any
    /// `;` and control characters so they cannot open another attribute or
    /// header line.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut out = format!(
            "{}={}",
            urlencoding::encode(&self.name),
            urlencoding::encode(&self.value)
        );
        if let Some(ttl) = self.max_age {
            out.push_str(&format!("; Max-Age={}", ttl.as_secs()));
        }
        if let Some(path) = &self.path {
            out.push_str(&format!("; Path={}", attribute_value(path)));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={}", attribute_value(domain)));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

fn attribute_value(raw: &str) -> Cow<'_, str> {
    if raw.chars().any(|c| c == ';' || c.is_control()) {
        Cow::Owned(raw.chars().filter(|c| *c != ';' && !c.is_control()).collect())
    } else {
        Cow::Borrowed(raw)
    }
}

/// Build `base_url?<queries>&<action_key>=<action>`.
///
/// A query already present in the base URL is kept and extended with `&`.
/// An existing `action_key` entry in `queries` is overwritten in place;
/// otherwise the pair is appended.
pub fn action_url<I, K, V>(config: &AppConfig, action: &str, queries: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = queries
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();
    match pairs.iter_mut().find(|(k, _)| *k == config.action_key) {
        Some(pair) => pair.1 = action.to_string(),
        None => pairs.push((config.action_key.clone(), action.to_string())),
    }

    let mut target = config.base_url().to_string();
    let start = match target.find('?') {
        Some(at) => at + 1,
        None => {
            target.push('?');
            target.len()
        }
    };
    url::form_urlencoded::Serializer::for_suffix(target, start)
        .extend_pairs(pairs.iter())
        .finish()
}

/// Mutable response accumulator for one dispatch cycle.
pub struct Response {
    status: u16,
    headers: Vec<String>,
    body: Vec<u8>,
    halted: bool,
    config: Arc<AppConfig>,
    markdown: Arc<dyn MarkdownRenderer>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_bytes", &self.body.len())
            .field("halted", &self.halted)
            .finish()
    }
}

impl Response {
    /// Empty 200 response.
    pub fn new(config: Arc<AppConfig>, markdown: Arc<dyn MarkdownRenderer>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
            halted: false,
            config,
            markdown,
        }
    }

    /// Fresh response sharing this one's configuration and renderer.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self::new(Arc::clone(&self.config), Arc::clone(&self.markdown))
    }

    /// Set the status code.
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    /// Append a header line.
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.push(format!("{name}: {value}"));
        self
    }

    /// Replace every header line with this name (case-insensitive).
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers
            .retain(|line| !header_name(line).eq_ignore_ascii_case(name));
        self.header(name, value)
    }

    /// Serialize `data` as the JSON body.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Response`] if `data` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<&mut Self, DispatchError> {
        let body = serde_json::to_vec(data).map_err(|err| DispatchError::Response {
            message: "JSON serialization error".to_string(),
            source: Some(err.into()),
        })?;
        self.set_header("Content-Type", JSON_CONTENT_TYPE);
        self.body = body;
        Ok(self)
    }

    /// Set a plain body from a string or number.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Response`] for any other value (objects, arrays,
    /// booleans, null).
    pub fn body(&mut self, body: impl Into<Value>) -> Result<&mut Self, DispatchError> {
        match body.into() {
            Value::String(s) => self.body = s.into_bytes(),
            Value::Number(n) => self.body = n.to_string().into_bytes(),
            _ => {
                return Err(DispatchError::response(
                    "Unsupported response body. Only strings and numbers are accepted",
                ))
            }
        }
        Ok(self)
    }

    /// Set a plain-text body.
    pub fn text(&mut self, body: impl Into<String>) -> &mut Self {
        self.set_header("Content-Type", TEXT_CONTENT_TYPE);
        self.body = body.into().into_bytes();
        self
    }

    /// Set an HTML body.
    pub fn html(&mut self, html: impl Into<String>) -> &mut Self {
        self.set_header("Content-Type", HTML_CONTENT_TYPE);
        self.body = html.into().into_bytes();
        self
    }

    /// Render Markdown to HTML and set it as the body.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Response`] wrapping the renderer failure.
    pub fn markdown(&mut self, markdown: &str) -> Result<&mut Self, DispatchError> {
        let html = self
            .markdown
            .render(markdown)
            .map_err(|err| DispatchError::Response {
                message: "Markdown conversion error".to_string(),
                source: Some(err),
            })?;
        Ok(self.html(html))
    }

    /// Add a `Set-Cookie` header.
    pub fn cookie(&mut self, cookie: &Cookie) -> &mut Self {
        self.header("Set-Cookie", &cookie.header_value())
    }

    /// Redirect to another action of this application.
    ///
    /// The target is `base_url` with `queries` plus `action_key=action`.
    /// Issues 301 when `permanent`, otherwise 302, and halts the cycle.
    pub fn redirect<I, K, V>(&mut self, action: &str, queries: I, permanent: bool) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = action_url(&self.config, action, queries);
        self.redirect_away(&url, permanent)
    }

    /// Redirect to an arbitrary URL and halt the cycle.
    pub fn redirect_away(&mut self, url: &str, permanent: bool) -> &mut Self {
        self.status = if permanent { 301 } else { 302 };
        self.set_header("Location", url);
        self.halted = true;
        self
    }

    /// Whether a redirect has ended the cycle.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Current status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Header lines accumulated so far.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Value of the last header line with this name.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header_line(&self.headers, name)
    }

    /// Body bytes accumulated so far.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Write a [`Reply`] into the response.
    ///
    /// A reply is ignored once a redirect has halted the cycle, so the
    /// redirect is never overwritten.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Response`] when Markdown conversion fails.
    pub fn apply(&mut self, reply: Reply) -> Result<(), DispatchError> {
        if self.halted {
            return Ok(());
        }
        match reply {
            Reply::Empty => {}
            Reply::Text(body) => {
                self.text(body);
            }
            Reply::Html(body) => {
                self.html(body);
            }
            Reply::Markdown(body) => {
                self.markdown(&body)?;
            }
            Reply::Json(body) => {
                self.json(&body)?;
            }
        }
        Ok(())
    }

    /// Finalize the response. This is the last effect of a dispatch cycle.
    #[must_use]
    pub fn send(self) -> SentResponse {
        let mut headers = self.headers;
        headers.push(POWERED_BY_LINE.to_string());
        SentResponse {
            headers,
            status: self.status,
            body: self.body,
        }
    }
}

/// Finalized response, in emission order: header lines, status, body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentResponse {
    /// `Name: value` header lines
    pub headers: Vec<String>,
    /// HTTP status code
    pub status: u16,
    /// Body bytes
    pub body: Vec<u8>,
}

impl SentResponse {
    /// Value of the last header line with this name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header_line(&self.headers, name)
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn header_name(line: &str) -> &str {
    line.split_once(':').map_or(line, |(name, _)| name.trim())
}

fn find_header_line<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    lines.iter().rev().find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}
