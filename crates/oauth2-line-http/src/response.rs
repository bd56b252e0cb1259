//! Response types

use crate::error::{HttpError, HttpResult, OAuth2Error};
use crate::transport::RawReply;
use oauth2_line_common::http::HttpResponseLike;
use std::collections::HashMap;
use std::time::Duration;

/// Content types decoded as JSON in [`ParseMode::Automatic`].
const JSON_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "text/javascript",
    "application/hal+json",
    "application/vnd.api+json",
];

/// Content types decoded as a query string in [`ParseMode::Automatic`].
const QUERY_CONTENT_TYPES: &[&str] = &["application/x-www-form-urlencoded", "text/plain"];

/// How [`Response::parsed`] decodes the body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Pick a decoder from the Content-Type header
    #[default]
    Automatic,
    /// Always decode as JSON
    Json,
    /// Always decode as `application/x-www-form-urlencoded`
    Query,
    /// Never decode, return the text
    Text,
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(serde_json::Value),
    Query(HashMap<String, String>),
    Text(String),
}

impl ParsedBody {
    /// Looks up a top-level string field in a JSON object or query body.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self {
            ParsedBody::Json(value) => value.get(key).and_then(|v| v.as_str()),
            ParsedBody::Query(pairs) => pairs.get(key).map(String::as_str),
            ParsedBody::Text(_) => None,
        }
    }
}

/// Typed wrapper over one transport reply.
///
/// Immutable apart from [`attach_error`](Self::attach_error), which the
/// pipeline uses when a 4xx/5xx status is returned instead of raised.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status_code: u16,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Response body as bytes
    pub body: Vec<u8>,

    /// URL the reply came from (after host rewriting)
    pub url: String,

    /// Round-trip latency of this hop in milliseconds
    pub latency_ms: u64,

    /// Redirects followed by the logical call that produced this response
    pub redirect_count: usize,

    parse_mode: ParseMode,
    error: Option<Box<OAuth2Error>>,
}

impl Response {
    /// Wraps a raw transport reply.
    pub fn from_reply(reply: RawReply, parse_mode: ParseMode) -> Self {
        Self {
            status_code: reply.status_code,
            headers: reply.headers,
            body: reply.body.to_vec(),
            url: reply.url,
            latency_ms: reply.latency_ms,
            redirect_count: 0,
            parse_mode,
            error: None,
        }
    }

    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    /// The error attached when a failure status was not raised.
    pub fn error(&self) -> Option<&OAuth2Error> {
        self.error.as_deref()
    }

    /// Attaches the error for a suppressed failure status.
    pub fn attach_error(&mut self, error: OAuth2Error) {
        self.error = Some(Box::new(error));
    }

    /// Get body as text (UTF-8)
    pub fn text(&self) -> HttpResult<String> {
        String::from_utf8(self.body.clone())
            .map_err(|e| HttpError::ResponseError(format!("Invalid UTF-8 in response: {}", e)))
    }

    /// Get body as JSON
    pub fn json(&self) -> HttpResult<serde_json::Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::Json(format!("Failed to parse JSON: {}", e)))
    }

    /// Get body as JSON and deserialize to type
    pub fn json_as<T: serde::de::DeserializeOwned>(&self) -> HttpResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::Json(format!("Failed to deserialize JSON: {}", e)))
    }

    /// Decodes the body according to the parse mode.
    pub fn parsed(&self) -> HttpResult<ParsedBody> {
        match self.effective_parse_mode() {
            ParseMode::Json => self.json().map(ParsedBody::Json),
            ParseMode::Query => Ok(ParsedBody::Query(
                url::form_urlencoded::parse(&self.body)
                    .into_owned()
                    .collect(),
            )),
            ParseMode::Text | ParseMode::Automatic => self.text().map(ParsedBody::Text),
        }
    }

    fn effective_parse_mode(&self) -> ParseMode {
        if self.parse_mode != ParseMode::Automatic {
            return self.parse_mode;
        }
        let mime = self
            .content_type()
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase());
        match mime.as_deref() {
            Some(m) if JSON_CONTENT_TYPES.contains(&m) => ParseMode::Json,
            Some(m) if QUERY_CONTENT_TYPES.contains(&m) => ParseMode::Query,
            _ => ParseMode::Text,
        }
    }

    /// Get raw bytes
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Get latency as Duration
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Check if content type is JSON
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false)
    }
}

impl HttpResponseLike for Response {
    fn status_code(&self) -> u16 {
        self.status_code
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Builder for creating Response values (used by tests and fake transports)
#[derive(Debug)]
pub struct ResponseBuilder {
    status_code: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    url: String,
    latency_ms: u64,
    parse_mode: ParseMode,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            url: String::new(),
            latency_ms: 0,
            parse_mode: ParseMode::Automatic,
        }
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn build(self) -> Response {
        Response {
            status_code: self.status_code,
            headers: self.headers,
            body: self.body,
            url: self.url,
            latency_ms: self.latency_ms,
            redirect_count: 0,
            parse_mode: self.parse_mode,
            error: None,
        }
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
