//! Per-call options and the outgoing request handed to transports

use crate::response::ParseMode;
use bytes::Bytes;
use oauth2_line_common::http::{HttpMethod, HttpRequestLike};
use std::collections::HashMap;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Raw bytes, sent as-is
    Bytes(Bytes),
    /// Text, sent as UTF-8
    Text(String),
    /// Structured mapping, sent form-urlencoded
    Form(HashMap<String, String>),
}

impl RequestBody {
    /// Encodes the body into wire bytes.
    pub fn encode(&self) -> Bytes {
        match self {
            RequestBody::Bytes(b) => b.clone(),
            RequestBody::Text(t) => Bytes::from(t.clone()),
            RequestBody::Form(fields) => {
                let mut pairs: Vec<_> = fields.iter().collect();
                pairs.sort();
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                Bytes::from(encoded)
            }
        }
    }

    /// Content-Type implied by the body, if any.
    pub fn implied_content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Form(_) => Some(FORM_CONTENT_TYPE),
            _ => None,
        }
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(bytes))
    }
}

impl From<HashMap<String, String>> for RequestBody {
    fn from(fields: HashMap<String, String>) -> Self {
        RequestBody::Form(fields)
    }
}

/// Options for one logical call.
///
/// All fields are optional. `redirect_count` is carried across the whole
/// redirect chain of the call and starts at zero.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra query parameters merged into the target URL
    pub params: HashMap<String, String>,
    /// Request body
    pub body: Option<RequestBody>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// How the response body is decoded
    pub parse: ParseMode,
    /// Overrides the client's raise-errors default when set
    pub raise_errors: Option<bool>,
    /// Redirects already followed
    pub redirect_count: usize,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a form-urlencoded body from key/value pairs
    pub fn form<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn parse(mut self, mode: ParseMode) -> Self {
        self.parse = mode;
        self
    }

    pub fn raise_errors(mut self, raise: bool) -> Self {
        self.raise_errors = Some(raise);
        self
    }

    pub fn redirect_count(mut self, count: usize) -> Self {
        self.redirect_count = count;
        self
    }

    /// Resolves the raise-errors setting against the client default.
    pub fn resolve_raise_errors(&self, default: bool) -> bool {
        self.raise_errors.unwrap_or(default)
    }
}

/// A fully resolved request, ready for a transport.
///
/// This is what the pre-send hook receives and may adjust.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
}

impl PreparedRequest {
    pub fn new(
        method: HttpMethod,
        url: impl Into<String>,
        headers: HashMap<String, String>,
        body: Option<&RequestBody>,
    ) -> Self {
        let mut headers = headers;
        if let Some(content_type) = body.and_then(RequestBody::implied_content_type) {
            let present = headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("content-type"));
            if !present {
                headers.insert("Content-Type".to_string(), content_type.to_string());
            }
        }

        Self {
            method,
            url: url.into(),
            headers,
            body: body.map(RequestBody::encode),
        }
    }

    /// Set or replace a header
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }
}

impl HttpRequestLike for PreparedRequest {
    fn method(&self) -> HttpMethod {
        self.method
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new()
            .param("client_id", "1234")
            .header("Accept", "application/json")
            .body("payload")
            .raise_errors(false);

        assert_eq!(options.params.get("client_id").map(String::as_str), Some("1234"));
        assert_eq!(options.body, Some(RequestBody::Text("payload".to_string())));
        assert_eq!(options.redirect_count, 0);
        assert_eq!(options.parse, ParseMode::Automatic);
    }

    #[test]
    fn test_resolve_raise_errors() {
        let inherit = RequestOptions::new();
        assert!(inherit.resolve_raise_errors(true));
        assert!(!inherit.resolve_raise_errors(false));

        let suppress = RequestOptions::new().raise_errors(false);
        assert!(!suppress.resolve_raise_errors(true));

        let force = RequestOptions::new().raise_errors(true);
        assert!(force.resolve_raise_errors(false));
    }

    #[test]
    fn test_form_body_sets_content_type() {
        let options = RequestOptions::new().form([
            ("grant_type", "authorization_code"),
            ("redirect_uri", "https://example.com/cb"),
        ]);
        let request = PreparedRequest::new(
            HttpMethod::Post,
            "https://api.line.me/oauth2/v2.1/token",
            options.headers.clone(),
            options.body.as_ref(),
        );

        assert_eq!(
            request.content_type(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            request.body_bytes(),
            Some(
                &b"grant_type=authorization_code&redirect_uri=https%3A%2F%2Fexample.com%2Fcb"[..]
            )
        );
    }

    #[test]
    fn test_form_body_keeps_caller_content_type() {
        let options = RequestOptions::new()
            .header("content-type", "application/x-custom")
            .form([("a", "b")]);
        let request = PreparedRequest::new(
            HttpMethod::Post,
            "https://api.line.me/x",
            options.headers.clone(),
            options.body.as_ref(),
        );

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.content_type(), Some("application/x-custom"));
    }

    #[test]
    fn test_no_body() {
        let request = PreparedRequest::new(
            HttpMethod::Get,
            "https://api.line.me/v2/profile",
            HashMap::new(),
            None,
        );
        assert!(request.body_bytes().is_none());
        assert!(request.headers.is_empty());
    }
}
