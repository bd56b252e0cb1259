//! Error types for the request pipeline

use crate::response::{ParsedBody, Response};
use oauth2_line_common::http::HttpResponseLike;
use thiserror::Error;

/// Transport-level and decoding errors
#[derive(Error, Debug)]
pub enum HttpError {
    /// Connection failed (DNS, TCP, TLS)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Invalid request configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response decoding error
    #[error("Response error: {0}")]
    ResponseError(String),

    /// Redirect could not be followed
    #[error("Redirect error: {0}")]
    Redirect(String),

    /// Target could not be resolved into a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// Generic reqwest error
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type for transport operations
pub type HttpResult<T> = Result<T, HttpError>;

/// Error category for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorCategory {
    /// Connection-related errors (DNS, TCP, TLS)
    Connection,
    /// Timeout errors
    Timeout,
    /// Invalid request construction
    Request,
    /// Response decoding errors
    Response,
    /// Redirect errors
    Redirect,
    /// Unknown/other errors
    Unknown,
}

impl HttpError {
    /// Categorize the error for reporting
    pub fn category(&self) -> HttpErrorCategory {
        match self {
            HttpError::Connection(_) => HttpErrorCategory::Connection,
            HttpError::Timeout(_) => HttpErrorCategory::Timeout,
            HttpError::InvalidRequest(_) | HttpError::InvalidUrl(_) => HttpErrorCategory::Request,
            HttpError::ResponseError(_) | HttpError::Json(_) => HttpErrorCategory::Response,
            HttpError::Redirect(_) => HttpErrorCategory::Redirect,
            HttpError::Reqwest(e) => {
                if e.is_connect() {
                    HttpErrorCategory::Connection
                } else if e.is_timeout() {
                    HttpErrorCategory::Timeout
                } else if e.is_redirect() {
                    HttpErrorCategory::Redirect
                } else if e.is_request() {
                    HttpErrorCategory::Request
                } else {
                    HttpErrorCategory::Unknown
                }
            }
            HttpError::UrlParse(_) => HttpErrorCategory::Request,
        }
    }

    /// Error message with credentials, tokens and internal addresses redacted
    pub fn sanitized_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Redacts credentials, OAuth2 secrets and internal IPs from a message.
pub fn sanitize_error_message(msg: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    static INTERNAL_IP_RE: OnceLock<Regex> = OnceLock::new();
    static SECRET_RE: OnceLock<Regex> = OnceLock::new();

    let url_creds_re = URL_CREDS_RE
        .get_or_init(|| Regex::new(r"https?://[^@:/]+:[^@/]+@").expect("valid regex"));
    let internal_ip_re = INTERNAL_IP_RE.get_or_init(|| {
        Regex::new(r"\b(10\.|172\.(1[6-9]|2[0-9]|3[01])\.|192\.168\.)\d+\.\d+\b")
            .expect("valid regex")
    });
    let secret_re = SECRET_RE.get_or_init(|| {
        Regex::new(
            r"(?i)(authorization:\s*bearer|bearer|api[_-]?key|client_secret|refresh_token|access_token|token)\s*[:=]?\s*[^\s&]+",
        )
        .expect("valid regex")
    });

    let sanitized = url_creds_re.replace_all(msg, "https://[REDACTED]@");
    let sanitized = internal_ip_re.replace_all(&sanitized, "[INTERNAL_IP]");
    let sanitized = secret_re.replace_all(&sanitized, "$1: [REDACTED]");

    sanitized.to_string()
}

/// Failure wrapper around the response that triggered it.
///
/// Built once per failing (4xx/5xx) or unhandled status. When the body
/// decodes into a mapping, the OAuth2 `error` and `error_description`
/// fields are lifted into [`code`](Self::code) and
/// [`description`](Self::description).
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct OAuth2Error {
    response: Response,
    code: Option<String>,
    description: Option<String>,
    message: String,
}

impl OAuth2Error {
    /// Builds an error whose message is derived from the response body.
    pub fn new(response: Response) -> Self {
        let (code, description) = oauth2_fields(&response);
        let body = String::from_utf8_lossy(response.body_bytes()).into_owned();

        let message = match (&code, &description) {
            (None, None) => body,
            _ => format!(
                "{}: {}\n{}",
                code.as_deref().unwrap_or_default(),
                description.as_deref().unwrap_or_default(),
                body
            ),
        };

        Self {
            response,
            code,
            description,
            message,
        }
    }

    /// Builds an error carrying an explicit message.
    pub fn with_message(response: Response, message: impl Into<String>) -> Self {
        let (code, description) = oauth2_fields(&response);
        Self {
            response,
            code,
            description,
            message: message.into(),
        }
    }

    /// The response that triggered this error.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// OAuth2 `error` field, when the body carried one.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// OAuth2 `error_description` field, when the body carried one.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> u16 {
        self.response.status_code()
    }
}

fn oauth2_fields(response: &Response) -> (Option<String>, Option<String>) {
    match response.parsed() {
        Ok(ParsedBody::Json(serde_json::Value::Object(map))) => {
            let field = |key: &str| match map.get(key) {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            };
            (field("error"), field("error_description"))
        }
        Ok(ParsedBody::Query(pairs)) => (
            pairs.get("error").cloned(),
            pairs.get("error_description").cloned(),
        ),
        _ => (None, None),
    }
}

/// Errors surfaced by [`OAuth2Client::execute`](crate::OAuth2Client::execute)
#[derive(Error, Debug)]
pub enum ClientError {
    /// 4xx/5xx reply while raise-errors was in effect
    #[error("HTTP status {}: {}", .0.status_code(), .0)]
    Status(Box<OAuth2Error>),

    /// Status outside every handled range; raised regardless of settings
    #[error("{0}")]
    UnhandledStatus(Box<OAuth2Error>),

    /// Transport, URL or decoding failure
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl ClientError {
    /// The wrapped OAuth2 error for status failures.
    pub fn oauth2_error(&self) -> Option<&OAuth2Error> {
        match self {
            ClientError::Status(e) | ClientError::UnhandledStatus(e) => Some(e),
            ClientError::Http(_) => None,
        }
    }

    /// The response behind a status failure.
    pub fn response(&self) -> Option<&Response> {
        self.oauth2_error().map(OAuth2Error::response)
    }

    pub fn is_status_error(&self) -> bool {
        matches!(self, ClientError::Status(_))
    }

    pub fn is_unhandled_status(&self) -> bool {
        matches!(self, ClientError::UnhandledStatus(_))
    }
}
