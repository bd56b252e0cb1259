//! Shared HTTP types for the oauth2-line pipeline.

use std::collections::HashMap;
use std::fmt;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the pipeline treats a reply with a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 301, 302, 303 or 307: follow the `Location` header.
    Redirect,
    /// Any other 2xx or 3xx status.
    Success,
    /// 4xx or 5xx.
    Failure,
    /// Everything else, 1xx included.
    Unhandled,
}

/// HTTP status code wrapper with helper methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HttpStatus(pub u16);

impl HttpStatus {
    /// 303 See Other: the follow-up is always a body-less GET.
    pub const SEE_OTHER: Self = Self(303);

    /// Returns the status code as u16.
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Returns true if this is a success status (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Returns true if this is a client error status (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Returns true if this is a server error status (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    /// Returns true for the statuses the pipeline follows.
    ///
    /// 308 is not followed; it is returned like any other 3xx.
    pub fn is_followable_redirect(&self) -> bool {
        matches!(self.0, 301 | 302 | 303 | 307)
    }

    /// Classifies the status for the request pipeline.
    pub fn class(&self) -> StatusClass {
        if self.is_followable_redirect() {
            return StatusClass::Redirect;
        }
        match self.0 {
            200..=399 => StatusClass::Success,
            400..=599 => StatusClass::Failure,
            _ => StatusClass::Unhandled,
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for HttpStatus {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.0
    }
}

/// Trait for types that represent HTTP responses.
pub trait HttpResponseLike {
    /// Returns the HTTP status code.
    fn status_code(&self) -> u16;

    /// Returns the response headers.
    fn headers(&self) -> &HashMap<String, String>;

    /// Returns the response body as bytes.
    fn body_bytes(&self) -> &[u8];

    /// Returns the HTTP status.
    fn status(&self) -> HttpStatus {
        HttpStatus(self.status_code())
    }

    /// Returns true if this is a success response (2xx).
    fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Returns true if this is a client error response (4xx).
    fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Returns true if this is a server error response (5xx).
    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Gets a header value by name (case-insensitive).
    fn header(&self, name: &str) -> Option<&str> {
        find_header(self.headers(), name)
    }

    /// Returns the Content-Type header value.
    fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns the Location header value.
    fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

/// Trait for types that represent HTTP requests.
pub trait HttpRequestLike {
    /// Returns the HTTP method.
    fn method(&self) -> HttpMethod;

    /// Returns the request URL.
    fn url(&self) -> &str;

    /// Returns the request headers.
    fn headers(&self) -> &HashMap<String, String>;

    /// Returns the request body as bytes, if present.
    fn body_bytes(&self) -> Option<&[u8]>;

    /// Gets a header value by name (case-insensitive).
    fn header(&self, name: &str) -> Option<&str> {
        find_header(self.headers(), name)
    }

    /// Returns the Content-Type header value.
    fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
