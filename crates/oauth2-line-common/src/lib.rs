//! Common HTTP vocabulary for oauth2-line
//!
//! Method and status types plus the request/response traits shared by the
//! pipeline and its transports.

pub mod http;

pub use http::{HttpMethod, HttpRequestLike, HttpResponseLike, HttpStatus, StatusClass};
