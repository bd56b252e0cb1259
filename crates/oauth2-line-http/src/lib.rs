//! oauth2-line-http: OAuth2 request pipeline for LINE
//!
//! LINE serves its browser flows from `access.line.me` and its API from
//! `api.line.me`. This crate issues OAuth2 requests so that either host can
//! be used as a target, follows redirects itself and classifies replies by
//! status code.
//!
//! # Architecture
//!
//! - `OAuth2Client`: the request pipeline (`execute` / `execute_with`)
//! - `ClientConfig`: site, redirect limit, raise-errors default, debug flag
//! - `RequestOptions`: per-call params, body, headers, parse mode, overrides
//! - `Transport`: the dispatch seam, with `ReqwestTransport` as the default
//! - `Response` / `OAuth2Error`: the typed reply and its failure wrapper

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod request;
pub mod response;
pub mod rewrite;
pub mod transport;

pub use client::OAuth2Client;
pub use config::ClientConfig;
pub use error::{ClientError, HttpError, HttpResult, OAuth2Error};
pub use request::{PreparedRequest, RequestBody, RequestOptions};
pub use response::{ParseMode, ParsedBody, Response, ResponseBuilder};
pub use rewrite::HostRewrite;
pub use transport::{RawReply, ReqwestTransport, Transport};

// Re-export shared HTTP types from oauth2-line-common
pub use oauth2_line_common::http::{
    HttpMethod, HttpRequestLike, HttpResponseLike, HttpStatus, StatusClass,
};
