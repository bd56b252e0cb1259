//! Wire logging
//!
//! Hop logging is emitted as `tracing` events on the [`WIRE_TARGET`] target
//! and only when the client's `debug` flag is set. A client built with
//! `debug` on calls [`init_debug_logging`], which installs a stdout
//! subscriber unless the program already has one.

use crate::error::sanitize_error_message;
use crate::request::PreparedRequest;
use crate::response::Response;
use std::collections::HashMap;

/// Environment variable that turns on wire logging.
pub const DEBUG_ENV_VAR: &str = "OAUTH_DEBUG";

/// Tracing target for hop logging.
pub const WIRE_TARGET: &str = "oauth2_line::wire";

/// Returns true when `OAUTH_DEBUG` is exactly `true`.
pub fn debug_enabled() -> bool {
    is_enabled_value(std::env::var(DEBUG_ENV_VAR).ok().as_deref())
}

fn is_enabled_value(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Installs a stdout fmt subscriber showing wire logs.
///
/// `RUST_LOG` wins when set. Does nothing if a global subscriber exists.
pub fn init_debug_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{}=info", WIRE_TARGET)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized
}

pub(crate) fn log_request(request: &PreparedRequest) {
    tracing::info!(
        target: WIRE_TARGET,
        method = %request.method,
        url = %sanitize_error_message(&request.url),
        headers = %format_headers(&request.headers),
        body_len = request.body.as_ref().map_or(0, |b| b.len()),
        "request"
    );
}

pub(crate) fn log_response(response: &Response) {
    tracing::info!(
        target: WIRE_TARGET,
        status = response.status_code,
        url = %sanitize_error_message(&response.url),
        latency_ms = response.latency_ms,
        headers = %format_headers(&response.headers),
        body_len = response.body.len(),
        "response"
    );
}

fn format_headers(headers: &HashMap<String, String>) -> String {
    let mut pairs: Vec<_> = headers
        .iter()
        .map(|(k, v)| {
            if k.eq_ignore_ascii_case("authorization") {
                format!("{}: [REDACTED]", k)
            } else {
                format!("{}: {}", k, v)
            }
        })
        .collect();
    pairs.sort();
    pairs.join(", ")
}
