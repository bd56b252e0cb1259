//! Transport seam and the reqwest-backed default transport

use crate::config::ClientConfig;
use crate::error::{sanitize_error_message, HttpError, HttpResult};
use crate::request::PreparedRequest;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use oauth2_line_common::http::HttpMethod;
use std::collections::HashMap;
use std::time::Instant;
use url::Url;

/// Raw reply from a transport, before status classification
#[derive(Debug, Clone, Default)]
pub struct RawReply {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub url: String,
    pub latency_ms: u64,
}

/// Dispatches prepared requests.
///
/// Implementations must not follow redirects themselves: the pipeline
/// needs to see every 3xx reply to enforce its own limit.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolves `target` against `base` and merges `params` into the query.
    ///
    /// Absolute targets ignore `base`. Relative targets are appended to the
    /// base path, or to the host root when they start with `/`.
    fn build_url(
        &self,
        base: Option<&str>,
        target: &str,
        params: &HashMap<String, String>,
    ) -> HttpResult<Url> {
        build_url(base, target, params)
    }

    /// Sends one request and returns the reply without interpreting it.
    async fn run_request(&self, request: PreparedRequest) -> HttpResult<RawReply>;
}

/// See [`Transport::build_url`].
pub fn build_url(
    base: Option<&str>,
    target: &str,
    params: &HashMap<String, String>,
) -> HttpResult<Url> {
    let mut url = match Url::parse(target) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| {
                HttpError::InvalidUrl(format!(
                    "relative target '{}' requires a configured site",
                    target
                ))
            })?;
            let mut base = Url::parse(base)?;
            if !base.path().ends_with('/') {
                let path = format!("{}/", base.path());
                base.set_path(&path);
            }
            base.join(target)?
        }
        Err(e) => return Err(e.into()),
    };

    if !params.is_empty() {
        let mut pairs: Vec<_> = params.iter().collect();
        pairs.sort();
        url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(url)
}

/// Connection-pooled transport backed by `reqwest`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the underlying client from the transport knobs of `config`.
    pub fn new(config: &ClientConfig) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            // the pipeline follows redirects itself
            .redirect(reqwest::redirect::Policy::none())
            .gzip(config.gzip)
            .brotli(config.brotli)
            .build()?;

        Ok(Self { client })
    }

    /// Wraps an existing client. Its redirect policy must be `none`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => http::Method::GET,
        HttpMethod::Post => http::Method::POST,
        HttpMethod::Put => http::Method::PUT,
        HttpMethod::Patch => http::Method::PATCH,
        HttpMethod::Delete => http::Method::DELETE,
        HttpMethod::Head => http::Method::HEAD,
        HttpMethod::Options => http::Method::OPTIONS,
    }
}

fn to_header_map(headers: &HashMap<String, String>) -> HttpResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::InvalidRequest(format!("header '{}': {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn classify_reqwest_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(sanitize_error_message(&err.to_string()))
    } else if err.is_connect() {
        HttpError::Connection(sanitize_error_message(&err.to_string()))
    } else {
        HttpError::Reqwest(err)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn run_request(&self, request: PreparedRequest) -> HttpResult<RawReply> {
        let start = Instant::now();

        let url = Url::parse(&request.url)?;
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url)
            .headers(to_header_map(&request.headers)?);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status_code = response.status().as_u16();
        let url = response.url().to_string();

        let mut headers = HashMap::new();
        for (name, value) in response.headers().iter() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }

        let body = response.bytes().await.map_err(classify_reqwest_error)?;
        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(RawReply {
            status_code,
            headers,
            body,
            url,
            latency_ms,
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}
