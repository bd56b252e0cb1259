//! OAuth2 request pipeline

use crate::config::ClientConfig;
use crate::error::{ClientError, HttpError, HttpResult, OAuth2Error};
use crate::logging;
use crate::request::{PreparedRequest, RequestOptions};
use crate::response::Response;
use crate::transport::{ReqwestTransport, Transport};
use oauth2_line_common::http::{HttpMethod, HttpResponseLike, HttpStatus, StatusClass};
use std::sync::Arc;

/// Callback that may adjust each outgoing request right before it is sent.
pub type PreSendHook<'a> = &'a (dyn Fn(&mut PreparedRequest) + Send + Sync);

/// OAuth2 client issuing requests relative to a configured site.
///
/// Every hop has `access.line.me` rewritten to `api.line.me`, 301/302/303/307
/// replies are followed up to `max_redirects`, and 4xx/5xx replies are
/// either raised or returned with the error attached.
///
/// # Example
///
/// ```ignore
/// use oauth2_line_http::{ClientConfig, HttpMethod, OAuth2Client, RequestOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::from_env().site("https://access.line.me");
///     let client = OAuth2Client::new(config)?;
///
///     let options = RequestOptions::new()
///         .form([("grant_type", "authorization_code"), ("code", "abc")]);
///     let response = client
///         .execute(HttpMethod::Post, "/oauth2/v2.1/token", options)
///         .await?;
///     println!("Status: {}", response.status_code);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct OAuth2Client {
    inner: Arc<OAuth2ClientInner>,
}

struct OAuth2ClientInner {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl OAuth2Client {
    /// Create a client backed by the reqwest transport
    pub fn new(config: ClientConfig) -> HttpResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client with default configuration
    pub fn default_client() -> HttpResult<Self> {
        Self::new(ClientConfig::default())
    }

    /// Create a client dispatching through `transport`
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    /// Create a client sharing an existing transport
    ///
    /// A config with `debug` set also installs the stdout wire logger.
    pub fn with_shared_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        if config.debug {
            logging::init_debug_logging();
        }
        Self {
            inner: Arc::new(OAuth2ClientInner { transport, config }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get the site relative targets resolve against
    pub fn site(&self) -> Option<&str> {
        self.inner.config.site.as_deref()
    }

    /// Issue a request and classify the reply.
    ///
    /// Returns `Err` for 4xx/5xx only when raise-errors is in effect (the
    /// per-call override wins over the config default), and always for
    /// statuses outside the handled ranges. A redirect chain longer than
    /// `max_redirects` ends with the last 3xx response returned as `Ok`.
    pub async fn execute(
        &self,
        method: HttpMethod,
        target: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        self.run(method, target, options, None).await
    }

    /// Like [`execute`](Self::execute), with `hook` applied to the first
    /// request before it is sent. Redirect hops are sent without it, so
    /// headers it adds never follow a `Location` to another host.
    pub async fn execute_with<F>(
        &self,
        method: HttpMethod,
        target: &str,
        options: RequestOptions,
        hook: F,
    ) -> Result<Response, ClientError>
    where
        F: Fn(&mut PreparedRequest) + Send + Sync,
    {
        let hook: PreSendHook<'_> = &hook;
        self.run(method, target, options, Some(hook)).await
    }

    async fn run(
        &self,
        mut method: HttpMethod,
        target: &str,
        mut options: RequestOptions,
        mut hook: Option<PreSendHook<'_>>,
    ) -> Result<Response, ClientError> {
        let config = &self.inner.config;
        let transport = &self.inner.transport;
        let raise_errors = options.resolve_raise_errors(config.raise_errors);
        let mut target = target.to_string();

        loop {
            let mut url = transport.build_url(config.site.as_deref(), &target, &options.params)?;
            if config.host_rewrite.apply(&mut url) {
                tracing::trace!(
                    from = config.host_rewrite.from_host(),
                    to = config.host_rewrite.to_host(),
                    "rewrote request host"
                );
            }

            let mut request = PreparedRequest::new(
                method,
                url.as_str(),
                options.headers.clone(),
                options.body.as_ref(),
            );
            if let Some(hook) = hook.take() {
                hook(&mut request);
            }
            if config.debug {
                logging::log_request(&request);
            }

            let reply = transport.run_request(request).await?;
            let mut response = Response::from_reply(reply, options.parse);
            response.redirect_count = options.redirect_count;
            if config.debug {
                logging::log_response(&response);
            }

            match response.status().class() {
                StatusClass::Redirect => {
                    options.redirect_count = options.redirect_count.saturating_add(1);
                    if options.redirect_count > config.max_redirects {
                        tracing::debug!(
                            max_redirects = config.max_redirects,
                            status = response.status_code,
                            "redirect limit reached, returning last response"
                        );
                        return Ok(response);
                    }

                    if response.status() == HttpStatus::SEE_OTHER {
                        method = HttpMethod::Get;
                        options.body = None;
                    }

                    let location = response.location().ok_or_else(|| {
                        HttpError::Redirect(format!(
                            "{} reply without a Location header",
                            response.status_code
                        ))
                    })?;
                    target = url.join(location).map_err(HttpError::from)?.to_string();

                    tracing::debug!(
                        status = response.status_code,
                        redirect_count = options.redirect_count,
                        method = %method,
                        "following redirect"
                    );
                }
                StatusClass::Success => return Ok(response),
                StatusClass::Failure => {
                    let error = OAuth2Error::new(response.clone());
                    if raise_errors {
                        return Err(ClientError::Status(Box::new(error)));
                    }
                    response.attach_error(error);
                    return Ok(response);
                }
                StatusClass::Unhandled => {
                    let message = format!("Unhandled status code value of {}", response.status_code);
                    tracing::warn!(status = response.status_code, "{}", message);
                    return Err(ClientError::UnhandledStatus(Box::new(
                        OAuth2Error::with_message(response, message),
                    )));
                }
            }
        }
    }

    // Convenience methods for common HTTP methods

    /// Send a GET request
    pub async fn get(&self, target: &str, options: RequestOptions) -> Result<Response, ClientError> {
        self.execute(HttpMethod::Get, target, options).await
    }

    /// Send a POST request
    pub async fn post(&self, target: &str, options: RequestOptions) -> Result<Response, ClientError> {
        self.execute(HttpMethod::Post, target, options).await
    }

    /// Send a PUT request
    pub async fn put(&self, target: &str, options: RequestOptions) -> Result<Response, ClientError> {
        self.execute(HttpMethod::Put, target, options).await
    }

    /// Send a PATCH request
    pub async fn patch(&self, target: &str, options: RequestOptions) -> Result<Response, ClientError> {
        self.execute(HttpMethod::Patch, target, options).await
    }

    /// Send a DELETE request
    pub async fn delete(&self, target: &str, options: RequestOptions) -> Result<Response, ClientError> {
        self.execute(HttpMethod::Delete, target, options).await
    }
}

impl std::fmt::Debug for OAuth2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Client")
            .field("site", &self.inner.config.site)
            .field("max_redirects", &self.inner.config.max_redirects)
            .field("raise_errors", &self.inner.config.raise_errors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RawReply;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays canned replies and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<RawReply>>,
        sent: Mutex<Vec<PreparedRequest>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<RawReply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<PreparedRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn run_request(&self, request: PreparedRequest) -> HttpResult<RawReply> {
            let url = request.url.clone();
            self.sent.lock().unwrap().push(request);
            let mut reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply left");
            reply.url = url;
            Ok(reply)
        }
    }

    fn reply(status: u16) -> RawReply {
        RawReply {
            status_code: status,
            ..Default::default()
        }
    }

    fn redirect(status: u16, location: &str) -> RawReply {
        let mut headers = HashMap::new();
        headers.insert("location".to_string(), location.to_string());
        RawReply {
            status_code: status,
            headers,
            ..Default::default()
        }
    }

    fn client(transport: &Arc<ScriptedTransport>, config: ClientConfig) -> OAuth2Client {
        OAuth2Client::with_shared_transport(config, transport.clone())
    }

    #[tokio::test]
    async fn test_rewrites_web_host_before_dispatch() {
        let transport = ScriptedTransport::new(vec![reply(200)]);
        let client = client(&transport, ClientConfig::default());

        client
            .execute(
                HttpMethod::Get,
                "https://access.line.me/oauth2/v1/token",
                RequestOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(transport.sent()[0].url, "https://api.line.me/oauth2/v1/token");
    }

    #[tokio::test]
    async fn test_redirect_preserves_method_and_body() {
        for status in [301, 302, 307] {
            let transport = ScriptedTransport::new(vec![
                redirect(status, "https://api.line.me/moved"),
                reply(200),
            ]);
            let client = client(&transport, ClientConfig::default());

            let response = client
                .execute(
                    HttpMethod::Post,
                    "https://api.line.me/original",
                    RequestOptions::new().body("payload"),
                )
                .await
                .unwrap();

            let sent = transport.sent();
            assert_eq!(sent.len(), 2);
            assert_eq!(sent[1].method, HttpMethod::Post);
            assert_eq!(sent[1].body.as_deref(), Some(&b"payload"[..]));
            assert_eq!(sent[1].url, "https://api.line.me/moved");
            assert_eq!(response.redirect_count, 1);
        }
    }

    #[tokio::test]
    async fn test_see_other_switches_to_get_without_body() {
        let transport = ScriptedTransport::new(vec![
            redirect(303, "https://api.line.me/result"),
            reply(200),
        ]);
        let client = client(&transport, ClientConfig::default());

        client
            .execute(
                HttpMethod::Put,
                "https://api.line.me/submit",
                RequestOptions::new().body("payload"),
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[1].method, HttpMethod::Get);
        assert!(sent[1].body.is_none());
    }

    #[tokio::test]
    async fn test_redirect_limit_returns_last_response() {
        let transport = ScriptedTransport::new(vec![redirect(302, "https://api.line.me/loop")]);
        let client = client(&transport, ClientConfig::default().max_redirects(3));

        let response = client
            .execute(
                HttpMethod::Get,
                "https://api.line.me/start",
                RequestOptions::new().redirect_count(3),
            )
            .await
            .unwrap();

        assert_eq!(response.status_code, 302);
        assert!(response.error().is_none());
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_redirect_chain_counts_across_hops() {
        let transport = ScriptedTransport::new(vec![
            redirect(301, "https://api.line.me/a"),
            redirect(307, "https://api.line.me/b"),
            redirect(302, "https://api.line.me/c"),
        ]);
        let client = client(&transport, ClientConfig::default().max_redirects(2));

        let response = client
            .execute(HttpMethod::Get, "https://api.line.me/start", RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(transport.sent().len(), 3);
        assert_eq!(response.status_code, 302);
        assert_eq!(response.redirect_count, 2);
    }

    #[tokio::test]
    async fn test_relative_location_resolves_against_current_url() {
        let transport = ScriptedTransport::new(vec![redirect(302, "/next?x=1"), reply(204)]);
        let client = client(&transport, ClientConfig::default());

        client
            .execute(HttpMethod::Get, "https://access.line.me/first", RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(transport.sent()[1].url, "https://api.line.me/next?x=1");
    }

    #[tokio::test]
    async fn test_missing_location_is_redirect_error() {
        let transport = ScriptedTransport::new(vec![reply(302)]);
        let client = client(&transport, ClientConfig::default());

        let err = client
            .execute(HttpMethod::Get, "https://api.line.me/x", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Http(HttpError::Redirect(_))));
    }

    #[tokio::test]
    async fn test_non_redirecting_3xx_is_returned() {
        for status in [200, 204, 299, 300, 304, 308, 399] {
            let transport = ScriptedTransport::new(vec![reply(status)]);
            let client = client(&transport, ClientConfig::default());

            let response = client
                .execute(HttpMethod::Get, "https://api.line.me/x", RequestOptions::new())
                .await
                .unwrap();

            assert_eq!(response.status_code, status);
            assert!(response.error().is_none());
            assert_eq!(transport.sent().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_failure_attached_when_not_raising() {
        let transport = ScriptedTransport::new(vec![reply(401)]);
        let client = client(&transport, ClientConfig::default().raise_errors(false));

        let response = client
            .execute(HttpMethod::Get, "https://api.line.me/x", RequestOptions::new())
            .await
            .unwrap();

        let error = response.error().unwrap();
        assert_eq!(error.response().status_code, 401);
    }

    #[tokio::test]
    async fn test_per_call_override_wins() {
        let transport = ScriptedTransport::new(vec![reply(500), reply(500)]);
        let raising = client(&transport, ClientConfig::default().raise_errors(true));

        let response = raising
            .execute(
                HttpMethod::Get,
                "https://api.line.me/x",
                RequestOptions::new().raise_errors(false),
            )
            .await
            .unwrap();
        assert!(response.error().is_some());

        let quiet = client(&transport, ClientConfig::default().raise_errors(false));
        let err = quiet
            .execute(
                HttpMethod::Get,
                "https://api.line.me/x",
                RequestOptions::new().raise_errors(true),
            )
            .await
            .unwrap_err();
        assert!(err.is_status_error());
    }

    #[tokio::test]
    async fn test_unhandled_status_always_raises() {
        for raise in [true, false] {
            let transport = ScriptedTransport::new(vec![reply(999)]);
            let client = client(&transport, ClientConfig::default().raise_errors(raise));

            let err = client
                .execute(HttpMethod::Get, "https://api.line.me/x", RequestOptions::new())
                .await
                .unwrap_err();

            assert!(err.is_unhandled_status());
            assert!(err.to_string().contains("999"));
        }
    }

    #[tokio::test]
    async fn test_informational_status_is_unhandled() {
        let transport = ScriptedTransport::new(vec![reply(101)]);
        let client = client(&transport, ClientConfig::default());

        let err = client
            .execute(HttpMethod::Get, "https://api.line.me/x", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(err.is_unhandled_status());
    }

    #[tokio::test]
    async fn test_hook_applies_to_first_request_only() {
        let transport = ScriptedTransport::new(vec![
            redirect(302, "https://other.example/next"),
            reply(200),
        ]);
        let client = client(&transport, ClientConfig::default());

        client
            .execute_with(
                HttpMethod::Get,
                "https://access.line.me/a",
                RequestOptions::new(),
                |req| req.set_header("Authorization", "Bearer token"),
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].url, "https://api.line.me/a");
        assert_eq!(
            sent[0].headers.get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
        assert_eq!(sent[1].url, "https://other.example/next");
        assert!(!sent[1].headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn test_params_merge_into_every_hop() {
        let transport = ScriptedTransport::new(vec![
            redirect(302, "https://api.line.me/next"),
            reply(200),
        ]);
        let client = client(
            &transport,
            ClientConfig::default().site("https://access.line.me"),
        );

        client
            .execute(
                HttpMethod::Get,
                "/oauth2/v2.1/authorize",
                RequestOptions::new().param("client_id", "1234"),
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(
            sent[0].url,
            "https://api.line.me/oauth2/v2.1/authorize?client_id=1234"
        );
        assert_eq!(sent[1].url, "https://api.line.me/next?client_id=1234");
    }

    #[tokio::test]
    async fn test_saturated_redirect_count_stops_without_panic() {
        let transport = ScriptedTransport::new(vec![redirect(302, "https://api.line.me/loop")]);
        let client = client(&transport, ClientConfig::default());

        let response = client
            .execute(
                HttpMethod::Get,
                "https://api.line.me/start",
                RequestOptions::new().redirect_count(usize::MAX),
            )
            .await
            .unwrap();

        assert_eq!(response.status_code, 302);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_debug_client_installs_wire_logger() {
        let transport = ScriptedTransport::new(vec![]);
        let _client = client(&transport, ClientConfig::default().debug(true));

        assert!(tracing::dispatcher::has_been_set());
    }

    #[test]
    fn test_client_creation() {
        let config = ClientConfig::new().site("https://api.line.me");
        let client = OAuth2Client::new(config).unwrap();
        assert_eq!(client.site(), Some("https://api.line.me"));
    }

    #[test]
    fn test_default_client() {
        let client = OAuth2Client::default_client().unwrap();
        assert!(client.site().is_none());
        assert_eq!(client.config().max_redirects, 5);
    }
}
