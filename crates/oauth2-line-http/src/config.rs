//! Client configuration

use crate::logging;
use crate::rewrite::HostRewrite;
use std::time::Duration;

/// Configuration for the OAuth2 client.
///
/// The pipeline reads `max_redirects`, `raise_errors`, `debug` and
/// `host_rewrite`; it never mutates them. The remaining fields configure
/// the default reqwest transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL relative targets resolve against (e.g., "https://api.line.me")
    pub site: Option<String>,

    /// Maximum number of redirects followed per logical call
    pub max_redirects: usize,

    /// Whether 4xx/5xx replies are raised by default
    pub raise_errors: bool,

    /// Log every request/response hop to stdout.
    /// Defaults to whether `OAUTH_DEBUG` is `true`.
    pub debug: bool,

    /// Host substitution applied before each dispatch
    pub host_rewrite: HostRewrite,

    /// Total request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Idle connection timeout
    pub pool_idle_timeout: Duration,

    /// User-Agent header value
    pub user_agent: String,

    /// Enable gzip compression
    pub gzip: bool,

    /// Enable brotli compression
    pub brotli: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            site: None,
            max_redirects: 5,
            raise_errors: true,
            debug: logging::debug_enabled(),
            host_rewrite: HostRewrite::line(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("oauth2-line/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
            brotli: true,
        }
    }
}

impl ClientConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config from environment variables.
    ///
    /// `OAUTH_DEBUG` is honoured by [`Default`] as well; the variables
    /// below are read only here.
    ///
    /// - `OAUTH_SITE` -> `site`
    /// - `OAUTH_MAX_REDIRECTS` -> `max_redirects` (ignored unless a valid integer)
    /// - `OAUTH_RAISE_ERRORS` -> `raise_errors` (`true`/`false`)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(site) = std::env::var("OAUTH_SITE") {
            config.site = Some(site);
        }
        if let Some(max) = std::env::var("OAUTH_MAX_REDIRECTS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.max_redirects = max;
        }
        if let Some(raise) = std::env::var("OAUTH_RAISE_ERRORS")
            .ok()
            .and_then(|v| v.trim().to_lowercase().parse().ok())
        {
            config.raise_errors = raise;
        }
        config
    }

    /// Set the base URL
    pub fn site(mut self, url: impl Into<String>) -> Self {
        self.site = Some(url.into());
        self
    }

    /// Set maximum redirects
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set the raise-errors default
    pub fn raise_errors(mut self, raise: bool) -> Self {
        self.raise_errors = raise;
        self
    }

    /// Enable/disable hop logging
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Replace the host substitution rule
    pub fn host_rewrite(mut self, rewrite: HostRewrite) -> Self {
        self.host_rewrite = rewrite;
        self
    }

    /// Set the total timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout from seconds
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set max idle connections per host
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable/disable gzip compression
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    /// Enable/disable brotli compression
    pub fn brotli(mut self, enabled: bool) -> Self {
        self.brotli = enabled;
        self
    }
}
