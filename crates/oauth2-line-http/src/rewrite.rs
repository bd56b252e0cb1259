//! Host substitution applied before every dispatch

use url::Url;

/// LINE's browser-facing host.
pub const LINE_WEB_HOST: &str = "access.line.me";

/// LINE's API host.
pub const LINE_API_HOST: &str = "api.line.me";

/// Replaces one exact hostname with another in a resolved URL.
///
/// Only the host segment changes; scheme, port, path, query and fragment are
/// left untouched. URLs on any other host pass through unchanged, which makes
/// the rewrite idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRewrite {
    from: String,
    to: String,
}

impl HostRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The `access.line.me` -> `api.line.me` rule.
    pub fn line() -> Self {
        Self::new(LINE_WEB_HOST, LINE_API_HOST)
    }

    pub fn from_host(&self) -> &str {
        &self.from
    }

    pub fn to_host(&self) -> &str {
        &self.to
    }

    /// Applies the rule in place. Returns whether the host changed.
    pub fn apply(&self, url: &mut Url) -> bool {
        if url.host_str() != Some(self.from.as_str()) {
            return false;
        }
        // set_host only fails for cannot-be-a-base URLs, which have no host
        url.set_host(Some(&self.to)).is_ok()
    }
}

impl Default for HostRewrite {
    fn default() -> Self {
        Self::line()
    }
}
