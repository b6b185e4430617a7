//! NetMirror HTTP Client
//!
//! Issues GET requests against the mirror's four JSON endpoints with the
//! session cookie and the browser header set the upstream insists on.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, REFERER, USER_AGENT}};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::service::MirrorTransport;
use crate::error::{NetMirrorError, check_response, json_with_limit};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Upstream JSON endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    Meta,
    Episodes,
    Playlist,
}

impl Endpoint {
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Search => "search.php",
            Self::Meta => "post.php",
            Self::Episodes => "episodes.php",
            Self::Playlist => "playlist.php",
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Meta => "meta",
            Self::Episodes => "episodes",
            Self::Playlist => "playlist",
        }
    }
}

/// Connection settings for the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Build the pooled client shared by the endpoint client and the credential
/// supplier. Redirects are disabled so a mirror cannot bounce requests
/// carrying the session cookie to another host.
pub fn build_http_client(options: &HttpOptions) -> Result<Client, NetMirrorError> {
    Client::builder()
        .user_agent(options.user_agent.as_str())
        .connect_timeout(options.connect_timeout)
        .timeout(options.timeout)
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| NetMirrorError::InvalidConfig(format!("Failed to build HTTP client: {e}")))
}

/// Endpoint paths and stream file references are appended to the base URL
/// verbatim, so it must end with `/`.
pub(crate) fn with_trailing_slash(base_url: impl Into<String>) -> String {
    let mut base_url = base_url.into();
    if !base_url.ends_with('/') {
        base_url.push('/');
    }
    base_url
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn run_cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, NetMirrorError>
where
    F: Future<Output = Result<T, NetMirrorError>>,
{
    if cancel.is_cancelled() {
        return Err(NetMirrorError::Cancelled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(NetMirrorError::Cancelled),
        res = fut => res,
    }
}

/// NetMirror HTTP Client
pub struct NetMirrorClient {
    base_url: String,
    user_agent: String,
    client: Client,
}

impl NetMirrorClient {
    /// Create a client for `base_url` over an existing connection pool.
    pub fn new(base_url: impl Into<String>, client: Client) -> Result<Self, NetMirrorError> {
        Self::with_user_agent(base_url, client, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(
        base_url: impl Into<String>,
        client: Client,
        user_agent: impl Into<String>,
    ) -> Result<Self, NetMirrorError> {
        let base_url = with_trailing_slash(base_url);
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| NetMirrorError::InvalidConfig(format!("Invalid base URL {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NetMirrorError::InvalidConfig(format!(
                "Base URL must use http or https: {base_url}"
            )));
        }
        Ok(Self {
            base_url,
            user_agent: user_agent.into(),
            client,
        })
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Build request headers
    fn build_headers(&self, cookie: &str) -> Result<HeaderMap, NetMirrorError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(REFERER, HeaderValue::from_str(&self.base_url)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        Ok(headers)
    }
}

#[async_trait]
impl MirrorTransport for NetMirrorClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, NetMirrorError> {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint = endpoint.as_str(), ?query, "Mirror request");

        run_cancellable(cancel, async {
            let response = self
                .client
                .get(&url)
                .query(query)
                .headers(self.build_headers(cookie)?)
                .send()
                .await?;

            let response = check_response(response)?;
            json_with_limit::<Value>(response).await
        })
        .await
    }
}
