//! Session cookie supplier

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::run_cancellable;
use super::service::CredentialSupplier;
use crate::error::{NetMirrorError, check_response, json_with_limit};

/// JSON pointer to the cookie inside the default token document.
pub const DEFAULT_COOKIE_POINTER: &str = "/netflixCookie/cookie";

/// Where the session cookie comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Fetch a JSON document and read the string at `pointer`.
    Remote { url: String, pointer: String },
    /// Fixed cookie, no network.
    Static(String),
}

/// Cookie supplier
///
/// Resolves the session token from its [`CookieSource`] and appends the
/// opaque site-specific entries (bypass hashes and the like) configured for
/// the mirror.
pub struct CookieSupplier {
    source: CookieSource,
    extra_cookies: Vec<(String, String)>,
    client: Client,
}

impl CookieSupplier {
    pub fn new(source: CookieSource, client: Client) -> Self {
        Self {
            source,
            extra_cookies: Vec::new(),
            client,
        }
    }

    /// Append `name=value` entries after the session token.
    #[must_use]
    pub fn with_extra_cookies(mut self, extra: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_cookies.extend(extra);
        self
    }

    async fn fetch_remote(&self, url: &str, pointer: &str) -> Result<String, NetMirrorError> {
        debug!(url, "Fetching session cookie");
        let response = self.client.get(url).send().await?;
        let response = check_response(response)?;
        let document: Value = json_with_limit(response).await?;

        document
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| NetMirrorError::Credential(format!("Missing cookie field {pointer}")))
    }

    fn cookie_header(&self, token: &str) -> String {
        let mut parts = Vec::with_capacity(1 + self.extra_cookies.len());
        parts.push(token.to_string());
        parts.extend(self.extra_cookies.iter().map(|(k, v)| format!("{k}={v}")));
        parts.join("; ")
    }
}

#[async_trait]
impl CredentialSupplier for CookieSupplier {
    async fn session_token(&self, cancel: &CancellationToken) -> Result<String, NetMirrorError> {
        let token = match &self.source {
            CookieSource::Static(cookie) => {
                if cancel.is_cancelled() {
                    return Err(NetMirrorError::Cancelled);
                }
                cookie.clone()
            }
            CookieSource::Remote { url, pointer } => {
                run_cancellable(cancel, self.fetch_remote(url, pointer))
                    .await
                    .map_err(NetMirrorError::into_credential)?
            }
        };
        Ok(self.cookie_header(&token))
    }
}
