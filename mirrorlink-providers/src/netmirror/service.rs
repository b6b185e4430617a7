//! NetMirror service seams
//!
//! The resolver only talks to these traits, so the HTTP implementations can be
//! swapped for scripted ones in tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::client::Endpoint;
use crate::error::NetMirrorError;

/// Endpoint client interface
#[async_trait]
pub trait MirrorTransport: Send + Sync {
    /// Base URL every endpoint (and every stream file reference) is relative to.
    fn base_url(&self) -> &str;

    /// GET `endpoint` with `query`, authorized by `cookie`.
    ///
    /// Fails with a transport error on non-success status or unparsable body,
    /// and with [`NetMirrorError::Cancelled`] if `cancel` fires first.
    async fn call(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, NetMirrorError>;
}

/// Session cookie source
#[async_trait]
pub trait CredentialSupplier: Send + Sync {
    /// Complete `Cookie` header value for one resolution.
    ///
    /// Nothing is cached between calls.
    async fn session_token(&self, cancel: &CancellationToken) -> Result<String, NetMirrorError>;
}
