//! Mirror client error types
//!
//! One error enum for the whole resolution pipeline. [`ErrorKind`] folds the
//! variants into the coarse categories callers branch on (for example to
//! decide whether another mirror is worth trying).

use thiserror::Error;

/// Maximum response body size for mirror HTTP calls (16 MB).
/// Prevents OOM from malicious or misconfigured upstream servers.
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum NetMirrorError {
    #[error("Credential unavailable: {0}")]
    Credential(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response too large ({size} bytes, max {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge { size: u64 },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse failure category of a [`NetMirrorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Credential,
    Transport,
    Cancelled,
    NotFound,
    Extraction,
    Config,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Transport => "transport",
            Self::Cancelled => "cancelled",
            Self::NotFound => "not_found",
            Self::Extraction => "extraction",
            Self::Config => "config",
        }
    }
}

impl NetMirrorError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Credential(_) => ErrorKind::Credential,
            Self::Network(_)
            | Self::Http { .. }
            | Self::Parse(_)
            | Self::ResponseTooLarge { .. }
            | Self::InvalidHeader(_) => ErrorKind::Transport,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// True for the expected "nothing to play here" outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Re-labels a failure as a credential failure, keeping cancellation intact.
    #[must_use]
    pub fn into_credential(self) -> Self {
        match self {
            Self::Cancelled | Self::Credential(_) => self,
            other => Self::Credential(other.to_string()),
        }
    }
}

/// Read a response body with size limit and deserialize as JSON.
///
/// Checks `Content-Length` hint first (if available), then enforces the
/// limit on the actual body bytes before deserializing.
pub async fn json_with_limit<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, NetMirrorError> {
    if let Some(cl) = response.content_length() {
        if cl as usize > MAX_RESPONSE_SIZE {
            return Err(NetMirrorError::ResponseTooLarge { size: cl });
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(NetMirrorError::ResponseTooLarge { size: bytes.len() as u64 });
    }
    serde_json::from_slice(&bytes).map_err(Into::into)
}

/// Check HTTP response status before processing body.
pub fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, NetMirrorError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(NetMirrorError::Http {
            status,
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

impl From<reqwest::Error> for NetMirrorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for NetMirrorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for NetMirrorError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_http() {
        let err = NetMirrorError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            url: "https://example.com/search.php".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 404 Not Found for https://example.com/search.php");
    }

    #[test]
    fn test_error_display_not_found() {
        let err = NetMirrorError::NotFound("Season not available".to_string());
        assert_eq!(err.to_string(), "Not found: Season not available");
    }

    #[test]
    fn test_transport_kinds() {
        assert_eq!(NetMirrorError::Network("refused".into()).kind(), ErrorKind::Transport);
        assert_eq!(NetMirrorError::Parse("eof".into()).kind(), ErrorKind::Transport);
        assert_eq!(
            NetMirrorError::ResponseTooLarge { size: 1 }.kind(),
            ErrorKind::Transport
        );
        assert_eq!(NetMirrorError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(NetMirrorError::Extraction("x".into()).kind(), ErrorKind::Extraction);
    }

    #[test]
    fn test_into_credential_keeps_cancellation() {
        assert!(matches!(
            NetMirrorError::Cancelled.into_credential(),
            NetMirrorError::Cancelled
        ));
        let err = NetMirrorError::Network("connection refused".into()).into_credential();
        assert_eq!(err.kind(), ErrorKind::Credential);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err: NetMirrorError = json_err.into();
        assert!(matches!(err, NetMirrorError::Parse(_)));
        assert_eq!(err.kind().as_str(), "transport");
    }
}
