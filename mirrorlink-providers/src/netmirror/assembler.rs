//! Stream URL assembly
//!
//! Turns the selected playlist source into the outward [`ResolvedStream`],
//! either pointing straight at the mirror or wrapped through a CORS relay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::client::with_trailing_slash;
use super::types::{ResolvedStream, StreamFlag, StreamType};
use crate::error::NetMirrorError;

pub const URL_PLACEHOLDER: &str = "{url}";
pub const HEADERS_PLACEHOLDER: &str = "{headers}";

/// How the final playlist URL is exposed to the player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RelayMode {
    /// `base_url + file` as-is.
    #[default]
    Direct,
    /// Wrapped through a relay. `template` is a URL containing `{url}` and
    /// optionally `{headers}`, e.g. `https://relay.example/m3u8-proxy?url={url}&headers={headers}`.
    Relayed { template: String },
}

/// URL-encode a string for safe use in query parameters
fn url_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[derive(Debug, Clone)]
pub struct StreamAssembler {
    base_url: String,
    relay: RelayMode,
}

impl StreamAssembler {
    pub fn new(base_url: impl Into<String>, relay: RelayMode) -> Result<Self, NetMirrorError> {
        if let RelayMode::Relayed { template } = &relay {
            if !template.contains(URL_PLACEHOLDER) {
                return Err(NetMirrorError::InvalidConfig(format!(
                    "Relay template must contain {URL_PLACEHOLDER}: {template}"
                )));
            }
        }
        Ok(Self {
            base_url: with_trailing_slash(base_url),
            relay,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Unwrapped stream URL: base URL and file reference concatenated verbatim.
    #[must_use]
    pub fn stream_url(&self, file_ref: &str) -> String {
        format!("{}{}", self.base_url, file_ref)
    }

    fn playback_headers(&self, cookie: &str) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Referer".to_string(), self.base_url.clone());
        headers.insert("Cookie".to_string(), cookie.to_string());
        headers
    }

    pub fn assemble(&self, file_ref: &str, cookie: &str) -> Result<ResolvedStream, NetMirrorError> {
        let target = self.stream_url(file_ref);

        let (playlist, headers) = match &self.relay {
            RelayMode::Direct => (target, self.playback_headers(cookie)),
            RelayMode::Relayed { template } => {
                let header_bag = serde_json::to_string(&self.playback_headers(cookie))?;
                let playlist = template
                    .replace(URL_PLACEHOLDER, &url_encode(&target))
                    .replace(HEADERS_PLACEHOLDER, &url_encode(&header_bag));
                (playlist, BTreeMap::new())
            }
        };

        Ok(ResolvedStream {
            id: ResolvedStream::PRIMARY_ID.to_string(),
            playlist,
            stream_type: StreamType::Hls,
            flags: vec![StreamFlag::CorsAllowed],
            captions: Vec::new(),
            headers,
        })
    }
}
