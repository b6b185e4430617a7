//! NetMirror API Data Structures
//!
//! Wire types decode leniently: the upstream mixes numbers and numeric
//! strings for the same field and omits empty lists entirely.

use std::collections::BTreeMap;

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Query
// ============================================================================

/// Movie or show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl MediaKind {
    /// Tag the meta endpoint uses for this kind (`"m"` / `"t"`).
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Movie => "m",
            Self::Show => "t",
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Show => "show",
        }
    }
}

/// What to play within a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTarget {
    Movie,
    Show { season: u32, episode: u32 },
}

/// Identity of the media to resolve. Supplied by the caller, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    pub title: String,
    pub release_year: i32,
    pub target: MediaTarget,
}

impl MediaQuery {
    pub fn movie(title: impl Into<String>, release_year: i32) -> Self {
        Self {
            title: title.into(),
            release_year,
            target: MediaTarget::Movie,
        }
    }

    pub fn show(title: impl Into<String>, release_year: i32, season: u32, episode: u32) -> Self {
        Self {
            title: title.into(),
            release_year,
            target: MediaTarget::Show { season, episode },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        match self.target {
            MediaTarget::Movie => MediaKind::Movie,
            MediaTarget::Show { .. } => MediaKind::Show,
        }
    }
}

// ============================================================================
// API Response Types
// ============================================================================

/// `search.php` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResp {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "searchResult", default)]
    pub search_result: Option<Vec<SearchCandidate>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SearchResp {
    pub const SUCCESS: &'static str = "y";

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(Self::SUCCESS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchCandidate {
    #[serde(deserialize_with = "de_string")]
    pub id: String,
    #[serde(rename = "t", default)]
    pub display_title: String,
}

/// `post.php` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaRecord {
    #[serde(default, deserialize_with = "de_opt_i32")]
    pub year: Option<i32>,
    #[serde(rename = "type", default)]
    pub type_tag: Option<String>,
    #[serde(rename = "season", default, deserialize_with = "null_default")]
    pub seasons: Vec<SeasonEntry>,
}

impl MetaRecord {
    #[must_use]
    pub fn season_id(&self, number: u32) -> Option<&str> {
        self.seasons
            .iter()
            .find(|s| s.number() == Some(number))
            .map(|s| s.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeasonEntry {
    #[serde(rename = "s", deserialize_with = "de_string")]
    pub label: String,
    #[serde(deserialize_with = "de_string")]
    pub id: String,
}

impl SeasonEntry {
    #[must_use]
    pub fn number(&self) -> Option<u32> {
        self.label.trim().parse().ok()
    }
}

/// `episodes.php` response (one page)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodesPage {
    #[serde(default, deserialize_with = "null_default")]
    pub episodes: Vec<EpisodeRecord>,
    #[serde(rename = "nextPageShow", default, deserialize_with = "de_flag")]
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeRecord {
    #[serde(rename = "ep", default)]
    pub episode_label: String,
    #[serde(rename = "s", default)]
    pub season_label: String,
    #[serde(deserialize_with = "de_string")]
    pub id: String,
}

impl EpisodeRecord {
    #[must_use]
    pub fn is(&self, season: u32, episode: u32) -> bool {
        self.episode_label == format!("E{episode}") && self.season_label == format!("S{season}")
    }
}

/// One element of the `playlist.php` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistItem {
    #[serde(default, deserialize_with = "null_default")]
    pub sources: Vec<PlaylistSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlaylistSource {
    #[serde(default, deserialize_with = "null_default")]
    pub file: String,
    #[serde(default, deserialize_with = "null_default")]
    pub label: String,
}

// ============================================================================
// Resolved output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Hls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamFlag {
    /// The consumer may fetch the playlist cross-origin without negotiation.
    CorsAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub language: String,
    pub url: String,
    pub format: String,
}

/// Final playable stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStream {
    pub id: String,
    pub playlist: String,
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    pub flags: Vec<StreamFlag>,
    pub captions: Vec<Caption>,
    /// Headers the player must send when fetching `playlist`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ResolvedStream {
    pub const PRIMARY_ID: &'static str = "primary";

    #[must_use]
    pub fn cors_allowed(&self) -> bool {
        self.flags.contains(&StreamFlag::CorsAllowed)
    }
}

// ============================================================================
// Lenient field decoders
// ============================================================================

fn de_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn de_opt_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1",
        Value::Bool(b) => b,
        _ => false,
    })
}

fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}
