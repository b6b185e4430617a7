//! NetMirror resolution pipeline
//!
//! search -> candidate disambiguation -> season -> episode pages -> playlist
//! -> source selection -> stream assembly. Every step feeds the next, so the
//! whole thing runs strictly in sequence and aborts on the first failure.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::assembler::StreamAssembler;
use super::client::Endpoint;
use super::service::{CredentialSupplier, MirrorTransport};
use super::title::compare_title;
use super::types::{
    EpisodeRecord, EpisodesPage, MediaQuery, MediaTarget, MetaRecord, PlaylistItem,
    PlaylistSource, ResolvedStream, SearchCandidate, SearchResp,
};
use crate::error::NetMirrorError;

/// Receives progress checkpoints (0-100, non-decreasing) during resolution.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn progress(&self, percent: u8) {
        self(percent);
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _percent: u8) {}
}

const PROGRESS_STARTED: u8 = 10;
const PROGRESS_SEARCHED: u8 = 30;
const PROGRESS_PLAYLIST: u8 = 50;
const PROGRESS_ASSEMBLED: u8 = 90;

const FIRST_CONTINUATION_PAGE: u32 = 2;

/// Pick the playable source: "Auto", then "Full HD", then whatever is first.
#[must_use]
pub fn select_source(sources: &[PlaylistSource]) -> Option<&PlaylistSource> {
    let labelled = |label: &str| {
        sources
            .iter()
            .find(|s| s.label == label)
            .filter(|s| !s.file.is_empty())
    };
    labelled("Auto")
        .or_else(|| labelled("Full HD"))
        .or_else(|| sources.first().filter(|s| !s.file.is_empty()))
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, value: Value) -> Result<T, NetMirrorError> {
    serde_json::from_value(value)
        .map_err(|e| NetMirrorError::Parse(format!("{} response: {e}", endpoint.as_str())))
}

/// Resolves a [`MediaQuery`] to a playable HLS stream on one mirror.
///
/// Stateless between calls; each `resolve` fetches its own session cookie.
pub struct Resolver {
    transport: Arc<dyn MirrorTransport>,
    credentials: Arc<dyn CredentialSupplier>,
    assembler: StreamAssembler,
}

impl Resolver {
    pub fn new(
        transport: Arc<dyn MirrorTransport>,
        credentials: Arc<dyn CredentialSupplier>,
        assembler: StreamAssembler,
    ) -> Self {
        Self {
            transport,
            credentials,
            assembler,
        }
    }

    #[instrument(skip_all, fields(title = %query.title, kind = query.kind().as_str()))]
    pub async fn resolve(
        &self,
        query: &MediaQuery,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<ResolvedStream, NetMirrorError> {
        let result = self.run(query, cancel, progress).await;
        match &result {
            Ok(stream) => info!(relayed = stream.headers.is_empty(), "Stream resolved"),
            Err(e) if e.is_not_found() => warn!("Nothing to play: {e}"),
            Err(e) => debug!(kind = e.kind().as_str(), "Resolution failed: {e}"),
        }
        result
    }

    async fn run(
        &self,
        query: &MediaQuery,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<ResolvedStream, NetMirrorError> {
        if cancel.is_cancelled() {
            return Err(NetMirrorError::Cancelled);
        }
        progress.progress(PROGRESS_STARTED);

        let cookie = self.credentials.session_token(cancel).await?;

        let candidates = self.search(&query.title, &cookie, cancel).await?;
        progress.progress(PROGRESS_SEARCHED);

        let (mut id, meta) = self.disambiguate(query, &candidates, &cookie, cancel).await?;

        if let MediaTarget::Show { season, episode } = query.target {
            let season_id = meta
                .season_id(season)
                .ok_or_else(|| NetMirrorError::NotFound("Season not available".to_string()))?
                .to_string();

            let episodes = self.collect_episodes(&season_id, &id, &cookie, cancel).await?;

            id = episodes
                .into_iter()
                .find(|e| e.is(season, episode))
                .map(|e| e.id)
                .ok_or_else(|| NetMirrorError::NotFound("Episode not available".to_string()))?;
        }

        let playlist = self.playlist(&id, &cookie, cancel).await?;
        progress.progress(PROGRESS_PLAYLIST);

        let source = playlist
            .first()
            .and_then(|item| select_source(&item.sources))
            .ok_or_else(|| NetMirrorError::Extraction("Failed to fetch playlist".to_string()))?;
        debug!(label = %source.label, "Selected playlist source");

        let stream = self.assembler.assemble(&source.file, &cookie)?;
        progress.progress(PROGRESS_ASSEMBLED);

        Ok(stream)
    }

    async fn search(
        &self,
        title: &str,
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchCandidate>, NetMirrorError> {
        let value = self
            .transport
            .call(Endpoint::Search, &[("s", title.to_string())], cookie, cancel)
            .await?;
        let resp: SearchResp = decode(Endpoint::Search, value)?;

        let message = || {
            resp.error
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "No search results".to_string())
        };
        if !resp.is_success() {
            return Err(NetMirrorError::NotFound(message()));
        }
        match resp.search_result.clone() {
            Some(candidates) if !candidates.is_empty() => Ok(candidates),
            _ => Err(NetMirrorError::NotFound(message())),
        }
    }

    async fn meta(
        &self,
        id: &str,
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<MetaRecord, NetMirrorError> {
        let value = self
            .transport
            .call(Endpoint::Meta, &[("id", id.to_string())], cookie, cancel)
            .await?;
        decode(Endpoint::Meta, value)
    }

    /// First candidate whose title matches and whose year or kind agrees wins.
    async fn disambiguate(
        &self,
        query: &MediaQuery,
        candidates: &[SearchCandidate],
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, MetaRecord), NetMirrorError> {
        let type_tag = query.kind().type_tag();

        for candidate in candidates {
            let meta = self.meta(&candidate.id, cookie, cancel).await?;
            let title_match = compare_title(&candidate.display_title, &query.title);
            let year_match = meta.year == Some(query.release_year);
            let kind_match = meta.type_tag.as_deref() == Some(type_tag);

            if title_match && (year_match || kind_match) {
                info!(id = %candidate.id, title = %candidate.display_title, "Candidate accepted");
                return Ok((candidate.id.clone(), meta));
            }
            debug!(id = %candidate.id, title_match, year_match, kind_match, "Candidate rejected");
        }

        Err(NetMirrorError::NotFound("No watchable item found".to_string()))
    }

    async fn episodes_page(
        &self,
        season_id: &str,
        series_id: &str,
        page: Option<u32>,
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<EpisodesPage, NetMirrorError> {
        let mut query = vec![("s", season_id.to_string()), ("series", series_id.to_string())];
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        let value = self
            .transport
            .call(Endpoint::Episodes, &query, cookie, cancel)
            .await?;
        decode(Endpoint::Episodes, value)
    }

    /// Walk every page of a season, in arrival order, duplicates kept.
    async fn collect_episodes(
        &self,
        season_id: &str,
        series_id: &str,
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<EpisodeRecord>, NetMirrorError> {
        let first = self
            .episodes_page(season_id, series_id, None, cookie, cancel)
            .await?;
        let mut episodes = first.episodes;
        let mut has_next = first.has_next_page;
        let mut page = FIRST_CONTINUATION_PAGE;

        while has_next {
            let next = self
                .episodes_page(season_id, series_id, Some(page), cookie, cancel)
                .await?;
            episodes.extend(next.episodes);
            has_next = next.has_next_page;
            page += 1;
        }

        debug!(season_id, pages = page - 1, count = episodes.len(), "Episodes collected");
        Ok(episodes)
    }

    async fn playlist(
        &self,
        id: &str,
        cookie: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlaylistItem>, NetMirrorError> {
        let value = self
            .transport
            .call(Endpoint::Playlist, &[("id", id.to_string())], cookie, cancel)
            .await?;
        decode(Endpoint::Playlist, value)
    }
}
