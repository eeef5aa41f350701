use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    common::errors::ResolutionError,
    protocol::tracks::{ContentId, ResolveMode, ResolvedSource, SearchResult},
};

/// Turns a request into something the output transport can play.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a URL or free-text query. Free text picks the best single match.
    async fn resolve(
        &self,
        query: &str,
        mode: ResolveMode,
    ) -> Result<ResolvedSource, ResolutionError>;

    /// Top candidates for interactive selection.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ResolutionError>;

    /// Called when a downloaded source turned out to be unplayable.
    async fn discard(&self, _source: &ResolvedSource) {}
}

/// Validated metadata of one media item as reported by an extraction backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub content_id: ContentId,
    pub title: String,
    /// Direct, short-lived locator suitable for streaming.
    pub stream_url: String,
    /// Canonical page of the media, used to download it again later.
    pub page_url: Option<String>,
    pub duration_secs: Option<u64>,
    pub is_live: bool,
}

/// Extraction backend (e.g. `yt-dlp`).
///
/// Implementations are stateless apart from their configuration and may be
/// called concurrently from any number of sessions.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, query: &str) -> Result<MediaInfo, ResolutionError>;

    /// Materialize `media` as `<dir>/<stem>.<ext>` and return the final path.
    async fn download(
        &self,
        media: &MediaInfo,
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ResolutionError>;

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ResolutionError>;
}

/// Expands third-party catalog links (albums, playlists) into search queries.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    fn handles(&self, query: &str) -> bool;

    /// Ordered search queries. Failures yield an empty list.
    async fn expand(&self, url: &str) -> Vec<String>;
}
