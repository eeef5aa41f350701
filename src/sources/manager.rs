use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{
    cache::DownloadCache,
    plugin::{MediaExtractor, MediaInfo, Resolver},
};
use crate::{
    common::errors::ResolutionError,
    protocol::tracks::{Locator, ResolveMode, ResolvedSource, SearchResult},
};

/// The process-wide track resolver.
///
/// Constructed once at startup and shared by `Arc` with every session.
pub struct TrackResolver {
    extractor: Arc<dyn MediaExtractor>,
    cache: DownloadCache,
    search_limit: usize,
}

impl TrackResolver {
    pub fn new(extractor: Arc<dyn MediaExtractor>, cache: DownloadCache, search_limit: usize) -> Self {
        info!(
            "Track resolver ready (extractor: {}, cache: {})",
            extractor.name(),
            cache.dir().display()
        );
        Self {
            extractor,
            cache,
            search_limit: search_limit.max(1),
        }
    }

    fn streamed(media: MediaInfo) -> ResolvedSource {
        ResolvedSource {
            title: media.title,
            locator: Locator::Remote(media.stream_url),
            duration_secs: media.duration_secs,
            is_live: media.is_live,
            mode: ResolveMode::Stream,
            content_id: media.content_id,
        }
    }

    async fn materialize(&self, media: MediaInfo) -> Result<ResolvedSource, ResolutionError> {
        if media.is_live {
            debug!(
                "'{}' is live; nothing to download, streaming instead",
                media.title
            );
            return Ok(Self::streamed(media));
        }

        let path = match self.cache.find(&media.content_id).await {
            Some(path) => path,
            None => {
                info!("Downloading {} ({})", media.content_id, media.title);
                self.extractor
                    .download(&media, self.cache.dir(), &media.content_id.cache_stem())
                    .await?
            }
        };

        Ok(ResolvedSource {
            title: media.title,
            locator: Locator::Local(path),
            duration_secs: media.duration_secs,
            is_live: false,
            mode: ResolveMode::Download,
            content_id: media.content_id,
        })
    }
}

#[async_trait]
impl Resolver for TrackResolver {
    async fn resolve(
        &self,
        query: &str,
        mode: ResolveMode,
    ) -> Result<ResolvedSource, ResolutionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolutionError::NotFound("empty query".into()));
        }

        let media = self.extractor.extract(query).await?;
        debug!(
            "Resolved '{}' to {} (live: {}, mode: {})",
            query, media.content_id, media.is_live, mode
        );

        match mode {
            ResolveMode::Stream => Ok(Self::streamed(media)),
            ResolveMode::Download => self.materialize(media).await,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ResolutionError> {
        let mut results = self.extractor.search(query.trim(), self.search_limit).await?;
        results.truncate(self.search_limit);
        Ok(results)
    }

    async fn discard(&self, source: &ResolvedSource) {
        let Locator::Local(path) = &source.locator else {
            return;
        };
        if let Err(e) = self.cache.evict(path).await {
            warn!("Failed to evict {}: {}", source.content_id, e);
        }
    }
}
