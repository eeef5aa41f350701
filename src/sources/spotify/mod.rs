use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    configs::SpotifyConfig,
    sources::{
        plugin::MetadataLookup,
        spotify::{
            parser::{CatalogKind, CatalogLink, SpotifyParser},
            token::SpotifyTokenTracker,
        },
    },
};

pub mod parser;
pub mod token;

const API_BASE: &str = "https://api.spotify.com/v1";

/// Expands Spotify track, album and playlist links into search queries.
pub struct SpotifyCatalog {
    client: reqwest::Client,
    token_tracker: SpotifyTokenTracker,
    load_limit: usize,
}

impl SpotifyCatalog {
    /// `None` when no client credentials are configured.
    pub fn new(config: &SpotifyConfig, client: reqwest::Client) -> Option<Self> {
        let (client_id, client_secret) = config.credentials()?;
        info!("Spotify catalog lookup enabled");
        Some(Self {
            token_tracker: SpotifyTokenTracker::new(client.clone(), client_id, client_secret),
            client,
            load_limit: config.playlist_load_limit.max(1),
        })
    }

    async fn get_json(&self, url: &str) -> Option<Value> {
        let token = self.token_tracker.get_token().await?;
        let resp = match self.client.get(url).bearer_auth(token).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Spotify request to {} failed: {}", url, e);
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!("Spotify API returned {} for {}", resp.status(), url);
            return None;
        }
        resp.json().await.ok()
    }

    async fn paged_queries(&self, first_page: String) -> Option<Vec<String>> {
        let mut queries = Vec::new();
        let mut next = Some(first_page);

        while let Some(url) = next.take() {
            let page = self.get_json(&url).await?;
            let (mut batch, next_url) = SpotifyParser::page_queries(&page);
            queries.append(&mut batch);
            if queries.len() >= self.load_limit {
                queries.truncate(self.load_limit);
                break;
            }
            next = next_url;
        }
        Some(queries)
    }

    async fn fetch(&self, link: &CatalogLink) -> Option<Vec<String>> {
        match link.kind {
            CatalogKind::Track => {
                let track = self
                    .get_json(&format!("{}/tracks/{}", API_BASE, link.id))
                    .await?;
                SpotifyParser::track_query(&track).map(|q| vec![q])
            }
            CatalogKind::Album => {
                self.paged_queries(format!("{}/albums/{}/tracks?limit=50", API_BASE, link.id))
                    .await
            }
            CatalogKind::Playlist => {
                self.paged_queries(format!(
                    "{}/playlists/{}/tracks?limit=100",
                    API_BASE, link.id
                ))
                .await
            }
        }
    }
}

#[async_trait]
impl MetadataLookup for SpotifyCatalog {
    fn handles(&self, query: &str) -> bool {
        SpotifyParser::parse_link(query).is_some()
    }

    async fn expand(&self, url: &str) -> Vec<String> {
        let Some(link) = SpotifyParser::parse_link(url) else {
            return Vec::new();
        };
        match self.fetch(&link).await {
            Some(queries) => {
                debug!("Expanded {} into {} queries", url, queries.len());
                queries
            }
            None => {
                warn!("Could not expand Spotify link {}", url);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_credentials() {
        let client = reqwest::Client::new();
        assert!(SpotifyCatalog::new(&SpotifyConfig::default(), client.clone()).is_none());

        let config = SpotifyConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        let catalog = SpotifyCatalog::new(&config, client).expect("enabled");
        assert!(catalog.handles("https://open.spotify.com/album/abc123"));
        assert!(!catalog.handles("https://www.youtube.com/watch?v=abc"));
    }
}
