use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(?:open\.)?spotify\.com/(?:intl-[a-z]{2}/)?(track|album|playlist)/([a-zA-Z0-9]+)",
    )
    .expect("static spotify url pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Track,
    Album,
    Playlist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLink {
    pub kind: CatalogKind,
    pub id: String,
}

pub struct SpotifyParser;

impl SpotifyParser {
    pub fn parse_link(url: &str) -> Option<CatalogLink> {
        let caps = URL_REGEX.captures(url)?;
        let kind = match caps.get(1)?.as_str() {
            "track" => CatalogKind::Track,
            "album" => CatalogKind::Album,
            "playlist" => CatalogKind::Playlist,
            _ => return None,
        };
        Some(CatalogLink {
            kind,
            id: caps.get(2)?.as_str().to_string(),
        })
    }

    /// `"<first artist> - <title>"`, or just the title when no artist is listed.
    pub fn track_query(track: &Value) -> Option<String> {
        let name = track
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        let artist = track
            .get("artists")
            .and_then(|a| a.as_array())
            .and_then(|a| a.first())
            .and_then(|a| a.get("name"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        Some(match artist {
            Some(artist) => format!("{} - {}", artist, name),
            None => name.to_string(),
        })
    }

    /// Queries of one page of album tracks or playlist items, plus the next
    /// page URL. Playlist items wrap their track and may be null or local files.
    pub fn page_queries(page: &Value) -> (Vec<String>, Option<String>) {
        let queries = page
            .get("items")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let track = match item.get("track") {
                            Some(inner) if inner.is_object() => inner,
                            Some(_) => {
                                debug!("Skipping playlist item without track data");
                                return None;
                            }
                            None => item,
                        };
                        Self::track_query(track)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let next = page
            .get("next")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        (queries, next)
    }
}
