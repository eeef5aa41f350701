//! Strict readers for `yt-dlp --dump-single-json` output.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::{
    common::errors::ResolutionError,
    protocol::tracks::{ContentId, SearchResult},
    sources::plugin::MediaInfo,
};

#[derive(Debug, Deserialize)]
struct RawInfo {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    is_live: Option<bool>,
    live_status: Option<String>,
    extractor_key: Option<String>,
    extractor: Option<String>,
    ie_key: Option<String>,
    #[serde(default)]
    entries: Option<Vec<Option<RawInfo>>>,
}

impl RawInfo {
    fn is_live(&self) -> bool {
        self.is_live == Some(true) || self.live_status.as_deref() == Some("is_live")
    }

    fn extractor_name(&self) -> Option<&str> {
        self.extractor_key
            .as_deref()
            .or(self.ie_key.as_deref())
            .or(self.extractor.as_deref())
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, ResolutionError> {
    match field.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ResolutionError::Malformed(format!("missing field '{}'", name))),
    }
}

fn duration_secs(raw: Option<f64>) -> Option<u64> {
    raw.filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.round() as u64)
}

fn parse_raw(json: &str) -> Result<RawInfo, ResolutionError> {
    serde_json::from_str(json).map_err(|e| ResolutionError::Malformed(e.to_string()))
}

/// Parses the metadata of a single item. A search result page contributes its
/// first entry; an empty page means nothing matched.
pub fn parse_media(json: &str) -> Result<MediaInfo, ResolutionError> {
    let mut raw = parse_raw(json)?;

    if let Some(entries) = raw.entries.take() {
        let extractor = raw.extractor_name().map(str::to_string);
        let Some(mut first) = entries.into_iter().flatten().next() else {
            return Err(ResolutionError::NotFound("no matching entries".into()));
        };
        if first.extractor_name().is_none() {
            first.extractor_key = extractor;
        }
        raw = first;
    }

    let id = required(&raw.id, "id")?;
    let title = required(&raw.title, "title")?;
    let stream_url = required(&raw.url, "url")?;
    let extractor = raw.extractor_name().unwrap_or("generic");

    Ok(MediaInfo {
        content_id: ContentId::new(extractor, id),
        title: title.to_string(),
        stream_url: stream_url.to_string(),
        page_url: raw.webpage_url.clone().filter(|u| !u.trim().is_empty()),
        duration_secs: duration_secs(raw.duration),
        is_live: raw.is_live(),
    })
}

/// Parses a flat search page. Null entries are skipped; an entry without a
/// title or a usable link fails the whole page.
pub fn parse_search(json: &str) -> Result<Vec<SearchResult>, ResolutionError> {
    let raw = parse_raw(json)?;
    let entries = raw
        .entries
        .ok_or_else(|| ResolutionError::Malformed("search page without entries".into()))?;

    entries
        .into_iter()
        .flatten()
        .map(|entry| {
            let title = required(&entry.title, "title")?;
            let locator = required(&entry.webpage_url, "webpage_url")
                .or_else(|_| required(&entry.url, "url"))?;
            Ok(SearchResult {
                title: title.to_string(),
                locator: locator.to_string(),
                duration_secs: duration_secs(entry.duration),
            })
        })
        .collect()
}

/// Final path printed by `--print after_move:filepath`.
pub fn parse_download_path(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rfind(|l| !l.is_empty())
}

static AUTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)sign in to confirm|login required|log in|private video|members[- ]only|age[- ]restricted|confirm your age|requires authentication|use --cookies",
    )
    .expect("static auth pattern")
});

static NOT_FOUND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)video unavailable|not available|does not exist|has been removed|http error 404|unsupported url|is not a valid url|no video results|no results|unable to find",
    )
    .expect("static not-found pattern")
});

/// Maps a failed run's stderr onto a resolution error kind. Anything that
/// does not look like a permanent condition is treated as a network failure.
pub fn classify_failure(stderr: &str) -> ResolutionError {
    let detail = stderr
        .lines()
        .map(str::trim)
        .rfind(|l| l.starts_with("ERROR"))
        .or_else(|| stderr.lines().map(str::trim).rfind(|l| !l.is_empty()))
        .unwrap_or("extractor exited without output")
        .to_string();

    if AUTH_PATTERN.is_match(stderr) {
        ResolutionError::AuthRequired(detail)
    } else if NOT_FOUND_PATTERN.is_match(stderr) {
        ResolutionError::NotFound(detail)
    } else {
        ResolutionError::Network(detail)
    }
}
