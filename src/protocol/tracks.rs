use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How a request is turned into audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveMode {
    /// Play directly from the remote locator.
    Stream,
    /// Materialize the media into the local cache first.
    Download,
}

impl std::fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Where the output transport reads audio from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Locator {
    Remote(String),
    Local(PathBuf),
}

impl Locator {
    pub fn as_input(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Local(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Stable identity of the underlying media, independent of how it was requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId {
    pub extractor: String,
    pub id: String,
}

impl ContentId {
    pub fn new(extractor: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            extractor: extractor.into(),
            id: id.into(),
        }
    }

    /// File-system safe stem used to key the download cache.
    ///
    /// IDs that are not already safe are replaced by a digest so that two
    /// distinct IDs never share a stem.
    pub fn cache_stem(&self) -> String {
        let extractor: String = self
            .extractor
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let safe = !self.id.is_empty()
            && self
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if safe {
            format!("{}-{}", extractor, self.id)
        } else {
            let digest = Sha256::digest(self.id.as_bytes());
            format!("{}-h{}", extractor, &hex::encode(digest)[..24])
        }
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.extractor, self.id)
    }
}

/// A playable source produced by one resolution attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSource {
    pub title: String,
    pub locator: Locator,
    pub duration_secs: Option<u64>,
    pub is_live: bool,
    pub mode: ResolveMode,
    pub content_id: ContentId,
}

/// One candidate of an interactive search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub locator: String,
    pub duration_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stem_is_filesystem_safe() {
        let id = ContentId::new("Youtube", "dQw4w9WgXcQ");
        assert_eq!(id.cache_stem(), "youtube-dQw4w9WgXcQ");

        let odd = ContentId::new("generic", "../etc/passwd?x=1");
        let stem = odd.cache_stem();
        assert!(!stem.contains('/'));
        assert!(!stem.contains('.'));
        assert!(!stem.contains('?'));
        assert!(stem.starts_with("generic-h"));

        let other = ContentId::new("generic", "../etc/passwd?x=2");
        assert_ne!(other.cache_stem(), stem);
    }

    #[test]
    fn test_locator_as_input() {
        assert_eq!(
            Locator::Remote("https://example.com/a.opus".into()).as_input(),
            "https://example.com/a.opus"
        );
        assert_eq!(
            Locator::Local(PathBuf::from("/tmp/x.webm")).as_input(),
            "/tmp/x.webm"
        );
    }
}
