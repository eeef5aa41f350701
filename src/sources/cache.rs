//! Process-wide download cache.
//!
//! Artifacts are stored as `<dir>/<stem>.<ext>` where `stem` is derived from the
//! content ID, so every session resolving the same media lands on the same file.
//! There is no locking: concurrent downloads of one ID overwrite each other
//! with identical bytes.

use std::{
    io,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::protocol::tracks::ContentId;

/// Suffixes of files an extractor may leave behind mid-download.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".tmp"];

#[derive(Debug, Clone)]
pub struct DownloadCache {
    dir: PathBuf,
}

impl DownloadCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            info!("Created download cache directory: {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Finished artifact for `id`, if one was materialized before.
    pub async fn find(&self, id: &ContentId) -> Option<PathBuf> {
        let prefix = format!("{}.", id.cache_stem());
        let mut entries = tokio::fs::read_dir(&self.dir).await.ok()?;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(&prefix) || PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                continue;
            }
            match entry.metadata().await {
                Ok(meta) if meta.is_file() && meta.len() > 0 => {
                    debug!("Download cache hit for {}: {}", id, name);
                    return Some(entry.path());
                }
                _ => continue,
            }
        }
        None
    }

    /// Drops one artifact, e.g. after it proved unplayable.
    ///
    /// Only the given file is removed, so a newer download of the same
    /// content under another extension survives. Paths outside the cache
    /// directory are ignored.
    pub async fn evict(&self, path: &Path) -> io::Result<bool> {
        if !path.starts_with(&self.dir) {
            debug!("Not evicting {}: outside the cache", path.display());
            return Ok(false);
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!("Evicted cached artifact {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_matches_stem_prefix_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DownloadCache::new(dir.path()).expect("cache");
        let id = ContentId::new("youtube", "abc");

        assert!(cache.find(&id).await.is_none());

        std::fs::write(dir.path().join("youtube-abcd.webm"), b"other").expect("write");
        std::fs::write(dir.path().join("youtube-abc.webm.part"), b"partial").expect("write");
        assert!(cache.find(&id).await.is_none());

        std::fs::write(dir.path().join("youtube-abc.webm"), b"audio").expect("write");
        assert_eq!(
            cache.find(&id).await,
            Some(dir.path().join("youtube-abc.webm"))
        );
    }

    #[tokio::test]
    async fn test_empty_files_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DownloadCache::new(dir.path()).expect("cache");
        let id = ContentId::new("youtube", "empty");
        std::fs::write(dir.path().join("youtube-empty.m4a"), b"").expect("write");
        assert!(cache.find(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_evict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DownloadCache::new(dir.path().join("nested")).expect("cache");
        let id = ContentId::new("soundcloud", "123");
        let stale = cache.dir().join("soundcloud-123.mp3");
        std::fs::write(&stale, b"audio").expect("write");

        assert!(cache.evict(&stale).await.expect("evict"));
        assert!(!cache.evict(&stale).await.expect("evict"));
        assert!(cache.find(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_evict_keeps_other_artifacts_of_same_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DownloadCache::new(dir.path()).expect("cache");
        let id = ContentId::new("youtube", "abc");
        let stale = dir.path().join("youtube-abc.webm");
        let fresh = dir.path().join("youtube-abc.m4a");
        std::fs::write(&stale, b"broken").expect("write");
        std::fs::write(&fresh, b"audio").expect("write");

        assert!(cache.evict(&stale).await.expect("evict"));
        assert_eq!(cache.find(&id).await, Some(fresh));
    }

    #[tokio::test]
    async fn test_evict_ignores_paths_outside_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DownloadCache::new(dir.path().join("cache")).expect("cache");
        let outside = dir.path().join("keep.mp3");
        std::fs::write(&outside, b"audio").expect("write");

        assert!(!cache.evict(&outside).await.expect("evict"));
        assert!(outside.exists());
    }
}
