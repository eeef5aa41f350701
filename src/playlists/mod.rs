//! Named playlists stored as JSON arrays of queries, one file per playlist.

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::sync::Mutex;
use tracing::{debug, info};

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("invalid playlist name '{0}'")]
    InvalidName(String),
    #[error("playlist '{0}' does not exist")]
    NotFound(String),
    #[error("playlist '{0}' already exists")]
    AlreadyExists(String),
    #[error("playlist '{name}' is corrupt: {source}")]
    Corrupt {
        name: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct PlaylistStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl PlaylistStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            info!("Created playlist directory: {}", dir.display());
        }
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, name: &str) -> Result<PathBuf, PlaylistError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PlaylistError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    async fn read(&self, name: &str, path: &Path) -> Result<Vec<String>, PlaylistError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PlaylistError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|source| PlaylistError::Corrupt {
            name: name.to_string(),
            source,
        })
    }

    async fn write(&self, path: &Path, tracks: &[String]) -> Result<(), PlaylistError> {
        let body = serde_json::to_vec_pretty(tracks).map_err(io::Error::from)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Playlist names, sorted.
    pub async fn list(&self) -> Result<Vec<String>, PlaylistError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn create(&self, name: &str) -> Result<(), PlaylistError> {
        let path = self.path(name)?;
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(&path).await? {
            return Err(PlaylistError::AlreadyExists(name.to_string()));
        }
        self.write(&path, &[]).await?;
        info!("Created playlist '{}'", name);
        Ok(())
    }

    /// Appends a query and returns the new length.
    pub async fn add(&self, name: &str, query: &str) -> Result<usize, PlaylistError> {
        let path = self.path(name)?;
        let _guard = self.write_lock.lock().await;
        let mut tracks = self.read(name, &path).await?;
        tracks.push(query.trim().to_string());
        self.write(&path, &tracks).await?;
        debug!("Added '{}' to playlist '{}'", query, name);
        Ok(tracks.len())
    }

    pub async fn load(&self, name: &str) -> Result<Vec<String>, PlaylistError> {
        let path = self.path(name)?;
        self.read(name, &path).await
    }

    pub async fn delete(&self, name: &str) -> Result<(), PlaylistError> {
        let path = self.path(name)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted playlist '{}'", name);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(PlaylistError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, PlaylistStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path().join("playlists")).expect("store");
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_add_load_delete() {
        let (_dir, store) = store();
        store.create("chill").await.expect("create");
        assert_eq!(store.add("chill", "lofi beats").await.expect("add"), 1);
        assert_eq!(store.add("chill", " rain sounds ").await.expect("add"), 2);

        assert_eq!(
            store.load("chill").await.expect("load"),
            vec!["lofi beats", "rain sounds"]
        );
        assert_eq!(store.list().await.expect("list"), vec!["chill"]);

        store.delete("chill").await.expect("delete");
        assert!(matches!(
            store.load("chill").await,
            Err(PlaylistError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_and_missing() {
        let (_dir, store) = store();
        store.create("a").await.expect("create");
        assert!(matches!(
            store.create("a").await,
            Err(PlaylistError::AlreadyExists(_))
        ));
        assert!(matches!(
            store.add("b", "song").await,
            Err(PlaylistError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("b").await,
            Err(PlaylistError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_names_cannot_escape_directory() {
        let (_dir, store) = store();
        for name in ["../etc", "a/b", "", "with space", &"x".repeat(65)] {
            assert!(
                matches!(store.create(name).await, Err(PlaylistError::InvalidName(_))),
                "{}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("playlists/bad.json"), b"{not json").expect("write");
        assert!(matches!(
            store.load("bad").await,
            Err(PlaylistError::Corrupt { .. })
        ));
    }
}
