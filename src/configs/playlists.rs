use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaylistsConfig {
    #[serde(default = "default_dir")]
    pub dir: String,
}

impl Default for PlaylistsConfig {
    fn default() -> Self {
        Self { dir: default_dir() }
    }
}

fn default_dir() -> String {
    "data/playlists".to_string()
}
