use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Maximum number of items expanded from one album or playlist link.
    #[serde(default = "default_playlist_load_limit")]
    pub playlist_load_limit: usize,
}

impl SpotifyConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            playlist_load_limit: default_playlist_load_limit(),
        }
    }
}

fn default_playlist_load_limit() -> usize {
    500
}
