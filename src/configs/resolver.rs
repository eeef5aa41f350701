use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResolverConfig {
    /// Extractor executable, looked up on PATH when not absolute.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Shared download cache, keyed by content ID.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_format")]
    pub format: String,
    /// Prefix used for free-text queries (`<prefix>:<query>`).
    #[serde(default = "default_search")]
    pub default_search: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            cache_dir: default_cache_dir(),
            format: default_format(),
            default_search: default_search(),
            search_limit: default_search_limit(),
            timeout_secs: default_timeout_secs(),
            extra_args: Vec::new(),
        }
    }
}

fn default_binary() -> String {
    "yt-dlp".to_string()
}

fn default_cache_dir() -> String {
    "data/cache".to_string()
}

fn default_format() -> String {
    "bestaudio/best".to_string()
}

fn default_search() -> String {
    "ytsearch".to_string()
}

fn default_search_limit() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    60
}
