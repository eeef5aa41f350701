use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaybackConfig {
    /// Consecutive playback failures tolerated for a live request before it is dropped.
    #[serde(default = "default_max_live_retries")]
    pub max_live_retries: u32,
    /// Upper bound for establishing the output connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_pending_page_size")]
    pub pending_page_size: usize,
    /// Capacity of each session's notice broadcast channel.
    #[serde(default = "default_notice_buffer")]
    pub notice_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_live_retries: default_max_live_retries(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pending_page_size: default_pending_page_size(),
            notice_buffer: default_notice_buffer(),
        }
    }
}

fn default_max_live_retries() -> u32 {
    3
}

fn default_connect_timeout_secs() -> u64 {
    20
}

fn default_pending_page_size() -> usize {
    10
}

fn default_notice_buffer() -> usize {
    256
}
