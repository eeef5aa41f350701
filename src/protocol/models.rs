use serde::{Deserialize, Serialize};

use crate::common::types::SessionKey;

/// Body of `POST /v1/sessions/{key}/queue`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// URL, catalog link or free-text search.
    pub query: String,
    pub requester_id: u64,
    /// Where the requester currently is; used to (re)connect the output.
    pub location: Option<String>,
}

/// Body of `POST /v1/sessions/{key}/radio`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioRequest {
    pub genre: Option<String>,
    pub requester_id: u64,
    pub location: Option<String>,
}

/// Body of `POST /v1/sessions/{key}/playlists/{name}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPlaylistRequest {
    pub requester_id: u64,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct Playlist {
    pub name: String,
    pub tracks: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistAdded {
    pub name: String,
    pub length: usize,
}

#[derive(Debug, Serialize)]
pub struct Sessions {
    pub sessions: Vec<SessionKey>,
}
