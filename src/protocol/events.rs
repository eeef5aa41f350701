use serde::Serialize;

use crate::{
    common::{errors::ResolutionError, types::SessionKey},
    protocol::tracks::ResolveMode,
};

/// Reason class attached to a failed or discarded track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    NotFound,
    AuthRequired,
    Network,
    Malformed,
    Playback,
    LiveRetriesExhausted,
    Connection,
    Internal,
}

impl From<&ResolutionError> for FailureReason {
    fn from(e: &ResolutionError) -> Self {
        match e {
            ResolutionError::NotFound(_) => Self::NotFound,
            ResolutionError::AuthRequired(_) => Self::AuthRequired,
            ResolutionError::Network(_) => Self::Network,
            ResolutionError::Malformed(_) => Self::Malformed,
        }
    }
}

/// Outward notices emitted by a session, in the order they happen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionNotice {
    #[serde(rename_all = "camelCase")]
    Queued { query: String, position: usize },
    #[serde(rename_all = "camelCase")]
    BatchQueued { source: String, count: usize },
    NothingFound { query: String },
    #[serde(rename_all = "camelCase")]
    NowPlaying {
        title: String,
        query: String,
        mode: ResolveMode,
        is_live: bool,
    },
    QueueFinished,
    TrackFailed {
        query: String,
        reason: FailureReason,
        detail: String,
    },
    AuthRequired { query: String, detail: String },
    Skipped { query: Option<String> },
    Stopped,
    LoopChanged { enabled: bool },
    Shuffled { count: usize },
    ShuffleRejected { count: usize },
    /// The session can no longer play; everything pending was dropped.
    Terminal {
        reason: FailureReason,
        detail: String,
        discarded: Vec<String>,
    },
    Closed,
}

/// A notice tagged with its session, as sent over the event socket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeEnvelope<'a> {
    pub session: &'a SessionKey,
    #[serde(flatten)]
    pub notice: &'a SessionNotice,
}
