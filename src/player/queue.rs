use std::collections::VecDeque;

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::common::types::RequesterId;

/// A pending request as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub query: String,
    pub requester: RequesterId,
}

impl TrackRequest {
    pub fn new(query: impl Into<String>, requester: RequesterId) -> Self {
        Self {
            query: query.into(),
            requester,
        }
    }
}

/// Pending requests of one session. The track being resolved or played is
/// never in here; it lives in the controller's `current` slot.
#[derive(Debug, Default)]
pub struct SessionQueue {
    entries: VecDeque<TrackRequest>,
}

impl SessionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the back and returns the 1-based position.
    pub fn enqueue(&mut self, request: TrackRequest) -> usize {
        self.entries.push_back(request);
        self.entries.len()
    }

    /// Loop replay and failure retry only.
    pub fn enqueue_front(&mut self, request: TrackRequest) {
        self.entries.push_front(request);
    }

    pub fn dequeue_front(&mut self) -> Option<TrackRequest> {
        self.entries.pop_front()
    }

    /// Uniformly permutes the pending entries. Returns `false` (and leaves the
    /// queue untouched) when there are fewer than two.
    pub fn shuffle(&mut self) -> bool {
        if self.entries.len() < 2 {
            return false;
        }
        self.entries
            .make_contiguous()
            .shuffle(&mut rand::thread_rng());
        true
    }

    /// Drops everything pending and hands it back.
    pub fn clear(&mut self) -> Vec<TrackRequest> {
        self.entries.drain(..).collect()
    }

    pub fn peek(&self, n: usize) -> Vec<TrackRequest> {
        self.entries.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
