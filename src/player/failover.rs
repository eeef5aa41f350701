use std::collections::HashMap;

use tracing::debug;

use crate::{
    common::errors::ResolutionError,
    protocol::{events::FailureReason, tracks::ResolveMode},
};

/// Failover bookkeeping for one request text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryEntry {
    pub forced_download: bool,
    pub live_failures: u32,
}

/// Per-session map from request text to its failover history.
///
/// Two requests with identical text share one entry.
#[derive(Debug, Default)]
pub struct RetryState {
    entries: HashMap<String, RetryEntry>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<&RetryEntry> {
        self.entries.get(query)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry(&mut self, query: &str) -> &mut RetryEntry {
        self.entries.entry(query.to_string()).or_default()
    }

    fn prune(&mut self, query: &str) {
        if self.entries.get(query) == Some(&RetryEntry::default()) {
            self.entries.remove(query);
        }
    }
}

/// What went wrong with one attempt.
#[derive(Debug, Clone, Copy)]
pub enum AttemptFailure<'a> {
    Resolution(&'a ResolutionError),
    Playback { is_live: bool },
    /// A panic or other fault inside the attempt itself.
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverAction {
    /// Put the request back at the front of the queue.
    Retry,
    /// Report the track and move on.
    GiveUp(FailureReason),
}

#[derive(Debug, Clone, Copy)]
pub struct FailoverPolicy {
    max_live_retries: u32,
}

impl FailoverPolicy {
    pub fn new(max_live_retries: u32) -> Self {
        Self { max_live_retries }
    }

    pub fn decide_mode(&self, query: &str, state: &RetryState) -> ResolveMode {
        match state.get(query) {
            Some(entry) if entry.forced_download => ResolveMode::Download,
            _ => ResolveMode::Stream,
        }
    }

    /// A clean playback wipes the request's history.
    pub fn record_success(&self, query: &str, state: &mut RetryState) {
        if state.entries.remove(query).is_some() {
            debug!("Cleared failover history for '{}'", query);
        }
    }

    pub fn record_failure(
        &self,
        query: &str,
        state: &mut RetryState,
        mode: ResolveMode,
        failure: AttemptFailure<'_>,
    ) -> FailoverAction {
        match failure {
            AttemptFailure::Internal => FailoverAction::GiveUp(FailureReason::Internal),
            AttemptFailure::Resolution(err) => {
                if !err.is_retryable() {
                    return FailoverAction::GiveUp(FailureReason::from(err));
                }
                self.escalate(query, state, mode, FailureReason::Network)
            }
            AttemptFailure::Playback { is_live: true } => {
                let entry = state.entry(query);
                entry.live_failures += 1;
                if entry.live_failures > self.max_live_retries {
                    entry.live_failures = 0;
                    state.prune(query);
                    return FailoverAction::GiveUp(FailureReason::LiveRetriesExhausted);
                }
                debug!(
                    "Live playback of '{}' failed ({}/{}), retrying stream",
                    query, entry.live_failures, self.max_live_retries
                );
                FailoverAction::Retry
            }
            AttemptFailure::Playback { is_live: false } => {
                self.escalate(query, state, mode, FailureReason::Playback)
            }
        }
    }

    fn escalate(
        &self,
        query: &str,
        state: &mut RetryState,
        mode: ResolveMode,
        reason: FailureReason,
    ) -> FailoverAction {
        match mode {
            ResolveMode::Stream => {
                state.entry(query).forced_download = true;
                debug!("Escalating '{}' to download mode", query);
                FailoverAction::Retry
            }
            ResolveMode::Download => FailoverAction::GiveUp(reason),
        }
    }
}
