//! Boundary to whatever actually renders audio.
//!
//! The session core only sees the two traits below. Concrete implementations
//! live in [`process`] (a player process per track) and [`connection`]
//! (configured sink targets).

pub mod connection;
pub mod process;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use connection::SinkConnectionManager;
pub use process::ProcessTransport;

use crate::{
    common::{
        errors::{ConnectionError, PlaybackError},
        types::TargetHint,
    },
    protocol::tracks::ResolvedSource,
};

/// An established link to one output target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub id: u64,
    pub target: String,
}

#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn ensure_connected(
        &self,
        hint: Option<&TargetHint>,
    ) -> Result<ConnectionHandle, ConnectionError>;

    async fn disconnect(&self, handle: &ConnectionHandle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Failed(PlaybackError),
}

type ReportFn = Box<dyn FnOnce(PlaybackOutcome) + Send>;

/// One-shot completion report for a single `play` call.
///
/// Consumed by [`finished`](Self::finished) or [`failed`](Self::failed).
/// Dropping it unreported counts as a failure.
pub struct PlaybackReporter {
    report: Option<ReportFn>,
}

impl PlaybackReporter {
    pub fn new(report: impl FnOnce(PlaybackOutcome) + Send + 'static) -> Self {
        Self {
            report: Some(Box::new(report)),
        }
    }

    pub fn finished(mut self) {
        self.send(PlaybackOutcome::Finished);
    }

    pub fn failed(mut self, error: PlaybackError) {
        self.send(PlaybackOutcome::Failed(error));
    }

    fn send(&mut self, outcome: PlaybackOutcome) {
        if let Some(report) = self.report.take() {
            report(outcome);
        }
    }
}

impl Drop for PlaybackReporter {
    fn drop(&mut self) {
        self.send(PlaybackOutcome::Failed(PlaybackError::TransportFailure(
            "playback ended without a report".into(),
        )));
    }
}

#[async_trait]
pub trait OutputTransport: Send + Sync {
    /// Plays `source` to completion. Returns once the reporter has been used.
    /// Cancelling `cancel` halts playback promptly.
    async fn play(
        &self,
        connection: &ConnectionHandle,
        source: &ResolvedSource,
        reporter: PlaybackReporter,
        cancel: CancellationToken,
    );
}
