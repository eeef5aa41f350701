use std::{
    any::Any, collections::HashMap, future::Future, panic::AssertUnwindSafe, sync::Arc,
    time::Duration,
};

use futures::FutureExt;
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    failover::{AttemptFailure, FailoverAction, FailoverPolicy, RetryState},
    queue::{SessionQueue, TrackRequest},
};
use crate::{
    common::{
        errors::{ConnectionError, ResolutionError},
        types::{RequesterId, SessionKey, TargetHint},
    },
    configs::PlaybackConfig,
    output::{
        ConnectionHandle, ConnectionManager, OutputTransport, PlaybackOutcome, PlaybackReporter,
    },
    protocol::{
        events::{FailureReason, SessionNotice},
        tracks::{ResolveMode, ResolvedSource},
    },
    sources::{MetadataLookup, Resolver},
};

/// Process-wide collaborators shared by every session.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn Resolver>,
    pub transport: Arc<dyn OutputTransport>,
    pub connections: Arc<dyn ConnectionManager>,
    pub metadata: Option<Arc<dyn MetadataLookup>>,
}

#[derive(Debug)]
pub enum PlaybackState {
    Idle,
    /// Re-establishing the output connection before resolving.
    Connecting { attempt: u64 },
    Resolving { attempt: u64, mode: ResolveMode },
    Playing { attempt: u64, source: ResolvedSource },
}

impl PlaybackState {
    fn attempt(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Connecting { attempt }
            | Self::Resolving { attempt, .. }
            | Self::Playing { attempt, .. } => Some(*attempt),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting { .. } => "connecting",
            Self::Resolving { .. } => "resolving",
            Self::Playing { .. } => "playing",
        }
    }
}

/// Completions of work the controller spawned. Each carries the attempt (or
/// epoch) it belongs to so results of cancelled work can be dropped.
#[derive(Debug)]
pub enum SessionEvent {
    Connected {
        attempt: u64,
        result: Result<ConnectionHandle, ConnectionError>,
    },
    Resolved {
        attempt: u64,
        result: Result<ResolvedSource, ResolutionError>,
    },
    Played {
        attempt: u64,
        outcome: PlaybackOutcome,
    },
    /// The spawned work for `attempt` panicked.
    Crashed { attempt: u64, detail: String },
    Expanded {
        epoch: u64,
        source: String,
        requester: RequesterId,
        queries: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: &'static str,
    pub current: Option<TrackRequest>,
    pub title: Option<String>,
    pub looping: bool,
    pub pending: usize,
    pub connected: bool,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Playback state machine of one session.
///
/// Never shared: the session supervisor owns it and feeds it commands and
/// [`SessionEvent`]s one at a time.
pub struct PlaybackController {
    key: SessionKey,
    services: Collaborators,
    policy: FailoverPolicy,
    connect_timeout: Duration,

    queue: SessionQueue,
    retry: RetryState,
    current: Option<TrackRequest>,
    looping: bool,
    state: PlaybackState,
    attempt: u64,
    /// Bumped on stop and teardown so pending catalog expansions are dropped.
    epoch: u64,
    had_activity: bool,

    connection: Option<ConnectionHandle>,
    locations: HashMap<RequesterId, TargetHint>,
    task: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,

    events: mpsc::UnboundedSender<SessionEvent>,
    notices: broadcast::Sender<SessionNotice>,
}

impl PlaybackController {
    pub fn new(
        key: SessionKey,
        services: Collaborators,
        config: &PlaybackConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
        notices: broadcast::Sender<SessionNotice>,
    ) -> Self {
        Self {
            key,
            services,
            policy: FailoverPolicy::new(config.max_live_retries),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            queue: SessionQueue::new(),
            retry: RetryState::new(),
            current: None,
            looping: false,
            state: PlaybackState::Idle,
            attempt: 0,
            epoch: 0,
            had_activity: false,
            connection: None,
            locations: HashMap::new(),
            task: None,
            cancel: None,
            events,
            notices,
        }
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notices.send(notice);
    }

    fn remember(&mut self, requester: RequesterId, location: Option<TargetHint>) {
        if let Some(location) = location {
            self.locations.insert(requester, location);
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state.name(),
            current: self.current.clone(),
            title: match &self.state {
                PlaybackState::Playing { source, .. } => Some(source.title.clone()),
                _ => None,
            },
            looping: self.looping,
            pending: self.queue.len(),
            connected: self.connection.is_some(),
        }
    }

    pub fn list_pending(&self, limit: usize) -> Vec<TrackRequest> {
        self.queue.peek(limit)
    }

    pub fn submit(&mut self, query: String, requester: RequesterId, location: Option<TargetHint>) {
        self.remember(requester, location);
        let query = query.trim().to_string();
        if query.is_empty() {
            self.notify(SessionNotice::NothingFound { query });
            return;
        }

        if let Some(lookup) = self.services.metadata.clone() {
            if lookup.handles(&query) {
                self.start_expansion(lookup, query, requester);
                return;
            }
        }

        let position = self
            .queue
            .enqueue(TrackRequest::new(query.clone(), requester));
        debug!("[{}] Queued '{}' at {}", self.key, query, position);
        self.notify(SessionNotice::Queued { query, position });
        self.advance();
    }

    /// Enqueues an ordered batch (a stored playlist or an expanded catalog link).
    pub fn submit_batch(
        &mut self,
        source: String,
        queries: Vec<String>,
        requester: RequesterId,
        location: Option<TargetHint>,
    ) {
        self.remember(requester, location);
        self.enqueue_batch(source, queries, requester);
    }

    fn enqueue_batch(&mut self, source: String, queries: Vec<String>, requester: RequesterId) {
        let mut count = 0;
        for query in queries {
            let query = query.trim();
            if query.is_empty() {
                continue;
            }
            self.queue.enqueue(TrackRequest::new(query, requester));
            count += 1;
        }

        if count == 0 {
            self.notify(SessionNotice::NothingFound { query: source });
            return;
        }
        info!("[{}] Queued {} tracks from {}", self.key, count, source);
        self.notify(SessionNotice::BatchQueued { source, count });
        self.advance();
    }

    fn start_expansion(
        &mut self,
        lookup: Arc<dyn MetadataLookup>,
        url: String,
        requester: RequesterId,
    ) {
        debug!("[{}] Expanding catalog link {}", self.key, url);
        let events = self.events.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let queries = AssertUnwindSafe(lookup.expand(&url))
                .catch_unwind()
                .await
                .unwrap_or_default();
            let _ = events.send(SessionEvent::Expanded {
                epoch,
                source: url,
                requester,
                queries,
            });
        });
    }

    pub fn skip(&mut self) {
        let skipped = self.current.as_ref().map(|r| r.query.clone());
        if skipped.is_some() {
            self.halt();
            self.current = None;
            self.state = PlaybackState::Idle;
            info!("[{}] Skipped '{}'", self.key, skipped.as_deref().unwrap_or_default());
        }
        self.notify(SessionNotice::Skipped { query: skipped });
        self.advance();
    }

    pub fn stop(&mut self) {
        self.reset();
        info!("[{}] Stopped", self.key);
        self.notify(SessionNotice::Stopped);
    }

    pub fn toggle_loop(&mut self) {
        self.looping = !self.looping;
        self.notify(SessionNotice::LoopChanged {
            enabled: self.looping,
        });
    }

    pub fn shuffle(&mut self) {
        let count = self.queue.len();
        if self.queue.shuffle() {
            self.notify(SessionNotice::Shuffled { count });
        } else {
            self.notify(SessionNotice::ShuffleRejected { count });
        }
    }

    /// The front-end reports that the output connection went away. The next
    /// track reconnects.
    pub fn connection_lost(&mut self) {
        let Some(handle) = self.connection.take() else {
            return;
        };
        warn!("[{}] Output connection lost", self.key);
        let connections = self.services.connections.clone();
        tokio::spawn(async move { connections.disconnect(&handle).await });
    }

    pub async fn teardown(&mut self) {
        self.reset();
        self.retry.clear();
        if let Some(handle) = self.connection.take() {
            self.services.connections.disconnect(&handle).await;
        }
        info!("[{}] Session closed", self.key);
        self.notify(SessionNotice::Closed);
    }

    fn reset(&mut self) {
        self.halt();
        self.queue.clear();
        self.current = None;
        self.state = PlaybackState::Idle;
        self.epoch += 1;
        self.had_activity = false;
    }

    /// Cancels whatever the current attempt has in flight.
    fn halt(&mut self) {
        match self.cancel.take() {
            Some(token) => {
                token.cancel();
                self.task = None;
            }
            None => {
                if let Some(task) = self.task.take() {
                    task.abort();
                }
            }
        }
    }

    pub async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { attempt, result } => self.on_connected(attempt, result),
            SessionEvent::Resolved { attempt, result } => self.on_resolved(attempt, result),
            SessionEvent::Played { attempt, outcome } => self.on_played(attempt, outcome).await,
            SessionEvent::Crashed { attempt, detail } => self.on_crashed(attempt, detail),
            SessionEvent::Expanded {
                epoch,
                source,
                requester,
                queries,
            } => {
                if epoch != self.epoch {
                    debug!("[{}] Dropping stale expansion of {}", self.key, source);
                    return;
                }
                self.enqueue_batch(source, queries, requester);
            }
        }
    }

    /// Idle → next request, or "queue finished" when there is none.
    fn advance(&mut self) {
        if !matches!(self.state, PlaybackState::Idle) {
            return;
        }

        let Some(request) = self.queue.dequeue_front() else {
            if self.had_activity {
                self.had_activity = false;
                debug!("[{}] Queue finished", self.key);
                self.notify(SessionNotice::QueueFinished);
            }
            return;
        };

        self.attempt += 1;
        self.had_activity = true;
        let attempt = self.attempt;
        let requester = request.requester;
        self.current = Some(request);

        if self.connection.is_some() {
            self.start_resolve(attempt);
        } else {
            self.start_connect(attempt, requester);
        }
    }

    fn spawn_guarded<F, T>(
        &self,
        attempt: u64,
        work: F,
        wrap: impl FnOnce(T) -> Option<SessionEvent> + Send + 'static,
    ) -> JoinHandle<()>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(value) => wrap(value),
                Err(panic) => Some(SessionEvent::Crashed {
                    attempt,
                    detail: panic_message(panic.as_ref()),
                }),
            };
            if let Some(event) = event {
                let _ = events.send(event);
            }
        })
    }

    fn start_connect(&mut self, attempt: u64, requester: RequesterId) {
        let hint = self.locations.get(&requester).cloned();
        debug!("[{}] Connecting output (hint: {:?})", self.key, hint);

        let connections = self.services.connections.clone();
        let timeout = self.connect_timeout;
        let work = async move {
            match tokio::time::timeout(timeout, connections.ensure_connected(hint.as_ref())).await {
                Ok(result) => result,
                Err(_) => Err(ConnectionError::Timeout),
            }
        };

        self.state = PlaybackState::Connecting { attempt };
        self.task = Some(self.spawn_guarded(attempt, work, move |result| {
            Some(SessionEvent::Connected { attempt, result })
        }));
    }

    fn start_resolve(&mut self, attempt: u64) {
        let Some(query) = self.current.as_ref().map(|r| r.query.clone()) else {
            return;
        };
        let mode = self.policy.decide_mode(&query, &self.retry);
        debug!("[{}] Resolving '{}' ({})", self.key, query, mode);

        let resolver = self.services.resolver.clone();
        let work = async move { resolver.resolve(&query, mode).await };

        self.state = PlaybackState::Resolving { attempt, mode };
        self.task = Some(self.spawn_guarded(attempt, work, move |result| {
            Some(SessionEvent::Resolved { attempt, result })
        }));
    }

    fn start_play(&mut self, attempt: u64, source: ResolvedSource) {
        let Some(connection) = self.connection.clone() else {
            // Lost while resolving; go around again through a reconnect.
            if let Some(request) = self.current.take() {
                self.queue.enqueue_front(request);
            }
            self.state = PlaybackState::Idle;
            self.advance();
            return;
        };
        let query = self
            .current
            .as_ref()
            .map(|r| r.query.clone())
            .unwrap_or_default();

        info!(
            "[{}] Now playing '{}' ({}, live: {})",
            self.key, source.title, source.mode, source.is_live
        );
        self.notify(SessionNotice::NowPlaying {
            title: source.title.clone(),
            query,
            mode: source.mode,
            is_live: source.is_live,
        });

        let events = self.events.clone();
        let reporter = PlaybackReporter::new(move |outcome| {
            let _ = events.send(SessionEvent::Played { attempt, outcome });
        });
        let token = CancellationToken::new();
        let transport = self.services.transport.clone();
        let playing = source.clone();
        let cancel = token.clone();
        let work = async move {
            transport
                .play(&connection, &playing, reporter, cancel)
                .await
        };

        self.state = PlaybackState::Playing { attempt, source };
        self.cancel = Some(token);
        self.task = Some(self.spawn_guarded(attempt, work, |()| None));
    }

    fn is_current(&self, attempt: u64) -> bool {
        let current = self.state.attempt() == Some(attempt);
        if !current {
            debug!("[{}] Ignoring stale result of attempt {}", self.key, attempt);
        }
        current
    }

    fn on_connected(&mut self, attempt: u64, result: Result<ConnectionHandle, ConnectionError>) {
        if !self.is_current(attempt) || !matches!(self.state, PlaybackState::Connecting { .. }) {
            return;
        }
        self.task = None;
        match result {
            Ok(handle) => {
                self.connection = Some(handle);
                self.start_resolve(attempt);
            }
            Err(e) => self.abandon(FailureReason::Connection, e.to_string()),
        }
    }

    fn on_resolved(&mut self, attempt: u64, result: Result<ResolvedSource, ResolutionError>) {
        if !self.is_current(attempt) {
            return;
        }
        let PlaybackState::Resolving { mode, .. } = self.state else {
            return;
        };
        self.task = None;
        match result {
            Ok(source) => self.start_play(attempt, source),
            Err(e) => {
                let detail = e.to_string();
                self.fail_current(mode, AttemptFailure::Resolution(&e), detail);
            }
        }
    }

    async fn on_played(&mut self, attempt: u64, outcome: PlaybackOutcome) {
        if !self.is_current(attempt) || !matches!(self.state, PlaybackState::Playing { .. }) {
            return;
        }
        let PlaybackState::Playing { source, .. } =
            std::mem::replace(&mut self.state, PlaybackState::Idle)
        else {
            return;
        };
        self.task = None;
        self.cancel = None;

        match outcome {
            PlaybackOutcome::Finished => {
                if let Some(request) = self.current.take() {
                    self.policy.record_success(&request.query, &mut self.retry);
                    if self.looping {
                        self.queue.enqueue_front(request);
                    }
                }
                self.advance();
            }
            PlaybackOutcome::Failed(e) => {
                // Evicted before anything else in this session can resolve it again.
                if source.mode == ResolveMode::Download {
                    self.services.resolver.discard(&source).await;
                }
                self.fail_current(
                    source.mode,
                    AttemptFailure::Playback {
                        is_live: source.is_live,
                    },
                    e.to_string(),
                );
            }
        }
    }

    fn on_crashed(&mut self, attempt: u64, detail: String) {
        if !self.is_current(attempt) {
            return;
        }
        error!("[{}] Attempt {} crashed: {}", self.key, attempt, detail);
        let mode = match &self.state {
            PlaybackState::Resolving { mode, .. } => *mode,
            PlaybackState::Playing { source, .. } => source.mode,
            _ => ResolveMode::Stream,
        };
        self.halt();
        self.fail_current(mode, AttemptFailure::Internal, detail);
    }

    /// Runs the failover policy for the current request and moves on.
    fn fail_current(&mut self, mode: ResolveMode, failure: AttemptFailure<'_>, detail: String) {
        self.state = PlaybackState::Idle;
        self.task = None;
        self.cancel = None;

        if let Some(request) = self.current.take() {
            match self
                .policy
                .record_failure(&request.query, &mut self.retry, mode, failure)
            {
                FailoverAction::Retry => {
                    warn!(
                        "[{}] '{}' failed in {} mode ({}), retrying",
                        self.key, request.query, mode, detail
                    );
                    self.queue.enqueue_front(request);
                }
                FailoverAction::GiveUp(reason) => {
                    error!(
                        "[{}] Giving up on '{}' ({:?}): {}",
                        self.key, request.query, reason, detail
                    );
                    let query = request.query;
                    self.notify(match reason {
                        FailureReason::AuthRequired => SessionNotice::AuthRequired { query, detail },
                        reason => SessionNotice::TrackFailed {
                            query,
                            reason,
                            detail,
                        },
                    });
                }
            }
        }
        self.advance();
    }

    /// The session cannot reach its output: drop everything pending.
    fn abandon(&mut self, reason: FailureReason, detail: String) {
        let mut discarded: Vec<String> = self.current.take().into_iter().map(|r| r.query).collect();
        discarded.extend(self.queue.clear().into_iter().map(|r| r.query));

        error!(
            "[{}] {}; discarding {} queued tracks",
            self.key,
            detail,
            discarded.len()
        );
        self.state = PlaybackState::Idle;
        self.had_activity = false;
        self.notify(SessionNotice::Terminal {
            reason,
            detail,
            discarded,
        });
    }
}
