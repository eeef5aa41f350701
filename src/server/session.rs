use flume::{Receiver, Sender};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::{
    common::types::{RequesterId, SessionKey, TargetHint},
    configs::PlaybackConfig,
    player::{
        controller::{Collaborators, PlaybackController, SessionEvent, SessionStatus},
        queue::TrackRequest,
    },
    protocol::events::SessionNotice,
};

/// Messages from front-ends to a session task.
pub enum SessionCommand {
    Submit {
        query: String,
        requester: RequesterId,
        location: Option<TargetHint>,
    },
    SubmitBatch {
        source: String,
        queries: Vec<String>,
        requester: RequesterId,
        location: Option<TargetHint>,
    },
    Skip,
    Stop,
    ToggleLoop,
    Shuffle,
    ConnectionLost,
    ListPending {
        limit: usize,
        reply: oneshot::Sender<Vec<TrackRequest>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Teardown,
}

/// Cheap, cloneable entry point to one session task.
///
/// Every call returns immediately; the session applies commands in the order
/// they were sent.
#[derive(Clone)]
pub struct SessionHandle {
    key: SessionKey,
    commands: Sender<SessionCommand>,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionHandle {
    pub fn spawn(key: SessionKey, services: Collaborators, config: &PlaybackConfig) -> Self {
        let (command_tx, command_rx) = flume::unbounded();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notice_tx, _) = broadcast::channel(config.notice_buffer.max(16));

        let controller =
            PlaybackController::new(key.clone(), services, config, event_tx, notice_tx.clone());
        tokio::spawn(run(key.clone(), controller, command_rx, event_rx));

        Self {
            key,
            commands: command_tx,
            notices: notice_tx,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// The session task has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_disconnected()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn submit(
        &self,
        query: impl Into<String>,
        requester: RequesterId,
        location: Option<TargetHint>,
    ) -> bool {
        self.send(SessionCommand::Submit {
            query: query.into(),
            requester,
            location,
        })
    }

    pub fn submit_batch(
        &self,
        source: impl Into<String>,
        queries: Vec<String>,
        requester: RequesterId,
        location: Option<TargetHint>,
    ) -> bool {
        self.send(SessionCommand::SubmitBatch {
            source: source.into(),
            queries,
            requester,
            location,
        })
    }

    pub fn skip(&self) -> bool {
        self.send(SessionCommand::Skip)
    }

    pub fn stop(&self) -> bool {
        self.send(SessionCommand::Stop)
    }

    pub fn toggle_loop(&self) -> bool {
        self.send(SessionCommand::ToggleLoop)
    }

    pub fn shuffle(&self) -> bool {
        self.send(SessionCommand::Shuffle)
    }

    pub fn connection_lost(&self) -> bool {
        self.send(SessionCommand::ConnectionLost)
    }

    pub fn teardown(&self) -> bool {
        self.send(SessionCommand::Teardown)
    }

    pub async fn list_pending(&self, limit: usize) -> Option<Vec<TrackRequest>> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionCommand::ListPending { limit, reply }) {
            return None;
        }
        rx.await.ok()
    }

    pub async fn status(&self) -> Option<SessionStatus> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionCommand::Status { reply }) {
            return None;
        }
        rx.await.ok()
    }
}

async fn run(
    key: SessionKey,
    mut controller: PlaybackController,
    commands: Receiver<SessionCommand>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) {
    info!("[{}] Session started", key);

    loop {
        tokio::select! {
            biased;
            command = commands.recv_async() => {
                match command {
                    Ok(SessionCommand::Teardown) | Err(_) => {
                        controller.teardown().await;
                        break;
                    }
                    Ok(command) => apply(&mut controller, command),
                }
            }
            Some(event) = events.recv() => controller.handle_event(event).await,
        }
    }

    debug!("[{}] Session task finished", key);
}

fn apply(controller: &mut PlaybackController, command: SessionCommand) {
    match command {
        SessionCommand::Submit {
            query,
            requester,
            location,
        } => controller.submit(query, requester, location),
        SessionCommand::SubmitBatch {
            source,
            queries,
            requester,
            location,
        } => controller.submit_batch(source, queries, requester, location),
        SessionCommand::Skip => controller.skip(),
        SessionCommand::Stop => controller.stop(),
        SessionCommand::ToggleLoop => controller.toggle_loop(),
        SessionCommand::Shuffle => controller.shuffle(),
        SessionCommand::ConnectionLost => controller.connection_lost(),
        SessionCommand::ListPending { limit, reply } => {
            let _ = reply.send(controller.list_pending(limit));
        }
        SessionCommand::Status { reply } => {
            let _ = reply.send(controller.status());
        }
        SessionCommand::Teardown => {}
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::{Notify, broadcast::error::RecvError};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        common::errors::{ConnectionError, PlaybackError, ResolutionError},
        configs::OutputConfig,
        output::{
            ConnectionHandle, ConnectionManager, OutputTransport, PlaybackReporter,
            SinkConnectionManager,
        },
        protocol::{
            events::FailureReason,
            tracks::{ContentId, Locator, ResolveMode, ResolvedSource, SearchResult},
        },
        sources::{MetadataLookup, Resolver},
    };

    /// Resolves every query to itself. `slow*` never completes, `live-*` is
    /// live, and a few names fail in fixed ways.
    #[derive(Default)]
    struct ScriptedResolver {
        calls: Mutex<Vec<(String, ResolveMode)>>,
        /// Resolutions and discards in the order they ran.
        journal: Mutex<Vec<String>>,
        started: Notify,
    }

    #[async_trait]
    impl Resolver for ScriptedResolver {
        async fn resolve(
            &self,
            query: &str,
            mode: ResolveMode,
        ) -> Result<ResolvedSource, ResolutionError> {
            self.calls.lock().push((query.to_string(), mode));
            self.journal.lock().push(format!("resolve {} {}", query, mode));
            self.started.notify_one();

            match query {
                q if q.starts_with("slow") => futures::future::pending().await,
                "missing" => Err(ResolutionError::NotFound("no results".into())),
                "locked" => Err(ResolutionError::AuthRequired("sign in".into())),
                "boom" => panic!("resolver exploded"),
                _ => Ok(ResolvedSource {
                    title: query.to_string(),
                    locator: match mode {
                        ResolveMode::Stream => Locator::Remote(format!("https://cdn/{}", query)),
                        ResolveMode::Download => Locator::Local(PathBuf::from(query)),
                    },
                    duration_secs: Some(1),
                    is_live: query.starts_with("live-"),
                    mode,
                    content_id: ContentId::new("test", query),
                }),
            }
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, ResolutionError> {
            Ok(Vec::new())
        }

        async fn discard(&self, source: &ResolvedSource) {
            // Slow enough that an unordered eviction would land after the next resolve.
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.journal.lock().push(format!("discard {}", source.title));
        }
    }

    /// Plays for `delay`; titles listed in `failures` fail that many times
    /// first, and `hang*` titles play until cancelled.
    struct ScriptedTransport {
        plays: Mutex<Vec<(String, ResolveMode)>>,
        failures: Mutex<HashMap<String, u32>>,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                plays: Mutex::new(Vec::new()),
                failures: Mutex::new(
                    failures
                        .iter()
                        .map(|(t, n)| (t.to_string(), *n))
                        .collect(),
                ),
                delay: Duration::from_millis(5),
            }
        }
    }

    #[async_trait]
    impl OutputTransport for ScriptedTransport {
        async fn play(
            &self,
            _connection: &ConnectionHandle,
            source: &ResolvedSource,
            reporter: PlaybackReporter,
            cancel: CancellationToken,
        ) {
            self.plays.lock().push((source.title.clone(), source.mode));
            let hang = source.title.starts_with("hang");
            let delay = self.delay;
            let wait = async move {
                if hang {
                    futures::future::pending::<()>().await;
                } else {
                    tokio::time::sleep(delay).await;
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    reporter.failed(PlaybackError::TransportFailure("cancelled".into()));
                    return;
                }
                _ = wait => {}
            }

            let fail = match self.failures.lock().get_mut(&source.title) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            };
            if fail {
                reporter.failed(PlaybackError::TransportFailure("stream dropped".into()));
            } else {
                reporter.finished();
            }
        }
    }

    struct AlwaysConnected;

    #[async_trait]
    impl ConnectionManager for AlwaysConnected {
        async fn ensure_connected(
            &self,
            _hint: Option<&TargetHint>,
        ) -> Result<ConnectionHandle, ConnectionError> {
            Ok(ConnectionHandle {
                id: 1,
                target: "test".into(),
            })
        }

        async fn disconnect(&self, _handle: &ConnectionHandle) {}
    }

    /// Connection attempts that never complete.
    struct NeverConnects;

    #[async_trait]
    impl ConnectionManager for NeverConnects {
        async fn ensure_connected(
            &self,
            _hint: Option<&TargetHint>,
        ) -> Result<ConnectionHandle, ConnectionError> {
            futures::future::pending().await
        }

        async fn disconnect(&self, _handle: &ConnectionHandle) {}
    }

    struct FakeCatalog;

    #[async_trait]
    impl MetadataLookup for FakeCatalog {
        fn handles(&self, query: &str) -> bool {
            query.starts_with("catalog:")
        }

        async fn expand(&self, url: &str) -> Vec<String> {
            if url == "catalog:empty" {
                return Vec::new();
            }
            vec!["x".to_string(), "y".to_string()]
        }
    }

    struct Harness {
        handle: SessionHandle,
        notices: broadcast::Receiver<SessionNotice>,
        resolver: Arc<ScriptedResolver>,
        transport: Arc<ScriptedTransport>,
    }

    fn harness_with(
        transport: ScriptedTransport,
        connections: Arc<dyn ConnectionManager>,
    ) -> Harness {
        harness_with_config(transport, connections, PlaybackConfig::default())
    }

    fn harness_with_config(
        transport: ScriptedTransport,
        connections: Arc<dyn ConnectionManager>,
        config: PlaybackConfig,
    ) -> Harness {
        let resolver = Arc::new(ScriptedResolver::default());
        let transport = Arc::new(transport);
        let services = Collaborators {
            resolver: resolver.clone(),
            transport: transport.clone(),
            connections,
            metadata: Some(Arc::new(FakeCatalog)),
        };
        let handle = SessionHandle::spawn(SessionKey::from("test"), services, &config);
        let notices = handle.subscribe();
        Harness {
            handle,
            notices,
            resolver,
            transport,
        }
    }

    fn harness(failures: &[(&str, u32)]) -> Harness {
        harness_with(ScriptedTransport::new(failures), Arc::new(AlwaysConnected))
    }

    async fn next_notice(rx: &mut broadcast::Receiver<SessionNotice>) -> SessionNotice {
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("notice in time")
            {
                Ok(notice) => return notice,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("notice channel closed"),
            }
        }
    }

    async fn collect_until(
        rx: &mut broadcast::Receiver<SessionNotice>,
        done: impl Fn(&SessionNotice) -> bool,
    ) -> Vec<SessionNotice> {
        let mut seen = Vec::new();
        loop {
            let notice = next_notice(rx).await;
            let finished = done(&notice);
            seen.push(notice);
            if finished {
                return seen;
            }
        }
    }

    fn now_playing(notices: &[SessionNotice]) -> Vec<(String, ResolveMode)> {
        notices
            .iter()
            .filter_map(|n| match n {
                SessionNotice::NowPlaying { title, mode, .. } => Some((title.clone(), *mode)),
                _ => None,
            })
            .collect()
    }

    fn is_finished(n: &SessionNotice) -> bool {
        matches!(n, SessionNotice::QueueFinished)
    }

    fn requester() -> RequesterId {
        RequesterId(7)
    }

    #[tokio::test]
    async fn test_plays_in_order_then_finishes() {
        let mut h = harness(&[]);
        for q in ["a", "b", "c"] {
            h.handle.submit(q, requester(), None);
        }

        let notices = collect_until(&mut h.notices, is_finished).await;
        let titles: Vec<String> = now_playing(&notices).into_iter().map(|(t, _)| t).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(
            notices.iter().filter(|n| is_finished(n)).count(),
            1,
            "{:?}",
            notices
        );
    }

    #[tokio::test]
    async fn test_live_failures_retry_in_stream_mode() {
        let mut h = harness(&[("live-x", 2)]);
        h.handle.submit("live-x", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        let plays = h.transport.plays.lock().clone();
        assert_eq!(plays.len(), 3);
        assert!(plays.iter().all(|(_, mode)| *mode == ResolveMode::Stream));
        assert!(
            h.resolver
                .calls
                .lock()
                .iter()
                .all(|(_, mode)| *mode == ResolveMode::Stream)
        );
        assert_eq!(
            now_playing(&notices).last(),
            Some(&("live-x".to_string(), ResolveMode::Stream))
        );
        assert!(
            !notices
                .iter()
                .any(|n| matches!(n, SessionNotice::TrackFailed { .. }))
        );
    }

    #[tokio::test]
    async fn test_live_retries_are_capped() {
        let mut h = harness(&[("live-dead", 100)]);
        h.handle.submit("live-dead", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        // One attempt plus three retries.
        assert_eq!(h.transport.plays.lock().len(), 4);
        assert!(notices.iter().any(|n| matches!(
            n,
            SessionNotice::TrackFailed {
                reason: FailureReason::LiveRetriesExhausted,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_stream_failure_escalates_to_download() {
        let mut h = harness(&[("vod-y", 1)]);
        h.handle.submit("vod-y", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert_eq!(
            *h.resolver.calls.lock(),
            vec![
                ("vod-y".to_string(), ResolveMode::Stream),
                ("vod-y".to_string(), ResolveMode::Download),
            ]
        );
        assert_eq!(
            now_playing(&notices).last(),
            Some(&("vod-y".to_string(), ResolveMode::Download))
        );
    }

    #[tokio::test]
    async fn test_download_failure_gives_up() {
        let mut h = harness(&[("bad", 2)]);
        h.handle.submit("bad", requester(), None);
        h.handle.submit("a", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert!(notices.iter().any(|n| matches!(
            n,
            SessionNotice::TrackFailed {
                reason: FailureReason::Playback,
                query,
                ..
            } if query == "bad"
        )));
        assert_eq!(now_playing(&notices).last().map(|(t, _)| t.as_str()), Some("a"));
    }

    #[tokio::test]
    async fn test_failed_download_is_evicted_before_next_resolution() {
        let mut h = harness(&[("bad", 2)]);
        h.handle.submit("bad", requester(), None);
        h.handle.submit("bad", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert_eq!(
            *h.resolver.journal.lock(),
            vec![
                "resolve bad stream",
                "resolve bad download",
                "discard bad",
                "resolve bad download",
            ]
        );
        assert_eq!(
            now_playing(&notices).last(),
            Some(&("bad".to_string(), ResolveMode::Download))
        );
    }

    #[tokio::test]
    async fn test_stop_during_resolution() {
        let mut h = harness(&[]);
        h.handle.submit("slow-track", requester(), None);
        h.handle.submit("a", requester(), None);

        tokio::time::timeout(Duration::from_secs(5), h.resolver.started.notified())
            .await
            .expect("resolution started");
        h.handle.stop();

        let notices =
            collect_until(&mut h.notices, |n| matches!(n, SessionNotice::Stopped)).await;
        assert!(now_playing(&notices).is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(notice) = h.notices.try_recv() {
            assert!(
                !matches!(
                    notice,
                    SessionNotice::NowPlaying { .. } | SessionNotice::QueueFinished
                ),
                "{:?}",
                notice
            );
        }
        assert_eq!(h.handle.list_pending(10).await, Some(Vec::new()));
        let status = h.handle.status().await.expect("status");
        assert!(status.current.is_none());
        assert_eq!(status.state, "idle");
    }

    #[tokio::test]
    async fn test_loop_replays_until_stopped() {
        let mut h = harness(&[]);
        h.handle.toggle_loop();
        h.handle.submit("song", requester(), None);

        let mut plays = 0;
        while plays < 5 {
            match next_notice(&mut h.notices).await {
                SessionNotice::NowPlaying { title, .. } => {
                    assert_eq!(title, "song");
                    plays += 1;
                }
                SessionNotice::QueueFinished => panic!("looping queue finished"),
                _ => {}
            }
        }

        h.handle.stop();
        collect_until(&mut h.notices, |n| matches!(n, SessionNotice::Stopped)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        while let Ok(notice) = h.notices.try_recv() {
            assert!(
                !matches!(notice, SessionNotice::NowPlaying { .. }),
                "{:?}",
                notice
            );
        }
    }

    #[tokio::test]
    async fn test_without_loop_plays_once() {
        let mut h = harness(&[]);
        h.handle.submit("song", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert_eq!(now_playing(&notices).len(), 1);
        assert_eq!(h.transport.plays.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_are_reported_and_skipped() {
        let mut h = harness(&[]);
        for q in ["missing", "locked", "a"] {
            h.handle.submit(q, requester(), None);
        }

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert!(notices.iter().any(|n| matches!(
            n,
            SessionNotice::TrackFailed {
                reason: FailureReason::NotFound,
                ..
            }
        )));
        assert!(
            notices
                .iter()
                .any(|n| matches!(n, SessionNotice::AuthRequired { query, .. } if query == "locked"))
        );
        assert_eq!(now_playing(&notices), vec![("a".to_string(), ResolveMode::Stream)]);
        // Neither failure was retried.
        assert_eq!(h.resolver.calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_panicking_resolution_is_isolated() {
        let mut h = harness(&[]);
        h.handle.submit("boom", requester(), None);
        h.handle.submit("a", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert!(notices.iter().any(|n| matches!(
            n,
            SessionNotice::TrackFailed {
                reason: FailureReason::Internal,
                ..
            }
        )));
        assert_eq!(now_playing(&notices).len(), 1);
        assert!(!h.handle.is_closed());
    }

    #[tokio::test]
    async fn test_unreachable_output_discards_queue() {
        let sinks = SinkConnectionManager::new(&OutputConfig::default());
        let mut h = harness_with(ScriptedTransport::new(&[]), Arc::new(sinks));
        h.handle.submit("a", requester(), None);
        h.handle.submit("b", requester(), None);

        let notices = collect_until(&mut h.notices, |n| {
            matches!(n, SessionNotice::Terminal { .. })
        })
        .await;
        match notices.last() {
            Some(SessionNotice::Terminal {
                reason, discarded, ..
            }) => {
                assert_eq!(*reason, FailureReason::Connection);
                assert_eq!(discarded, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.handle.list_pending(10).await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_reconnect_uses_requester_location() {
        let sinks = SinkConnectionManager::new(&OutputConfig {
            targets: vec!["lounge".into()],
            ..Default::default()
        });
        let mut h = harness_with(ScriptedTransport::new(&[]), Arc::new(sinks));
        h.handle
            .submit("a", requester(), Some(TargetHint::from("lounge")));
        collect_until(&mut h.notices, is_finished).await;

        h.handle.connection_lost();
        // Same requester, no new location: the remembered one is used.
        h.handle.submit("b", requester(), None);
        let notices = collect_until(&mut h.notices, is_finished).await;
        assert_eq!(now_playing(&notices).len(), 1);
    }

    #[tokio::test]
    async fn test_lost_connections_are_released() {
        let sinks = Arc::new(SinkConnectionManager::new(&OutputConfig {
            targets: vec!["lounge".into()],
            ..Default::default()
        }));
        let mut h = harness_with(ScriptedTransport::new(&[]), sinks.clone());

        for q in ["a", "b", "c"] {
            h.handle
                .submit(q, requester(), Some(TargetHint::from("lounge")));
            collect_until(&mut h.notices, is_finished).await;
            assert_eq!(sinks.active_count(), 1);
            h.handle.connection_lost();
        }

        for _ in 0..50 {
            if sinks.active_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(sinks.active_count(), 0);

        h.handle.submit("d", requester(), None);
        collect_until(&mut h.notices, is_finished).await;
        assert_eq!(sinks.active_count(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_timeout_discards_queue() {
        let config = PlaybackConfig {
            connect_timeout_secs: 1,
            ..Default::default()
        };
        let mut h =
            harness_with_config(ScriptedTransport::new(&[]), Arc::new(NeverConnects), config);
        h.handle
            .submit("a", requester(), Some(TargetHint::from("lounge")));
        h.handle.submit("b", requester(), None);

        let notices = collect_until(&mut h.notices, |n| {
            matches!(n, SessionNotice::Terminal { .. })
        })
        .await;
        match notices.last() {
            Some(SessionNotice::Terminal {
                reason,
                detail,
                discarded,
            }) => {
                assert_eq!(*reason, FailureReason::Connection);
                assert_eq!(detail, &ConnectionError::Timeout.to_string());
                assert_eq!(discarded, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.handle.list_pending(10).await, Some(Vec::new()));
        assert!(h.resolver.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_skip_moves_to_next_without_failure() {
        let mut h = harness(&[]);
        h.handle.submit("hang-1", requester(), None);
        h.handle.submit("a", requester(), None);

        collect_until(&mut h.notices, |n| {
            matches!(n, SessionNotice::NowPlaying { title, .. } if title == "hang-1")
        })
        .await;
        h.handle.skip();

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert!(matches!(
            notices.first(),
            Some(SessionNotice::Skipped { query: Some(q) }) if q == "hang-1"
        ));
        assert_eq!(now_playing(&notices), vec![("a".to_string(), ResolveMode::Stream)]);
        assert!(
            !notices
                .iter()
                .any(|n| matches!(n, SessionNotice::TrackFailed { .. }))
        );
    }

    #[tokio::test]
    async fn test_catalog_links_expand_to_batch() {
        let mut h = harness(&[]);
        h.handle.submit("catalog:album", requester(), None);

        let notices = collect_until(&mut h.notices, is_finished).await;
        assert!(matches!(
            notices.first(),
            Some(SessionNotice::BatchQueued { count: 2, .. })
        ));
        let titles: Vec<String> = now_playing(&notices).into_iter().map(|(t, _)| t).collect();
        assert_eq!(titles, vec!["x", "y"]);

        h.handle.submit("catalog:empty", requester(), None);
        assert!(matches!(
            next_notice(&mut h.notices).await,
            SessionNotice::NothingFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_shuffle_and_listing() {
        let mut h = harness(&[]);
        h.handle.shuffle();
        assert_eq!(
            next_notice(&mut h.notices).await,
            SessionNotice::ShuffleRejected { count: 0 }
        );

        h.handle.submit("hang-now", requester(), None);
        for q in ["a", "b", "c"] {
            h.handle.submit(q, requester(), None);
        }
        let pending = h.handle.list_pending(2).await.expect("pending");
        assert_eq!(
            pending.into_iter().map(|r| r.query).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        h.handle.shuffle();
        collect_until(&mut h.notices, |n| {
            matches!(n, SessionNotice::Shuffled { count: 3 })
        })
        .await;
    }

    #[tokio::test]
    async fn test_teardown_closes_session() {
        let mut h = harness(&[]);
        h.handle.submit("hang-1", requester(), None);
        h.handle.teardown();

        collect_until(&mut h.notices, |n| matches!(n, SessionNotice::Closed)).await;
        for _ in 0..50 {
            if h.handle.is_closed() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session task still running");
    }
}
