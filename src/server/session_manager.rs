use dashmap::DashMap;
use tracing::info;

use crate::{
    common::types::SessionKey,
    configs::PlaybackConfig,
    player::controller::Collaborators,
    server::session::SessionHandle,
};

/// Registry of live sessions, one per output target.
pub struct SessionManager {
    sessions: DashMap<SessionKey, SessionHandle>,
    services: Collaborators,
    config: PlaybackConfig,
}

impl SessionManager {
    pub fn new(services: Collaborators, config: PlaybackConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            services,
            config,
        }
    }

    pub fn get(&self, key: &SessionKey) -> Option<SessionHandle> {
        self.sessions
            .get(key)
            .map(|s| s.value().clone())
            .filter(|s| !s.is_closed())
    }

    /// Returns the session for `key`, starting one on first use or when the
    /// previous one has exited.
    pub fn get_or_create(&self, key: &SessionKey) -> SessionHandle {
        let mut entry = self.sessions.entry(key.clone()).or_insert_with(|| {
            info!("Creating session {}", key);
            SessionHandle::spawn(key.clone(), self.services.clone(), &self.config)
        });
        if entry.is_closed() {
            info!("Restarting session {}", key);
            *entry = SessionHandle::spawn(key.clone(), self.services.clone(), &self.config);
        }
        entry.value().clone()
    }

    /// Tears the session down and forgets it.
    pub fn remove(&self, key: &SessionKey) -> bool {
        match self.sessions.remove(key) {
            Some((_, handle)) => {
                handle.teardown();
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> Vec<SessionKey> {
        self.sessions.iter().map(|s| s.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn shutdown(&self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        common::errors::ResolutionError,
        configs::OutputConfig,
        output::{ConnectionHandle, OutputTransport, PlaybackReporter, SinkConnectionManager},
        protocol::tracks::{ResolveMode, ResolvedSource, SearchResult},
        sources::Resolver,
    };

    struct NoResolver;

    #[async_trait]
    impl Resolver for NoResolver {
        async fn resolve(
            &self,
            query: &str,
            _mode: ResolveMode,
        ) -> Result<ResolvedSource, ResolutionError> {
            Err(ResolutionError::NotFound(query.to_string()))
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, ResolutionError> {
            Ok(Vec::new())
        }
    }

    struct Silent;

    #[async_trait]
    impl OutputTransport for Silent {
        async fn play(
            &self,
            _connection: &ConnectionHandle,
            _source: &ResolvedSource,
            reporter: PlaybackReporter,
            _cancel: CancellationToken,
        ) {
            reporter.finished();
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(
            Collaborators {
                resolver: Arc::new(NoResolver),
                transport: Arc::new(Silent),
                connections: Arc::new(SinkConnectionManager::new(&OutputConfig::default())),
                metadata: None,
            },
            PlaybackConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_sessions_are_independent_and_reused() {
        let manager = manager();
        let a = manager.get_or_create(&SessionKey::from("a"));
        let again = manager.get_or_create(&SessionKey::from("a"));
        let b = manager.get_or_create(&SessionKey::from("b"));

        assert_eq!(manager.len(), 2);
        assert_eq!(a.key(), again.key());
        assert_ne!(a.key(), b.key());
        assert!(manager.get(&SessionKey::from("c")).is_none());
    }

    #[tokio::test]
    async fn test_remove_tears_down() {
        let manager = manager();
        let key = SessionKey::from("gone");
        let handle = manager.get_or_create(&key);

        assert!(manager.remove(&key));
        assert!(!manager.remove(&key));
        assert!(manager.get(&key).is_none());

        for _ in 0..50 {
            if handle.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_closed());

        // A new request for the same key starts over.
        let fresh = manager.get_or_create(&key);
        assert!(!fresh.is_closed());
    }
}
