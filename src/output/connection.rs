use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use super::{ConnectionHandle, ConnectionManager};
use crate::{
    common::{errors::ConnectionError, types::TargetHint},
    configs::OutputConfig,
};

/// Hands out connections to the configured sink targets.
///
/// With no targets configured, any non-empty hint is accepted as-is.
pub struct SinkConnectionManager {
    targets: Vec<String>,
    next_id: AtomicU64,
    active: DashMap<u64, String>,
}

impl SinkConnectionManager {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            targets: config.targets.clone(),
            next_id: AtomicU64::new(1),
            active: DashMap::new(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[async_trait]
impl ConnectionManager for SinkConnectionManager {
    async fn ensure_connected(
        &self,
        hint: Option<&TargetHint>,
    ) -> Result<ConnectionHandle, ConnectionError> {
        let target = hint
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .ok_or(ConnectionError::NoTargetHint)?;

        if !self.targets.is_empty() && !self.targets.iter().any(|t| t == target) {
            return Err(ConnectionError::Unreachable(target.to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.active.insert(id, target.to_string());
        info!("Connected to output target '{}' (#{})", target, id);

        Ok(ConnectionHandle {
            id,
            target: target.to_string(),
        })
    }

    async fn disconnect(&self, handle: &ConnectionHandle) {
        if self.active.remove(&handle.id).is_some() {
            debug!("Released output target '{}' (#{})", handle.target, handle.id);
        }
    }
}
