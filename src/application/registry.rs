//! Monitor registry
//!
//! Tracks at most one live monitor per source id. Instance-based on purpose:
//! hosts construct and own the registry, so tests and embedders get isolated
//! registries instead of sharing process state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::application::monitor::{CrawlMonitor, MonitorHandle, RefreshSignal, SessionExpired};
use crate::domain::session::SessionSnapshot;
use crate::infrastructure::transport::StreamConnector;

#[derive(Clone, Default)]
pub struct MonitorRegistry {
    monitors: Arc<RwLock<HashMap<String, MonitorHandle>>>,
    session_expiry_tx: Option<mpsc::UnboundedSender<SessionExpired>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self {
            monitors: Arc::new(RwLock::new(HashMap::new())),
            session_expiry_tx: None,
        }
    }

    /// Route session-expiry notices from every monitor this registry starts
    pub fn with_session_expiry(mut self, sender: mpsc::UnboundedSender<SessionExpired>) -> Self {
        self.session_expiry_tx = Some(sender);
        self
    }

    /// Start a monitor for `source_id`, replacing any live one.
    ///
    /// A replaced monitor is cancelled before the new one spawns, so a source
    /// never has two active transports. Returns the new session id.
    pub async fn begin<C>(&self, source_id: &str, connector: C) -> String
    where
        C: StreamConnector + 'static,
    {
        let mut monitors = self.monitors.write().await;
        if let Some(previous) = monitors.remove(source_id) {
            info!(
                source_id,
                previous_session = previous.session_id(),
                "🔄 replacing live monitor for source"
            );
            previous.cancel();
        }

        let mut monitor = CrawlMonitor::new(source_id, connector);
        if let Some(tx) = &self.session_expiry_tx {
            monitor = monitor.with_session_expiry(tx.clone());
        }
        let handle = monitor.spawn();
        let session_id = handle.session_id().to_owned();
        monitors.insert(source_id.to_owned(), handle);
        session_id
    }

    /// Watch receiver for a source's snapshots
    pub async fn watch_source(&self, source_id: &str) -> Option<watch::Receiver<SessionSnapshot>> {
        self.monitors
            .read()
            .await
            .get(source_id)
            .map(MonitorHandle::subscribe)
    }

    /// Latest snapshot for a source
    pub async fn latest(&self, source_id: &str) -> Option<SessionSnapshot> {
        self.monitors
            .read()
            .await
            .get(source_id)
            .map(MonitorHandle::latest)
    }

    /// Take a source's one-shot refresh receiver; `None` if unknown or taken
    pub async fn take_refresh(
        &self,
        source_id: &str,
    ) -> Option<oneshot::Receiver<RefreshSignal>> {
        self.monitors
            .write()
            .await
            .get_mut(source_id)
            .and_then(MonitorHandle::take_refresh)
    }

    /// Cancel a source's monitor. Returns whether one was registered.
    pub async fn cancel(&self, source_id: &str) -> bool {
        match self.monitors.read().await.get(source_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => {
                debug!(source_id, "cancel requested for unknown source");
                false
            }
        }
    }

    /// Drop a source's handle, cancelling its monitor first
    pub async fn remove(&self, source_id: &str) -> Option<MonitorHandle> {
        let removed = self.monitors.write().await.remove(source_id);
        if let Some(handle) = &removed {
            handle.cancel();
        }
        removed
    }

    /// Cancel every registered monitor; handles stay queryable
    pub async fn cancel_all(&self) {
        let monitors = self.monitors.read().await;
        info!(count = monitors.len(), "🛑 cancelling all monitors");
        for handle in monitors.values() {
            handle.cancel();
        }
    }

    /// Source ids whose pump task is still running
    pub async fn active_sources(&self) -> Vec<String> {
        self.monitors
            .read()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect()
    }
}
