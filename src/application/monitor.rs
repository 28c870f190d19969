//! Crawl progress monitor
//!
//! One monitor owns one transport and one session: it pulls byte chunks,
//! runs them through the decoder and parser, applies the classified events
//! to the session state machine, and publishes a snapshot after every
//! change. Hosts observe through a watch channel and a one-shot refresh
//! notice; cancellation is cooperative.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::session::{CrawlSession, SessionChange, SessionSnapshot};
use crate::infrastructure::streaming::{EventParser, LineDecoder};
use crate::infrastructure::transport::{ProgressByteStream, StreamConnector, TransportError};

/// Completion notice delivered exactly once per session.
///
/// Receiving it instructs the host to reload the monitored source's
/// persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSignal {
    pub source_id: String,
    /// True when the session ended in failure rather than producer completion
    pub failed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Notice that the backend rejected the authenticated stream request.
///
/// Delivered on an injected channel so hosts decide how to react; there is
/// no process-global signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpired {
    pub source_id: String,
    pub observed_at: DateTime<Utc>,
}

/// Builder for one progress-monitoring session.
///
/// A monitor is single-use: observing the same source again requires a new
/// monitor with a fresh session.
pub struct CrawlMonitor<C> {
    source_id: String,
    connector: C,
    session_expiry_tx: Option<mpsc::UnboundedSender<SessionExpired>>,
}

impl<C> CrawlMonitor<C>
where
    C: StreamConnector + 'static,
{
    pub fn new(source_id: impl Into<String>, connector: C) -> Self {
        Self {
            source_id: source_id.into(),
            connector,
            session_expiry_tx: None,
        }
    }

    /// Inject the channel that receives session-expiry notices
    pub fn with_session_expiry(mut self, sender: mpsc::UnboundedSender<SessionExpired>) -> Self {
        self.session_expiry_tx = Some(sender);
        self
    }

    /// Spawn the pump task and hand back the host-facing handle
    pub fn spawn(self) -> MonitorHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let session = CrawlSession::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let (refresh_tx, refresh_rx) = oneshot::channel();
        let cancellation = CancellationToken::new();

        let pump = SessionPump {
            source_id: self.source_id.clone(),
            session_id: session_id.clone(),
            connector: self.connector,
            session,
            decoder: LineDecoder::new(),
            parser: EventParser::new(),
            snapshot_tx,
            refresh_tx: Some(refresh_tx),
            session_expiry_tx: self.session_expiry_tx,
            cancellation: cancellation.clone(),
        };

        info!(source_id = %self.source_id, session_id = %session_id, "🎬 starting progress monitor");
        let join = tokio::spawn(pump.run());

        MonitorHandle {
            source_id: self.source_id,
            session_id,
            snapshot_rx,
            refresh_rx: Some(refresh_rx),
            cancellation,
            join,
        }
    }
}

/// Host-facing handle to a running monitor
pub struct MonitorHandle {
    source_id: String,
    session_id: String,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    refresh_rx: Option<oneshot::Receiver<RefreshSignal>>,
    cancellation: CancellationToken,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subscribe to snapshot updates.
    ///
    /// The receiver immediately holds the latest snapshot and is marked
    /// changed on every published update.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Snapshot updates as a `Stream`, starting with the current state
    pub fn snapshot_stream(&self) -> WatchStream<SessionSnapshot> {
        WatchStream::new(self.snapshot_rx.clone())
    }

    /// Latest published snapshot
    pub fn latest(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Take the one-shot refresh receiver.
    ///
    /// Returns `None` once taken. The receiver resolves with an error if the
    /// session is cancelled before reaching completion.
    pub fn take_refresh(&mut self) -> Option<oneshot::Receiver<RefreshSignal>> {
        self.refresh_rx.take()
    }

    /// Request cooperative cancellation of the pump
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the pump task to exit
    pub async fn wait(self) {
        if let Err(error) = self.join.await {
            warn!(source_id = %self.source_id, %error, "monitor task ended abnormally");
        }
    }
}

/// The pump: sequential per session, one suspension point (the chunk read)
struct SessionPump<C: StreamConnector> {
    source_id: String,
    session_id: String,
    connector: C,
    session: CrawlSession,
    decoder: LineDecoder,
    parser: EventParser,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    refresh_tx: Option<oneshot::Sender<RefreshSignal>>,
    session_expiry_tx: Option<mpsc::UnboundedSender<SessionExpired>>,
    cancellation: CancellationToken,
}

impl<C> SessionPump<C>
where
    C: StreamConnector + 'static,
{
    async fn run(mut self) {
        let mut stream = tokio::select! {
            opened = self.connector.open(&self.source_id) => match opened {
                Ok(stream) => stream,
                Err(error) => {
                    self.handle_transport_error(&error);
                    return;
                }
            },
            _ = self.cancellation.cancelled() => {
                debug!(source_id = %self.source_id, session_id = %self.session_id, "🛑 monitor cancelled while connecting");
                return;
            }
        };

        loop {
            let read = tokio::select! {
                read = stream.next_chunk() => read,
                _ = self.cancellation.cancelled() => {
                    info!(source_id = %self.source_id, session_id = %self.session_id, "🛑 monitor cancelled");
                    return;
                }
            };

            // A cancel that raced the read wins: the resolved chunk is not
            // applied and nothing further is published
            if self.cancellation.is_cancelled() {
                info!(source_id = %self.source_id, session_id = %self.session_id, "🛑 monitor cancelled");
                return;
            }

            match read {
                Ok(Some(chunk)) => {
                    self.ingest_chunk(&chunk);
                    if self.session.is_terminal() {
                        self.close_stream();
                        return;
                    }
                }
                Ok(None) => {
                    self.close_stream();
                    return;
                }
                Err(error) => {
                    self.handle_transport_error(&error);
                    return;
                }
            }
        }
    }

    /// Decode, classify and apply one chunk to completion
    fn ingest_chunk(&mut self, chunk: &[u8]) {
        for line in self.decoder.feed(chunk) {
            let Some(event) = self.parser.parse(&line) else {
                continue;
            };
            debug!(
                source_id = %self.source_id,
                event = event.event_name(),
                "feed event"
            );
            let change = self.session.apply(event);
            self.publish(change);
        }
    }

    /// End of stream: diagnose any dangling fragment; a close without a
    /// prior completion marker is a failure
    fn close_stream(&mut self) {
        if let Some(fragment) = self.decoder.finish() {
            debug!(
                source_id = %self.source_id,
                fragment,
                "discarding unterminated trailing fragment"
            );
        }

        if self.session.is_terminal() {
            debug!(source_id = %self.source_id, session_id = %self.session_id, "✅ progress stream closed after completion");
            return;
        }

        warn!(source_id = %self.source_id, session_id = %self.session_id, "stream ended before completion marker");
        let change = self.session.fail("stream ended before completion");
        self.publish(change);
    }

    fn handle_transport_error(&mut self, error: &TransportError) {
        warn!(
            source_id = %self.source_id,
            session_id = %self.session_id,
            %error,
            "💥 transport failure on progress stream"
        );

        if error.is_session_expiry() {
            self.notify_session_expired();
        }

        let change = self.session.fail(&error.to_string());
        self.publish(change);
    }

    fn notify_session_expired(&self) {
        if let Some(tx) = &self.session_expiry_tx {
            let notice = SessionExpired {
                source_id: self.source_id.clone(),
                observed_at: Utc::now(),
            };
            if tx.send(notice).is_err() {
                debug!(source_id = %self.source_id, "session expiry receiver dropped");
            }
        }
    }

    fn publish(&mut self, change: SessionChange) {
        if change.changed {
            // Receivers may all be gone; the pump keeps running regardless
            let _ = self.snapshot_tx.send(self.session.snapshot());
        }
        if change.completed {
            self.fire_refresh();
        }
    }

    /// Fires at most once; the terminal freeze guarantees `completed` is
    /// reported by exactly one transition
    fn fire_refresh(&mut self) {
        if let Some(tx) = self.refresh_tx.take() {
            let signal = RefreshSignal {
                source_id: self.source_id.clone(),
                failed: self.session.failed(),
                completed_at: Utc::now(),
            };
            if tx.send(signal).is_err() {
                debug!(source_id = %self.source_id, "refresh receiver dropped before completion");
            }
        }
    }
}
