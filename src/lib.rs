//! Newsdeck Monitor - Streaming crawl-progress consumer
//!
//! Consumes the Newsdeck backend's crawl progress feed and maintains a live
//! per-source session: byte chunks in, bounded log history plus run summary
//! out. Hosts embed the library, subscribe to snapshots, and receive a
//! one-shot refresh notice when a session reaches its terminal state.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the host-facing surface for easier access
pub use application::{CrawlMonitor, MonitorHandle, MonitorRegistry, RefreshSignal, SessionExpired};
pub use domain::{
    CrawlSession, CrawlSummary, FeedEvent, LogEntry, LogSeverity, SessionChange, SessionPhase,
    SessionSnapshot, SummaryOutcome, MAX_LOG_HISTORY,
};
pub use infrastructure::{
    AppConfig, ConfigManager, CrawlStreamClient, EventParser, LineDecoder, ProgressByteStream,
    ReaderByteStream, StreamConnector, TransportError, TransportResult,
};
