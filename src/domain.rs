//! Domain module - Core progress-session logic
//!
//! This module contains the feed event vocabulary and the session state
//! machine. Everything here is pure: no transport, no channels, no clocks
//! beyond timestamping entries as they are created.

pub mod events;
pub mod session;

// Re-export commonly used items for convenience
// Note: Be specific about re-exports to avoid ambiguous glob warnings
pub use events::{CrawlSummary, FeedEvent, LogEntry, LogSeverity, SummaryOutcome};
pub use session::{
    CrawlSession, SessionChange, SessionPhase, SessionSnapshot, MAX_LOG_HISTORY,
};
