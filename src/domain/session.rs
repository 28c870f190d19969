//! Crawl session state machine
//!
//! Pure state: no I/O, no channels. The monitor feeds classified events in
//! and publishes the snapshots this module produces. Keeping the machine
//! synchronous makes the progression rules directly testable.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::domain::events::{CrawlSummary, FeedEvent, LogEntry, LogSeverity};

/// Upper bound on retained log entries per session.
///
/// Matches the dashboard's visible backlog; older entries are evicted
/// first-in first-out once the bound is reached.
pub const MAX_LOG_HISTORY: usize = 200;

/// Lifecycle phase of a progress session.
///
/// Strictly monotonic: `Connecting` -> `Streaming` -> `Completed`.
/// `Completed` is terminal regardless of how it was reached (producer
/// completion marker, transport failure, or end of stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SessionPhase {
    /// Transport not yet delivering
    Connecting,
    /// At least one event observed
    Streaming,
    /// Terminal; all state frozen
    Completed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Streaming => write!(f, "streaming"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Immutable view of a session for hosts and the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Most recent log entries, oldest first, at most [`MAX_LOG_HISTORY`]
    pub history: Vec<LogEntry>,
    /// Latest run summary, if any was observed
    pub summary: Option<CrawlSummary>,
    /// True when the session ended by failure rather than producer completion
    pub failed: bool,
}

/// What a transition did, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChange {
    /// State differs from before; a new snapshot should be published
    pub changed: bool,
    /// This transition reached the terminal phase
    pub completed: bool,
}

impl SessionChange {
    /// Transition that did nothing (event against a terminal session).
    pub const NONE: Self = Self {
        changed: false,
        completed: false,
    };

    const CHANGED: Self = Self {
        changed: true,
        completed: false,
    };

    const COMPLETED: Self = Self {
        changed: true,
        completed: true,
    };
}

/// Accumulated state of one crawl progress session
#[derive(Debug)]
pub struct CrawlSession {
    phase: SessionPhase,
    history: VecDeque<LogEntry>,
    summary: Option<CrawlSummary>,
    failed: bool,
}

impl CrawlSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connecting,
            history: VecDeque::with_capacity(MAX_LOG_HISTORY),
            summary: None,
            failed: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Applies one classified event.
    ///
    /// Events against a terminal session are ignored and reported as
    /// [`SessionChange::NONE`]. The first event of a session leaves
    /// `Connecting` before it is processed.
    pub fn apply(&mut self, event: FeedEvent) -> SessionChange {
        if self.is_terminal() {
            tracing::debug!(event = event.event_name(), "event ignored: session already terminal");
            return SessionChange::NONE;
        }

        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Streaming;
        }

        match event {
            FeedEvent::Message(entry) => {
                self.push_entry(entry);
                SessionChange::CHANGED
            }
            FeedEvent::Summary(summary) => {
                self.summary = Some(summary);
                SessionChange::CHANGED
            }
            FeedEvent::Completed { final_summary } => {
                if let Some(summary) = final_summary {
                    self.summary = Some(summary);
                }
                self.phase = SessionPhase::Completed;
                SessionChange::COMPLETED
            }
        }
    }

    /// Forces the session into failed-terminal state.
    ///
    /// Appends a synthetic `CRITICAL ERROR` entry, installs an error summary
    /// when none exists yet, and marks the session failed. No-op when the
    /// session is already terminal.
    pub fn fail(&mut self, reason: &str) -> SessionChange {
        if self.is_terminal() {
            tracing::debug!(reason, "failure ignored: session already terminal");
            return SessionChange::NONE;
        }

        self.push_entry(LogEntry::now(
            format!("CRITICAL ERROR: {reason}"),
            LogSeverity::Error,
        ));
        if self.summary.is_none() {
            self.summary = Some(CrawlSummary::failed());
        }
        self.failed = true;
        self.phase = SessionPhase::Completed;
        SessionChange::COMPLETED
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            history: self.history.iter().cloned().collect(),
            summary: self.summary,
            failed: self.failed,
        }
    }

    fn push_entry(&mut self, entry: LogEntry) {
        if self.history.len() == MAX_LOG_HISTORY {
            let _ = self.history.pop_front();
        }
        self.history.push_back(entry);
    }
}

impl Default for CrawlSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{CrawlSession, SessionChange, SessionPhase, MAX_LOG_HISTORY};
    use crate::domain::events::{CrawlSummary, FeedEvent, LogEntry, LogSeverity, SummaryOutcome};

    fn message(text: &str) -> FeedEvent {
        FeedEvent::Message(LogEntry::now(text, LogSeverity::Info))
    }

    #[test]
    fn first_event_leaves_connecting() {
        let mut session = CrawlSession::new();
        assert_eq!(session.phase(), SessionPhase::Connecting);

        let change = session.apply(message("starting crawl"));
        assert_eq!(change, SessionChange { changed: true, completed: false });
        assert_eq!(session.phase(), SessionPhase::Streaming);
        assert_eq!(session.snapshot().history.len(), 1);
    }

    #[test]
    fn history_is_bounded_fifo() {
        let mut session = CrawlSession::new();
        for i in 0..250 {
            let _ = session.apply(message(&format!("message {i}")));
        }

        let snapshot = session.snapshot();
        assert_eq!(snapshot.history.len(), MAX_LOG_HISTORY);
        // The 50 oldest entries were evicted, order preserved
        assert_eq!(snapshot.history[0].message, "message 50");
        assert_eq!(snapshot.history[199].message, "message 249");
    }

    #[test]
    fn summary_last_write_wins() {
        let mut session = CrawlSession::new();
        let _ = session.apply(FeedEvent::Summary(CrawlSummary::new(3, SummaryOutcome::Error)));
        let _ = session.apply(FeedEvent::Summary(CrawlSummary::new(12, SummaryOutcome::Success)));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.summary, Some(CrawlSummary::new(12, SummaryOutcome::Success)));
        // Summaries do not end the session
        assert_eq!(snapshot.phase, SessionPhase::Streaming);
    }

    #[test]
    fn completion_marker_is_terminal() {
        let mut session = CrawlSession::new();
        let _ = session.apply(message("working"));
        let change = session.apply(FeedEvent::Completed { final_summary: None });

        assert!(change.completed);
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert!(!session.snapshot().failed);
    }

    #[test]
    fn completion_with_bundled_summary_ingests_it() {
        let mut session = CrawlSession::new();
        let change = session.apply(FeedEvent::Completed {
            final_summary: Some(CrawlSummary::new(7, SummaryOutcome::Success)),
        });

        assert!(change.completed);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.summary, Some(CrawlSummary::new(7, SummaryOutcome::Success)));
    }

    #[test]
    fn terminal_state_is_frozen() {
        let mut session = CrawlSession::new();
        let _ = session.apply(message("one"));
        let _ = session.apply(FeedEvent::Completed { final_summary: None });

        // Neither later events nor later failures may alter anything
        assert_eq!(session.apply(message("late")), SessionChange::NONE);
        assert_eq!(
            session.apply(FeedEvent::Summary(CrawlSummary::new(99, SummaryOutcome::Success))),
            SessionChange::NONE
        );
        assert_eq!(session.fail("connection reset"), SessionChange::NONE);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.summary, None);
        assert!(!snapshot.failed);
    }

    #[test]
    fn fail_appends_synthetic_entry_and_error_summary() {
        let mut session = CrawlSession::new();
        let _ = session.apply(message("step 1"));
        let _ = session.apply(message("step 2"));

        let change = session.fail("connection reset by peer");
        assert!(change.completed);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Completed);
        assert!(snapshot.failed);
        assert_eq!(snapshot.history.len(), 3);
        let last = &snapshot.history[2];
        assert_eq!(last.message, "CRITICAL ERROR: connection reset by peer");
        assert_eq!(last.severity, LogSeverity::Error);
        assert_eq!(snapshot.summary, Some(CrawlSummary::failed()));
    }

    #[test]
    fn fail_keeps_existing_summary() {
        let mut session = CrawlSession::new();
        let _ = session.apply(FeedEvent::Summary(CrawlSummary::new(4, SummaryOutcome::Success)));

        let _ = session.fail("stream cut short");
        let snapshot = session.snapshot();
        assert!(snapshot.failed);
        assert_eq!(snapshot.summary, Some(CrawlSummary::new(4, SummaryOutcome::Success)));
    }

    #[test]
    fn fail_from_connecting_is_terminal() {
        let mut session = CrawlSession::new();
        let change = session.fail("connection refused");

        assert!(change.completed);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Completed);
        assert_eq!(snapshot.history.len(), 1);
        assert!(snapshot.history[0].message.starts_with("CRITICAL ERROR: "));
    }
}
