//! Event types produced by the crawl progress feed
//!
//! This module defines the vocabulary the streaming pipeline speaks: the
//! classified events coming off the wire and the payload types that end up
//! in session snapshots consumed by the dashboard frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Display severity of a progress log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    /// Routine progress output
    Info,
    /// Something went wrong on the producer side
    Error,
    /// A step finished successfully
    Success,
    /// Non-fatal anomaly worth surfacing
    Warning,
}

impl LogSeverity {
    /// Maps a wire `status` string to a severity.
    ///
    /// Only the four known status strings are recognized; anything else
    /// (including an absent status) renders as `Info`.
    pub fn from_status(status: Option<&str>) -> Self {
        match status {
            Some("error") => Self::Error,
            Some("success") => Self::Success,
            Some("warning") => Self::Warning,
            _ => Self::Info,
        }
    }
}

impl Default for LogSeverity {
    fn default() -> Self {
        Self::Info
    }
}

/// One timestamped line of the progress log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LogEntry {
    /// Human-readable progress text
    pub message: String,
    /// When this consumer observed the entry
    pub captured_at: DateTime<Utc>,
    pub severity: LogSeverity,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    pub fn now(message: impl Into<String>, severity: LogSeverity) -> Self {
        Self {
            message: message.into(),
            captured_at: Utc::now(),
            severity,
        }
    }
}

/// Outcome reported by the producer's run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SummaryOutcome {
    Success,
    Error,
    /// Producer sent a summary without a recognizable status
    Unknown,
}

impl SummaryOutcome {
    pub fn from_status(status: Option<&str>) -> Self {
        match status {
            Some("success") => Self::Success,
            Some("error") => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Aggregate result of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CrawlSummary {
    /// Number of articles the crawler ingested
    pub articles: u64,
    pub outcome: SummaryOutcome,
}

impl CrawlSummary {
    pub fn new(articles: u64, outcome: SummaryOutcome) -> Self {
        Self { articles, outcome }
    }

    /// The summary a failed session reports when the producer never sent one.
    pub fn failed() -> Self {
        Self {
            articles: 0,
            outcome: SummaryOutcome::Error,
        }
    }
}

/// A classified event from the progress feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Progress log line to append to the session history
    Message(LogEntry),
    /// Run summary; replaces any previously seen summary
    Summary(CrawlSummary),
    /// Producer declared the run finished.
    ///
    /// Carries a summary when the terminating payload bundled one in.
    Completed { final_summary: Option<CrawlSummary> },
}

impl FeedEvent {
    /// Short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Summary(_) => "summary",
            Self::Completed { .. } => "completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CrawlSummary, FeedEvent, LogEntry, LogSeverity, SummaryOutcome};

    #[test]
    fn severity_maps_known_statuses_only() {
        assert_eq!(LogSeverity::from_status(Some("error")), LogSeverity::Error);
        assert_eq!(
            LogSeverity::from_status(Some("success")),
            LogSeverity::Success
        );
        assert_eq!(
            LogSeverity::from_status(Some("warning")),
            LogSeverity::Warning
        );
        assert_eq!(LogSeverity::from_status(Some("info")), LogSeverity::Info);
        // Unknown strings and case mismatches fall back to Info
        assert_eq!(LogSeverity::from_status(Some("ERROR")), LogSeverity::Info);
        assert_eq!(LogSeverity::from_status(Some("fatal")), LogSeverity::Info);
        assert_eq!(LogSeverity::from_status(None), LogSeverity::Info);
    }

    #[test]
    fn outcome_distinguishes_unknown_from_error() {
        assert_eq!(
            SummaryOutcome::from_status(Some("success")),
            SummaryOutcome::Success
        );
        assert_eq!(
            SummaryOutcome::from_status(Some("error")),
            SummaryOutcome::Error
        );
        assert_eq!(
            SummaryOutcome::from_status(Some("partial")),
            SummaryOutcome::Unknown
        );
        assert_eq!(SummaryOutcome::from_status(None), SummaryOutcome::Unknown);
    }

    #[test]
    fn failed_summary_is_zero_articles_error() {
        let summary = CrawlSummary::failed();
        assert_eq!(summary.articles, 0);
        assert_eq!(summary.outcome, SummaryOutcome::Error);
    }

    #[test]
    fn event_names_are_stable() {
        let entry = LogEntry::now("fetching", LogSeverity::Info);
        assert_eq!(FeedEvent::Message(entry).event_name(), "message");
        assert_eq!(
            FeedEvent::Summary(CrawlSummary::new(3, SummaryOutcome::Success)).event_name(),
            "summary"
        );
        assert_eq!(
            FeedEvent::Completed {
                final_summary: None
            }
            .event_name(),
            "completed"
        );
    }
}
