//! Feed line classification
//!
//! One decoded line either carries a progress payload behind the event
//! marker or it is noise (blank keep-alive lines, comments). Payloads are
//! decoded into a closed shape; anything the producer sends outside that
//! shape degrades to a default progress note instead of aborting the
//! session.

use serde::Deserialize;
use serde_json::error::Category;

use crate::domain::events::{CrawlSummary, FeedEvent, LogEntry, LogSeverity, SummaryOutcome};

/// Literal prefix marking a payload-carrying feed line.
pub const EVENT_MARKER: &str = "data: ";

/// Text substituted when a progress payload carries no message.
pub const DEFAULT_MESSAGE: &str = "Processing...";

/// Closed wire payload. Every field is optional; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    /// Any JSON value; evaluated with ECMAScript truthiness
    #[serde(default)]
    done: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    articles: Option<u64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Classifies decoded feed lines into [`FeedEvent`]s.
///
/// Total over its input: malformed lines are dropped with a diagnostic,
/// never turned into errors.
#[derive(Debug, Default)]
pub struct EventParser;

impl EventParser {
    pub fn new() -> Self {
        Self
    }

    /// Classifies one line. `None` means the line carries no event.
    ///
    /// Priority on a decoded payload: completion marker, then summary, then
    /// progress message. A payload carrying both the completion flag and
    /// summary fields completes the session with that summary attached.
    pub fn parse(&self, line: &str) -> Option<FeedEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Some(payload) = trimmed.strip_prefix(EVENT_MARKER) else {
            tracing::trace!(line = trimmed, "line without event marker ignored");
            return None;
        };

        let raw: RawEvent = match serde_json::from_str(payload) {
            Ok(raw) => raw,
            Err(error) if error.classify() == Category::Data => {
                // Well-formed JSON outside the known shapes: degrade to a
                // default progress note so newer producers stay readable
                tracing::debug!(%error, payload, "payload outside known shapes, degrading to progress note");
                RawEvent::default()
            }
            Err(error) => {
                tracing::debug!(%error, payload, "dropping undecodable feed line");
                return None;
            }
        };

        if raw.done.as_ref().is_some_and(is_truthy) {
            let final_summary = (raw.kind.as_deref() == Some("summary")).then(|| {
                CrawlSummary::new(
                    raw.articles.unwrap_or(0),
                    SummaryOutcome::from_status(raw.status.as_deref()),
                )
            });
            return Some(FeedEvent::Completed { final_summary });
        }

        if raw.kind.as_deref() == Some("summary") {
            return Some(FeedEvent::Summary(CrawlSummary::new(
                raw.articles.unwrap_or(0),
                SummaryOutcome::from_status(raw.status.as_deref()),
            )));
        }

        Some(FeedEvent::Message(LogEntry::now(
            raw.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            LogSeverity::from_status(raw.status.as_deref()),
        )))
    }
}

/// ECMAScript truthiness over a JSON value, the semantics the original
/// dashboard applied to the `done` flag.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(text) => !text.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{EventParser, DEFAULT_MESSAGE};
    use crate::domain::events::{CrawlSummary, FeedEvent, LogSeverity, SummaryOutcome};

    fn parse(line: &str) -> Option<FeedEvent> {
        EventParser::new().parse(line)
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\r")]
    #[case(": keep-alive")]
    #[case("event: progress")]
    #[case("DATA: {\"done\":true}")]
    fn non_event_lines_classify_to_nothing(#[case] line: &str) {
        assert_eq!(parse(line), None);
    }

    #[rstest]
    #[case("data: {\"done\":")]
    #[case("data: {\"message\": \"unterminated")]
    #[case("data: {\"done\":true} trailing")]
    #[case("data: ")]
    fn malformed_json_is_dropped(#[case] line: &str) {
        assert_eq!(parse(line), None);
    }

    #[rstest]
    #[case("data: 42")]
    #[case("data: \"finished\"")]
    #[case("data: [1,2,3]")]
    #[case("data: {\"message\": 42}")]
    #[case("data: {\"type\": 7}")]
    fn payloads_outside_known_shapes_degrade_to_default_note(#[case] line: &str) {
        match parse(line) {
            Some(FeedEvent::Message(entry)) => {
                assert_eq!(entry.message, DEFAULT_MESSAGE);
                assert_eq!(entry.severity, LogSeverity::Info);
            }
            other => panic!("expected default progress note, got {other:?}"),
        }
    }

    #[test]
    fn completion_marker_wins_over_everything() {
        let event = parse("data: {\"done\": true, \"message\": \"bye\"}");
        assert_eq!(event, Some(FeedEvent::Completed { final_summary: None }));
    }

    #[rstest]
    #[case("data: {\"done\": true}", true)]
    #[case("data: {\"done\": 1}", true)]
    #[case("data: {\"done\": \"yes\"}", true)]
    #[case("data: {\"done\": {}}", true)]
    #[case("data: {\"done\": []}", true)]
    #[case("data: {\"done\": false}", false)]
    #[case("data: {\"done\": 0}", false)]
    #[case("data: {\"done\": 0.0}", false)]
    #[case("data: {\"done\": \"\"}", false)]
    #[case("data: {\"done\": null}", false)]
    fn done_uses_ecmascript_truthiness(#[case] line: &str, #[case] completes: bool) {
        let event = parse(line);
        if completes {
            assert!(matches!(event, Some(FeedEvent::Completed { .. })), "{line}");
        } else {
            // Falsy done leaves an otherwise empty payload a default note
            assert!(matches!(event, Some(FeedEvent::Message(_))), "{line}");
        }
    }

    #[test]
    fn completion_bundled_with_summary_carries_it() {
        let event =
            parse("data: {\"done\": true, \"type\": \"summary\", \"articles\": 9, \"status\": \"success\"}");
        assert_eq!(
            event,
            Some(FeedEvent::Completed {
                final_summary: Some(CrawlSummary::new(9, SummaryOutcome::Success)),
            })
        );
    }

    #[test]
    fn summary_payload_maps_fields() {
        let event = parse("data: {\"type\": \"summary\", \"articles\": 12, \"status\": \"success\"}");
        assert_eq!(
            event,
            Some(FeedEvent::Summary(CrawlSummary::new(12, SummaryOutcome::Success)))
        );
    }

    #[rstest]
    #[case("data: {\"type\": \"summary\"}", 0, SummaryOutcome::Unknown)]
    #[case("data: {\"type\": \"summary\", \"articles\": 3}", 3, SummaryOutcome::Unknown)]
    #[case(
        "data: {\"type\": \"summary\", \"status\": \"error\"}",
        0,
        SummaryOutcome::Error
    )]
    #[case(
        "data: {\"type\": \"summary\", \"status\": \"partial\"}",
        0,
        SummaryOutcome::Unknown
    )]
    fn summary_defaults_apply(
        #[case] line: &str,
        #[case] articles: u64,
        #[case] outcome: SummaryOutcome,
    ) {
        assert_eq!(
            parse(line),
            Some(FeedEvent::Summary(CrawlSummary::new(articles, outcome)))
        );
    }

    #[test]
    fn type_other_than_summary_is_a_message() {
        let event = parse("data: {\"type\": \"heartbeat\", \"message\": \"tick\"}");
        match event {
            Some(FeedEvent::Message(entry)) => assert_eq!(entry.message, "tick"),
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[rstest]
    #[case("data: {\"message\": \"Fetching page\", \"status\": \"info\"}", "Fetching page", LogSeverity::Info)]
    #[case("data: {\"message\": \"boom\", \"status\": \"error\"}", "boom", LogSeverity::Error)]
    #[case("data: {\"message\": \"saved\", \"status\": \"success\"}", "saved", LogSeverity::Success)]
    #[case("data: {\"message\": \"slow\", \"status\": \"warning\"}", "slow", LogSeverity::Warning)]
    #[case("data: {\"message\": \"odd\", \"status\": \"fatal\"}", "odd", LogSeverity::Info)]
    #[case("data: {\"status\": \"info\"}", DEFAULT_MESSAGE, LogSeverity::Info)]
    #[case("data: {}", DEFAULT_MESSAGE, LogSeverity::Info)]
    fn messages_map_text_and_severity(
        #[case] line: &str,
        #[case] message: &str,
        #[case] severity: LogSeverity,
    ) {
        match parse(line) {
            Some(FeedEvent::Message(entry)) => {
                assert_eq!(entry.message, message);
                assert_eq!(entry.severity, severity);
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn empty_message_text_is_kept_verbatim() {
        // Only an absent field falls back to the default text
        match parse("data: {\"message\": \"\"}") {
            Some(FeedEvent::Message(entry)) => assert_eq!(entry.message, ""),
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let event = parse("  data: {\"done\": true}\r");
        assert_eq!(event, Some(FeedEvent::Completed { final_summary: None }));
    }

    #[test]
    fn unknown_extra_fields_are_ignored() {
        let event = parse("data: {\"message\": \"ok\", \"elapsed_ms\": 1200, \"page\": 4}");
        assert!(matches!(event, Some(FeedEvent::Message(_))));
    }
}
