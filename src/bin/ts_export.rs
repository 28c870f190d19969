// Generates TypeScript definitions for the snapshot types the dashboard consumes
use newsdeck_monitor::domain::{
    CrawlSummary, LogEntry, LogSeverity, SessionPhase, SessionSnapshot, SummaryOutcome,
};

fn main() {
    use ts_rs::TS;

    println!("LogSeverity TS: {}", LogSeverity::name());
    println!("LogEntry TS: {}", LogEntry::name());
    println!("SummaryOutcome TS: {}", SummaryOutcome::name());
    println!("CrawlSummary TS: {}", CrawlSummary::name());
    println!("SessionPhase TS: {}", SessionPhase::name());
    println!("SessionSnapshot TS: {}", SessionSnapshot::name());

    if let Err(e) = LogSeverity::export() {
        eprintln!("LogSeverity export error: {}", e);
    }
    if let Err(e) = LogEntry::export() {
        eprintln!("LogEntry export error: {}", e);
    }
    if let Err(e) = SummaryOutcome::export() {
        eprintln!("SummaryOutcome export error: {}", e);
    }
    if let Err(e) = CrawlSummary::export() {
        eprintln!("CrawlSummary export error: {}", e);
    }
    if let Err(e) = SessionPhase::export() {
        eprintln!("SessionPhase export error: {}", e);
    }
    if let Err(e) = SessionSnapshot::export() {
        eprintln!("SessionSnapshot export error: {}", e);
    }

    println!("TypeScript definitions generated");
}
