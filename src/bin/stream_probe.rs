//! Live console probe for the crawl progress feed
//!
//! Connects a monitor to a real backend and prints progress as snapshots
//! arrive. Useful for eyeballing a source's feed without the dashboard.
//!
//! Usage: stream_probe <source-id> [--trigger]

use anyhow::{Context, Result};
use newsdeck_monitor::application::CrawlMonitor;
use newsdeck_monitor::domain::{LogSeverity, SessionPhase};
use newsdeck_monitor::infrastructure::{
    ConfigManager, CrawlStreamClient, init_logging_with_config, log_system_info,
};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(source_id) = args.next() else {
        eprintln!("usage: stream_probe <source-id> [--trigger]");
        std::process::exit(2);
    };
    let trigger = args.any(|flag| flag == "--trigger");

    let manager = ConfigManager::new().context("Failed to locate configuration directory")?;
    manager.initialize_on_first_run().await?;
    let config = manager.load_with_env()?;

    init_logging_with_config(config.logging.clone())?;
    log_system_info();

    println!("🚀 Newsdeck stream probe");
    println!("========================");
    println!("  Source: {}", source_id);
    println!("  Backend: {}", config.api.base_url);
    println!();

    let client = CrawlStreamClient::new(&config.api).context("Failed to build stream client")?;

    if trigger {
        println!("🕷️  Triggering crawl for {}...", source_id);
        client
            .trigger_crawl(&source_id)
            .await
            .context("Crawl trigger request failed")?;
        println!("✅ Crawl triggered");
    }

    let mut handle = CrawlMonitor::new(source_id.clone(), client).spawn();
    let refresh = handle
        .take_refresh()
        .context("refresh receiver already taken")?;
    let mut snapshots = handle.subscribe();

    println!("📊 Watching progress (Ctrl-C to stop)...");
    let mut last_printed = None;
    let mut cancelled = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("🛑 Cancelling monitor...");
                handle.cancel();
                cancelled = true;
                break;
            }
            changed = snapshots.changed() => {
                // Err means the pump ended; the last snapshot stays readable
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(entry) = snapshot.history.last() {
                    if last_printed.as_ref() != Some(entry) {
                        println!(
                            "  [{}] {} {}",
                            entry.captured_at.format("%H:%M:%S"),
                            severity_icon(entry.severity),
                            entry.message
                        );
                        last_printed = Some(entry.clone());
                    }
                }
                if snapshot.phase == SessionPhase::Completed {
                    break;
                }
            }
        }
    }

    handle.wait().await;

    if cancelled {
        println!("🏁 Probe cancelled");
        return Ok(());
    }

    match refresh.await {
        Ok(signal) => {
            let snapshot = snapshots.borrow().clone();
            println!();
            println!("📈 Final results:");
            println!("  Phase: {}", snapshot.phase);
            println!("  Failed: {}", signal.failed);
            println!("  Log entries: {}", snapshot.history.len());
            if let Some(summary) = snapshot.summary {
                println!("  Articles: {}", summary.articles);
                println!("  Outcome: {:?}", summary.outcome);
            }
            if signal.failed {
                println!("❌ Session ended in failure");
            } else {
                println!("🎉 Session completed");
            }
        }
        Err(_) => {
            println!("⚠️  Monitor ended without a completion signal");
        }
    }

    println!("🏁 Probe finished");
    Ok(())
}

fn severity_icon(severity: LogSeverity) -> &'static str {
    match severity {
        LogSeverity::Info => "ℹ️",
        LogSeverity::Error => "❌",
        LogSeverity::Success => "✅",
        LogSeverity::Warning => "⚠️",
    }
}
