//! Logging system configuration and initialization
//!
//! This module provides the tracing setup for the monitor:
//! - Console and/or file output driven by [`LoggingConfig`]
//! - Structured JSON logging (optional)
//! - Non-blocking file writer with startup rotation of the previous run
//! - UTC timestamps
//!
//! The `RUST_LOG` environment variable overrides the configured filter, for
//! example `RUST_LOG="debug,reqwest=debug,hyper=debug"`.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use lazy_static::lazy_static;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

use crate::infrastructure::config::ConfigManager;

const LOG_FILE_NAME: &str = "newsdeck-monitor.log";

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// UTC time formatter with millisecond precision
struct UtcTimeFormatter;

impl FormatTime for UtcTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Get the log directory under the application data directory
pub fn get_log_directory() -> PathBuf {
    ConfigManager::get_app_data_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| PathBuf::from("logs"))
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    let config = LoggingConfig::default();
    init_logging_with_config(config)
}

/// Rotate an existing log file by renaming it with its last-write timestamp
fn rotate_existing_log_file(log_dir: &PathBuf, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);

    if log_file_path.exists() {
        let metadata = std::fs::metadata(&log_file_path)
            .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;

        let file_time = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or_else(|_| std::time::SystemTime::now());

        let datetime: chrono::DateTime<Utc> = file_time.into();
        let file_stem = log_file_name.trim_end_matches(".log");
        let timestamped_name = format!("{}.{}.log", file_stem, datetime.format("%Y%m%dT%H%M%S"));
        let timestamped_path = log_dir.join(&timestamped_name);

        std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
            anyhow!(
                "Failed to rotate log file {} to {}: {}",
                log_file_path.display(),
                timestamped_path.display(),
                e
            )
        })?;

        info!("Rotated existing log file to: {}", timestamped_name);
    }

    Ok(())
}

/// Initialize logging with custom configuration
///
/// Verbose dependency output is suppressed unless the configured level is
/// `trace`; `RUST_LOG` overrides everything when set.
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    // Set up environment filter with dependency noise suppressed
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);

        if !config.level.to_lowercase().contains("trace") {
            filter = filter
                // HTTP client internals - only show on TRACE
                .add_directive("reqwest=info".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("h2=warn".parse().unwrap())
                // Tokio runtime details - only show on TRACE
                .add_directive("tokio=info".parse().unwrap())
                .add_directive("runtime=warn".parse().unwrap())
                // Keep our application logs at the requested level
                .add_directive(
                    format!("newsdeck_monitor={}", config.level).parse().unwrap(),
                );
        }

        filter
    });

    let registry = Registry::default().with(env_filter);

    match (config.file_output, config.console_output) {
        (true, true) => {
            let (file_writer, log_dir) = build_file_writer()?;

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);
                let console_layer = fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false);

                registry.with(file_layer).with(console_layer).init();
            } else {
                // File layer with minimal formatting (time + level + message)
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false);
                let console_layer = fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false);

                registry.with(file_layer).with(console_layer).init();
            }

            info!("Log directory: {:?}", log_dir);
        }
        (true, false) => {
            let (file_writer, log_dir) = build_file_writer()?;

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);

                registry.with(file_layer).init();
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false);

                registry.with(file_layer).init();
            }

            info!("Log directory: {:?}", log_dir);
        }
        (false, true) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(UtcTimeFormatter)
                .with_target(false);

            registry.with(console_layer).init();
        }
        (false, false) => {
            return Err(anyhow!("No logging output configured"));
        }
    }

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    info!("JSON format: {}", config.json_format);
    info!("Console output: {}", config.console_output);
    info!("File output: {}", config.file_output);
    if !config.level.to_lowercase().contains("trace") {
        info!("Dependency logs suppressed (use TRACE level to see all logs)");
    }

    Ok(())
}

/// Create the non-blocking file writer, rotating any previous log first
fn build_file_writer() -> Result<(non_blocking::NonBlocking, PathBuf)> {
    let log_dir = get_log_directory();

    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

    if let Err(e) = rotate_existing_log_file(&log_dir, LOG_FILE_NAME) {
        warn!("Log rotation failed, appending to existing file: {}", e);
    }

    let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
    let (file_writer, file_guard) = non_blocking(file_appender);

    // Store the guard globally to prevent it from being dropped
    LOG_GUARDS.lock().unwrap().push(file_guard);

    Ok((file_writer, log_dir))
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Newsdeck Monitor System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }

    info!("Log directory: {:?}", get_log_directory());
    info!("===========================================");
}
