//! Application layer module
//!
//! Orchestrates the domain state machine over the transport layer: the
//! per-session monitor pump and the per-source registry hosts drive it with.

pub mod monitor;
pub mod registry;

pub use monitor::{CrawlMonitor, MonitorHandle, RefreshSignal, SessionExpired};
pub use registry::MonitorRegistry;
