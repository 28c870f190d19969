//! Infrastructure layer module
//!
//! Everything that touches the outside world: wire decoding and event
//! classification, the HTTP transport, configuration files, and logging.

pub mod config;
pub mod http_client;
pub mod logging;
pub mod streaming;
pub mod transport;

// Re-export commonly used items
pub use config::{ApiConfig, AppConfig, ConfigManager, LoggingConfig};
pub use http_client::CrawlStreamClient;
pub use logging::{get_log_directory, init_logging, init_logging_with_config, log_system_info};
pub use streaming::{EventParser, LineDecoder};
pub use transport::{
    ProgressByteStream, ReaderByteStream, StreamConnector, TransportError, TransportResult,
};
