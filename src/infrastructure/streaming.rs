//! Streaming pipeline stages
//!
//! Byte chunks come in, classified events come out:
//! [`LineDecoder`] reassembles complete lines across chunk boundaries and
//! [`EventParser`] turns each line into a [`crate::domain::FeedEvent`].

pub mod event_parser;
pub mod line_decoder;

// Re-export commonly used items
pub use event_parser::{EventParser, DEFAULT_MESSAGE, EVENT_MARKER};
pub use line_decoder::LineDecoder;
