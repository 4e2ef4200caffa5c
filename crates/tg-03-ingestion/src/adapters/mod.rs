//! Adapters for the ingestion sinks.

pub mod alerts;
pub mod dead_letter;
pub mod publisher;

pub use alerts::{LoggingAlertSink, RecordingAlertSink};
pub use dead_letter::{FileDeadLetterSink, InMemoryDeadLetterSink};
pub use publisher::BroadcastEventPublisher;
