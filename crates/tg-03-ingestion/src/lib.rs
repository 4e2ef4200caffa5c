//! # Ingestion Subsystem (TG-03)
//!
//! Turns encrypted device envelopes into durable, deduplicated telemetry
//! events.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): payload cipher, validator, enricher,
//!   outcome taxonomy, alerts and dead letters
//! - **Ports Layer** (`ports/`): `IngestApi` in; `EventPublisher`,
//!   `DeadLetterSink`, `AlertSink` out
//! - **Adapters** (`adapters/`): broadcast fan-out, dead letter files,
//!   alert logging
//! - **Service Layer** (`service/`): `IngestionPipeline`, `WorkerPool`,
//!   `TransportAdapter`, `DecryptFailureMonitor`
//!
//! ## Guarantees
//!
//! - A delivery is stored at most once per `EventId`, however many times
//!   and however concurrently it is redelivered
//! - Nothing durable is created for a rejected delivery
//! - Every rejection is classified transient (requeue) or permanent
//!   (dead letter)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{
    BroadcastEventPublisher, FileDeadLetterSink, InMemoryDeadLetterSink, LoggingAlertSink,
    RecordingAlertSink,
};
pub use config::{default_sensor_ranges, ConfigError, IngestionConfig, IngestionConfigBuilder, SensorRange};
pub use domain::alerts::{DeadLetter, SecurityAlert};
pub use domain::cipher::{seal_envelope, seal_for_device, DecryptionFailure, KeySlot, PayloadCipher};
pub use domain::enrichment::{derive_event_id, Enricher};
pub use domain::outcome::{IngestError, IngestOutcome, RejectionKind, Stage};
pub use domain::validation::{PayloadValidator, ValidatedPayload, ValidationError};
pub use ports::inbound::IngestApi;
pub use ports::outbound::{AlertSink, DeadLetterError, DeadLetterSink, EventPublisher, PublishError};
pub use service::{
    DecryptFailureMonitor, Disposition, IngestionDependencies, IngestionPipeline, PoolError,
    TransportAdapter, WorkerPool,
};
