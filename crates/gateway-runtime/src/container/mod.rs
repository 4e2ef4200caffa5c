//! # Gateway Container
//!
//! Configuration plus the wired subsystem instances.

pub mod config;
pub mod gateway;

pub use config::{ConfigError, GatewayConfig, LoggingConfig, StorageBackend, StorageConfig};
pub use gateway::{Gateway, GatewayError, GatewayEventStore, GatewayIdempotencyGuard, GatewayPipeline};
