//! # Shared Types Crate
//!
//! This crate contains the telemetry data model and the wire formats that
//! devices speak to the gateway.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Immutable Events**: An `EnrichedEvent` is built once by the enricher
//!   and never mutated after it is handed to storage.
//! - **Identity From The Envelope**: The payload carries readings only; the
//!   envelope's `deviceId` is authoritative.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod telemetry;
pub mod time;

pub use entities::*;
pub use envelope::{DeviceMessage, SUPPORTED_ENVELOPE_VERSIONS};
pub use errors::*;
pub use telemetry::TelemetryPayload;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
