//! # Gateway Runtime Library
//!
//! Exposes the runtime's modules for testing. The entry point is the
//! `main.rs` binary.
//!
//! - `container/`: configuration and subsystem wiring
//! - `transport/`: line-oriented delivery source
//! - `maintenance`: idempotency pruning

pub mod container;
pub mod maintenance;
pub mod transport;

pub use container::{Gateway, GatewayConfig, GatewayError};
