//! # Telemetry-Gateway Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Wired pipeline, device keys, envelope builders
//! └── integration/      # Cross-subsystem scenarios
//!     ├── ingestion.rs      # accept, retrieve, reject paths
//!     ├── idempotency.rs    # redelivery and forced races
//!     ├── security.rs       # revocation, tampering, rotation, alerts
//!     ├── transport.rs      # dispositions, dead letters, shutdown
//!     └── durability.rs     # restart against RocksDB (feature `rocksdb`)
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tg-tests
//! cargo test -p tg-tests --features rocksdb
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
