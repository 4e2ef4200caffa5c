//! # Ingestion Service
//!
//! - `pipeline`: the per-delivery stages
//! - `pool`: bounded concurrency and graceful shutdown
//! - `transport`: outcome to broker disposition
//! - `monitor`: decryption failure bursts

pub mod monitor;
pub mod pipeline;
pub mod pool;
pub mod transport;

pub use monitor::DecryptFailureMonitor;
pub use pipeline::{IngestionDependencies, IngestionPipeline};
pub use pool::{PoolError, WorkerPool};
pub use transport::{Disposition, TransportAdapter};
