//! # Gateway Container
//!
//! Holds every subsystem instance and wires them together.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: time source, key-value store, credential index
//! Level 1: device authenticator, event store, idempotency guard
//! Level 2: ingestion pipeline (+ fan-out, alerting)
//! Level 3: worker pool, transport adapter (+ dead letters)
//! ```

use crate::container::config::{GatewayConfig, StorageBackend};
use shared_types::{SystemTimeSource, TimeSource};
use std::sync::Arc;
use tg_01_device_trust::{CredentialFileError, DeviceAuthenticator, InMemoryCredentialStore};
use tg_02_event_store::{InMemoryKVStore, KVStoreError, KeyValueStore, KvEventStore, KvIdempotencyGuard};
use tg_03_ingestion::{
    BroadcastEventPublisher, DeadLetterSink, FileDeadLetterSink, InMemoryDeadLetterSink,
    IngestionDependencies, IngestionPipeline, LoggingAlertSink, TransportAdapter, WorkerPool,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Event store over whichever backend was configured.
pub type GatewayEventStore = KvEventStore<dyn KeyValueStore>;
/// Idempotency guard over whichever backend was configured.
pub type GatewayIdempotencyGuard = KvIdempotencyGuard<dyn KeyValueStore>;
/// The fully wired pipeline.
pub type GatewayPipeline = IngestionPipeline<
    DeviceAuthenticator<InMemoryCredentialStore>,
    GatewayEventStore,
    GatewayIdempotencyGuard,
>;

/// Wiring failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to load credentials: {0}")]
    Credentials(#[from] CredentialFileError),

    #[error("failed to open storage: {0}")]
    Storage(#[from] KVStoreError),

    #[error("storage backend {0:?} is not available in this build")]
    BackendUnavailable(StorageBackend),
}

/// All subsystem instances.
pub struct Gateway {
    pub config: GatewayConfig,
    pub time_source: Arc<dyn TimeSource>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub event_store: Arc<GatewayEventStore>,
    pub idempotency: Arc<GatewayIdempotencyGuard>,
    pub publisher: Arc<BroadcastEventPublisher>,
    pub pool: Arc<WorkerPool<GatewayPipeline>>,
    pub transport: Arc<TransportAdapter<GatewayPipeline>>,
}

impl Gateway {
    /// Wire the gateway with the system clock.
    pub fn build(config: GatewayConfig) -> Result<Self, GatewayError> {
        Self::build_with_clock(config, Arc::new(SystemTimeSource::new()))
    }

    /// Wire the gateway with an explicit clock.
    #[instrument(name = "gateway_init", skip_all)]
    pub fn build_with_clock(
        config: GatewayConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self, GatewayError> {
        let kv = open_store(&config)?;

        let credentials = Arc::new(match &config.credentials_file {
            Some(path) => InMemoryCredentialStore::load_file(path)?,
            None => {
                warn!("No credentials file configured; every device is unknown");
                InMemoryCredentialStore::new()
            }
        });

        let event_store = Arc::new(KvEventStore::new(Arc::clone(&kv)));
        let idempotency = Arc::new(KvIdempotencyGuard::new(
            Arc::clone(&kv),
            Arc::clone(&time_source),
            config.ingestion.reservation_ttl(),
        ));
        let publisher = Arc::new(BroadcastEventPublisher::new());

        let pipeline = IngestionPipeline::new(
            &config.ingestion,
            IngestionDependencies {
                authenticator: Arc::new(DeviceAuthenticator::new(Arc::clone(&credentials))),
                event_store: Arc::clone(&event_store),
                idempotency: Arc::clone(&idempotency),
                time_source: Arc::clone(&time_source),
            },
        )
        .with_publisher(publisher.clone())
        .with_alert_sink(Arc::new(LoggingAlertSink));

        let pool = Arc::new(WorkerPool::new(
            Arc::new(pipeline),
            config.ingestion.worker_count,
        ));

        let dead_letters: Arc<dyn DeadLetterSink> = match &config.dead_letter_path {
            Some(path) => Arc::new(FileDeadLetterSink::new(path)),
            None => Arc::new(InMemoryDeadLetterSink::default()),
        };
        let transport = Arc::new(TransportAdapter::new(
            Arc::clone(&pool),
            dead_letters,
            Arc::clone(&time_source),
        ));

        info!(
            backend = ?config.storage.backend,
            workers = config.ingestion.worker_count,
            "Gateway wired"
        );

        Ok(Self {
            config,
            time_source,
            credentials,
            event_store,
            idempotency,
            publisher,
            pool,
            transport,
        })
    }

    /// Stop admitting deliveries and wait for in-flight ones.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

fn open_store(config: &GatewayConfig) -> Result<Arc<dyn KeyValueStore>, GatewayError> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryKVStore::new())),
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let rocks = tg_02_event_store::RocksDbConfig {
                path: config.storage.data_dir.join("events"),
                ..Default::default()
            };
            Ok(Arc::new(tg_02_event_store::RocksDbStore::open(rocks)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        other => Err(GatewayError::BackendUnavailable(other)),
    }
}
