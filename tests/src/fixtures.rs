//! # Test Fixtures
//!
//! A pipeline wired from the real subsystem crates over an in-memory (or
//! caller-supplied) key-value store and a manual clock.

use chrono::{Duration, TimeZone, Utc};
use shared_crypto::SecretKey;
use shared_types::{
    DeviceId, DeviceMessage, ManualTimeSource, Readings, TelemetryPayload, TimeSource, Timestamp,
};
use std::sync::Arc;
use tg_01_device_trust::{DeviceAuthenticator, DeviceCredential, InMemoryCredentialStore};
use tg_02_event_store::{InMemoryKVStore, KeyValueStore, KvEventStore, KvIdempotencyGuard};
use tg_03_ingestion::{
    seal_envelope, seal_for_device, BroadcastEventPublisher, IngestionConfig, IngestionDependencies,
    IngestionPipeline, RecordingAlertSink,
};

pub type TestEventStore = KvEventStore<dyn KeyValueStore>;
pub type TestGuard = KvIdempotencyGuard<dyn KeyValueStore>;
pub type TestPipeline =
    IngestionPipeline<DeviceAuthenticator<InMemoryCredentialStore>, TestEventStore, TestGuard>;

pub const TOPIC: &str = "telemetry/dht11";

/// 2024-05-01T10:00:00Z, the fixtures' "now".
pub fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

/// Deterministic per-device secret.
pub fn device_key(seed: u8) -> SecretKey {
    SecretKey::from_bytes([seed; 32])
}

pub fn readings(pairs: &[(&str, f64)]) -> Readings {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Transport bytes for `device` sealed under `key`.
pub fn envelope(
    device: &str,
    key: &SecretKey,
    pairs: &[(&str, f64)],
    sample_timestamp: Option<Timestamp>,
) -> Vec<u8> {
    let payload = TelemetryPayload::new(readings(pairs), sample_timestamp);
    seal_envelope(key, &DeviceId::new(device), &payload).unwrap()
}

/// Transport bytes carrying an arbitrary plaintext.
pub fn raw_envelope(device: &str, key: &SecretKey, plaintext: &[u8]) -> Vec<u8> {
    let device_id = DeviceId::new(device);
    DeviceMessage {
        encrypted_payload: seal_for_device(key, &device_id, plaintext).unwrap(),
        device_id,
        envelope_version: 1,
    }
    .to_wire_bytes()
}

/// The wired pipeline and handles to every collaborator.
pub struct TestGateway {
    pub pipeline: Arc<TestPipeline>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub event_store: Arc<TestEventStore>,
    pub guard: Arc<TestGuard>,
    pub clock: Arc<ManualTimeSource>,
    pub publisher: Arc<BroadcastEventPublisher>,
    pub alerts: Arc<RecordingAlertSink>,
    /// Present when the gateway runs on the in-memory store.
    pub memory: Option<Arc<InMemoryKVStore>>,
}

impl TestGateway {
    /// Devices `D1` (key seed 1) and `D2` (key seed 2), in-memory store.
    pub fn new() -> Self {
        Self::with_config(IngestionConfig::default())
    }

    pub fn with_config(config: IngestionConfig) -> Self {
        let memory = Arc::new(InMemoryKVStore::new());
        let kv: Arc<dyn KeyValueStore> = memory.clone();
        let mut gateway = Self::with_store(config, kv, base_time());
        gateway.memory = Some(memory);
        gateway
    }

    pub fn with_store(config: IngestionConfig, kv: Arc<dyn KeyValueStore>, now: Timestamp) -> Self {
        let credentials = Arc::new(InMemoryCredentialStore::from_credentials([
            DeviceCredential::active(DeviceId::new("D1"), device_key(1)),
            DeviceCredential::active(DeviceId::new("D2"), device_key(2)),
        ]));
        let clock = Arc::new(ManualTimeSource::new(now));
        let time_source: Arc<dyn TimeSource> = clock.clone();

        let event_store = Arc::new(KvEventStore::new(Arc::clone(&kv)));
        let guard = Arc::new(KvIdempotencyGuard::new(
            kv,
            Arc::clone(&time_source),
            config.reservation_ttl(),
        ));
        let publisher = Arc::new(BroadcastEventPublisher::new());
        let alerts = Arc::new(RecordingAlertSink::new());
        let pipeline = IngestionPipeline::new(
            &config,
            IngestionDependencies {
                authenticator: Arc::new(DeviceAuthenticator::new(Arc::clone(&credentials))),
                event_store: Arc::clone(&event_store),
                idempotency: Arc::clone(&guard),
                time_source,
            },
        )
        .with_publisher(publisher.clone())
        .with_alert_sink(alerts.clone());

        Self {
            pipeline: Arc::new(pipeline),
            credentials,
            event_store,
            guard,
            clock,
            publisher,
            alerts,
            memory: None,
        }
    }

    /// A well-formed reading from `D1`, sampled a few seconds ago.
    pub fn d1_reading(&self, pairs: &[(&str, f64)]) -> Vec<u8> {
        envelope(
            "D1",
            &device_key(1),
            pairs,
            Some(base_time() - Duration::seconds(3)),
        )
    }
}

/// Flip one byte inside the sealed payload of `raw`.
pub fn tamper(raw: &[u8]) -> Vec<u8> {
    let mut message = DeviceMessage::parse(raw).unwrap();
    let middle = message.encrypted_payload.len() / 2;
    message.encrypted_payload[middle] ^= 0x01;
    message.to_wire_bytes()
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}
