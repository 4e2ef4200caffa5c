//! Restart behaviour on the RocksDB backend.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use shared_types::DeviceId;
    use std::path::Path;
    use std::sync::Arc;
    use tg_02_event_store::{EventStore, KeyValueStore, RocksDbConfig, RocksDbStore};
    use tg_03_ingestion::{IngestApi, IngestionConfig};

    fn open(path: &Path) -> TestGateway {
        let store = RocksDbStore::open(RocksDbConfig {
            path: path.to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let kv: Arc<dyn KeyValueStore> = Arc::new(store);
        TestGateway::with_store(IngestionConfig::default(), kv, base_time())
    }

    #[tokio::test]
    async fn test_redelivery_after_restart_is_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let raw = envelope(
            "D1",
            &device_key(1),
            &[("temperature", 23.5), ("humidity", 48.0)],
            Some(base_time()),
        );

        let id = {
            let gw = open(dir.path());
            let outcome = gw.pipeline.ingest(TOPIC, &raw).await;
            assert_eq!(outcome.label(), "accepted");
            outcome.event_id().cloned().unwrap()
        };

        let gw = open(dir.path());
        let again = gw.pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(again.label(), "duplicate");
        assert_eq!(again.event_id(), Some(&id));

        assert_eq!(gw.event_store.count().await.unwrap(), 1);
        let latest = gw
            .event_store
            .latest_for_device(&DeviceId::new("D1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.event_id, id);
        assert_eq!(latest.readings["humidity"], 48.0);
    }
}
