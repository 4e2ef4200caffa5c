//! Exactly-once storage under redelivery, races, a forgetful index and a
//! reservation that could not be released.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use gateway_runtime::maintenance::prune_once;
    use shared_types::{EventId, TimeSource, Timestamp};
    use std::sync::Arc;
    use tg_01_device_trust::{DeviceAuthenticator, DeviceCredential, InMemoryCredentialStore};
    use tg_02_event_store::{
        EventStore, IdempotencyGuard, IdempotencyRecord, InMemoryKVStore, KvEventStore,
        KvIdempotencyGuard, ReserveOutcome, StoreError,
    };
    use tg_03_ingestion::{
        IngestApi, IngestionConfig, IngestionDependencies, IngestionPipeline, RejectionKind,
    };
    use tokio::sync::Barrier;

    /// Claims every id is new.
    struct AmnesiacGuard;

    #[async_trait]
    impl IdempotencyGuard for AmnesiacGuard {
        async fn check_and_reserve(&self, _: &EventId) -> Result<ReserveOutcome, StoreError> {
            Ok(ReserveOutcome::Fresh)
        }
        async fn commit(&self, _: &EventId) -> Result<(), StoreError> {
            Ok(())
        }
        async fn release(&self, _: &EventId) -> Result<(), StoreError> {
            Ok(())
        }
        async fn record(&self, _: &EventId) -> Result<Option<IdempotencyRecord>, StoreError> {
            Ok(None)
        }
        async fn prune(&self, _: Timestamp) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    /// A working index whose release never succeeds.
    struct StickyGuard {
        inner: KvIdempotencyGuard<InMemoryKVStore>,
    }

    #[async_trait]
    impl IdempotencyGuard for StickyGuard {
        async fn check_and_reserve(&self, id: &EventId) -> Result<ReserveOutcome, StoreError> {
            self.inner.check_and_reserve(id).await
        }
        async fn commit(&self, id: &EventId) -> Result<(), StoreError> {
            self.inner.commit(id).await
        }
        async fn release(&self, _: &EventId) -> Result<(), StoreError> {
            Err(StoreError::StorageUnavailable("index offline".into()))
        }
        async fn record(&self, id: &EventId) -> Result<Option<IdempotencyRecord>, StoreError> {
            self.inner.record(id).await
        }
        async fn prune(&self, cutoff: Timestamp) -> Result<usize, StoreError> {
            self.inner.prune(cutoff).await
        }
    }

    #[tokio::test]
    async fn test_redelivery_is_duplicate_with_one_stored_event() {
        let gw = TestGateway::new();
        let raw = gw.d1_reading(&[("temperature", 23.5), ("humidity", 48.0)]);

        let first = gw.pipeline.ingest(TOPIC, &raw).await;
        let second = gw.pipeline.ingest(TOPIC, &raw).await;

        assert_eq!(first.label(), "accepted");
        assert_eq!(second.label(), "duplicate");
        assert_eq!(first.event_id(), second.event_id());
        assert_eq!(gw.event_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_device_retransmit_with_fresh_nonce_is_duplicate() {
        let gw = TestGateway::new();
        let sampled = Some(base_time() - Duration::seconds(1));
        let readings = [("temperature", 23.5), ("humidity", 48.0)];

        let first = envelope("D1", &device_key(1), &readings, sampled);
        let again = envelope("D1", &device_key(1), &readings, sampled);
        assert_ne!(first, again);

        assert_eq!(gw.pipeline.ingest(TOPIC, &first).await.label(), "accepted");
        assert_eq!(gw.pipeline.ingest(TOPIC, &again).await.label(), "duplicate");
    }

    #[tokio::test]
    async fn test_same_readings_from_two_devices_are_distinct() {
        let gw = TestGateway::new();
        let sampled = Some(base_time());
        let readings = [("temperature", 22.0)];

        let d1 = gw
            .pipeline
            .ingest(TOPIC, &envelope("D1", &device_key(1), &readings, sampled))
            .await;
        let d2 = gw
            .pipeline
            .ingest(TOPIC, &envelope("D2", &device_key(2), &readings, sampled))
            .await;

        assert_eq!(d1.label(), "accepted");
        assert_eq!(d2.label(), "accepted");
        assert_ne!(d1.event_id(), d2.event_id());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_deliveries_store_once() {
        const RACERS: usize = 12;
        let gw = TestGateway::new();
        let raw = Arc::new(gw.d1_reading(&[("temperature", 23.5), ("humidity", 48.0)]));
        let barrier = Arc::new(Barrier::new(RACERS));

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let pipeline = Arc::clone(&gw.pipeline);
                let raw = Arc::clone(&raw);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    pipeline.ingest(TOPIC, &raw).await
                })
            })
            .collect();

        let mut accepted = 0;
        let mut settled = 0;
        let mut requeued = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            match outcome.label() {
                "accepted" => accepted += 1,
                "duplicate" => settled += 1,
                _ => {
                    // Lost the race while the winner was still saving.
                    assert_eq!(outcome.rejection_kind(), Some(RejectionKind::InFlight));
                    requeued += 1;
                }
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(settled + requeued, RACERS - 1);
        for _ in 0..requeued {
            assert_eq!(gw.pipeline.ingest(TOPIC, &raw).await.label(), "duplicate");
        }
        assert_eq!(gw.event_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_key_rejects_what_the_index_forgot() {
        let credentials = Arc::new(InMemoryCredentialStore::from_credentials([
            DeviceCredential::active("D1".into(), device_key(1)),
        ]));
        let event_store = Arc::new(KvEventStore::new(Arc::new(InMemoryKVStore::new())));
        let clock: Arc<dyn TimeSource> =
            Arc::new(shared_types::ManualTimeSource::new(base_time()));
        let pipeline = IngestionPipeline::new(
            &IngestionConfig::default(),
            IngestionDependencies {
                authenticator: Arc::new(DeviceAuthenticator::new(credentials)),
                event_store: Arc::clone(&event_store),
                idempotency: Arc::new(AmnesiacGuard),
                time_source: clock,
            },
        );

        let raw = envelope("D1", &device_key(1), &[("temperature", 23.5)], Some(base_time()));
        assert_eq!(pipeline.ingest(TOPIC, &raw).await.label(), "accepted");
        assert_eq!(pipeline.ingest(TOPIC, &raw).await.label(), "duplicate");
        assert_eq!(event_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pruned_record_still_yields_duplicate() {
        let gw = TestGateway::new();
        let raw = envelope("D1", &device_key(1), &[("temperature", 23.5)], Some(base_time()));
        let id = gw.pipeline.ingest(TOPIC, &raw).await.event_id().cloned().unwrap();

        gw.clock.advance(Duration::days(8));
        let pruned = prune_once(gw.guard.as_ref(), gw.clock.as_ref(), Duration::days(7))
            .await
            .unwrap();
        assert_eq!(pruned, 1);
        assert!(gw.guard.record(&id).await.unwrap().is_none());

        // Wind the wall clock back so the sample passes the staleness check.
        gw.clock.set_wall_clock(base_time());
        let again = gw.pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(again.label(), "duplicate");
        assert_eq!(again.event_id(), Some(&id));
        assert_eq!(gw.event_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreleased_reservation_is_requeued_until_stored() {
        let credentials = Arc::new(InMemoryCredentialStore::from_credentials([
            DeviceCredential::active("D1".into(), device_key(1)),
        ]));
        let events_kv = Arc::new(InMemoryKVStore::new());
        let event_store = Arc::new(KvEventStore::new(Arc::clone(&events_kv)));
        let clock = Arc::new(shared_types::ManualTimeSource::new(base_time()));
        let time_source: Arc<dyn TimeSource> = clock.clone();
        let config = IngestionConfig::default();
        let pipeline = IngestionPipeline::new(
            &config,
            IngestionDependencies {
                authenticator: Arc::new(DeviceAuthenticator::new(credentials)),
                event_store: Arc::clone(&event_store),
                idempotency: Arc::new(StickyGuard {
                    inner: KvIdempotencyGuard::new(
                        Arc::new(InMemoryKVStore::new()),
                        Arc::clone(&time_source),
                        config.reservation_ttl(),
                    ),
                }),
                time_source,
            },
        );
        let raw = envelope("D1", &device_key(1), &[("temperature", 23.5)], Some(base_time()));

        events_kv.set_unavailable(true);
        let outcome = pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::StorageUnavailable));
        events_kv.set_unavailable(false);

        clock.advance(Duration::seconds(1));
        let outcome = pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::InFlight));
        assert!(outcome.is_transient());
        assert_eq!(event_store.count().await.unwrap(), 0);

        clock.advance(Duration::seconds(30));
        assert_eq!(pipeline.ingest(TOPIC, &raw).await.label(), "accepted");
        assert_eq!(event_store.count().await.unwrap(), 1);
    }
}
