//! Accept, retrieve and reject paths through the wired subsystems.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use chrono::Duration;
    use shared_types::{DeviceId, TimeSource};
    use tg_02_event_store::{EventStore, IdempotencyGuard, ReservationState};
    use tg_03_ingestion::{IngestApi, IngestError, IngestOutcome, RejectionKind};

    #[tokio::test]
    async fn test_dht11_reading_is_stored_with_provenance() {
        let gw = TestGateway::new();
        let mut downstream = gw.publisher.subscribe();
        let raw = gw.d1_reading(&[("temperature", 23.5), ("humidity", 48.0)]);

        let outcome = gw.pipeline.ingest(TOPIC, &raw).await;
        let IngestOutcome::Accepted(id) = outcome else {
            panic!("expected Accepted, got {outcome:?}");
        };

        let event = gw.event_store.get(&id).await.unwrap().unwrap();
        assert_eq!(event.device_id, DeviceId::new("D1"));
        assert_eq!(event.readings["temperature"], 23.5);
        assert_eq!(event.readings["humidity"], 48.0);
        assert_eq!(event.ingest_timestamp, gw.clock.now());
        assert_eq!(event.provenance.source_topic, TOPIC);
        assert_eq!(event.provenance.envelope_version, 1);
        assert_eq!(event.event_id.as_str().len(), 64);

        let record = gw.guard.record(&id).await.unwrap().unwrap();
        assert_eq!(record.state, ReservationState::Committed);

        assert_eq!(downstream.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_out_of_range_humidity_leaves_no_trace() {
        let gw = TestGateway::new();
        let raw = gw.d1_reading(&[("temperature", 21.0), ("humidity", 150.0)]);

        match gw.pipeline.ingest(TOPIC, &raw).await {
            IngestOutcome::Rejected(IngestError::Validation(err)) => {
                assert_eq!(err.field, "humidity");
            }
            other => panic!("expected a validation rejection, got {other:?}"),
        }
        assert_eq!(gw.event_store.count().await.unwrap(), 0);
        assert!(gw.memory.as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognised_readings_are_dropped() {
        let gw = TestGateway::new();
        let raw = gw.d1_reading(&[("temperature", 19.0), ("battery_mv", 3300.0)]);

        let id = gw.pipeline.ingest(TOPIC, &raw).await.event_id().cloned().unwrap();
        let event = gw.event_store.get(&id).await.unwrap().unwrap();
        assert!(event.readings.contains_key("temperature"));
        assert!(!event.readings.contains_key("battery_mv"));
    }

    #[tokio::test]
    async fn test_future_sample_beyond_skew_is_rejected() {
        let gw = TestGateway::new();
        let raw = envelope(
            "D1",
            &device_key(1),
            &[("temperature", 20.0)],
            Some(base_time() + Duration::hours(2)),
        );

        let outcome = gw.pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::ValidationError));
        assert!(!outcome.is_transient());
    }

    #[tokio::test]
    async fn test_non_json_plaintext_is_validation_error() {
        let gw = TestGateway::new();
        let raw = raw_envelope("D1", &device_key(1), b"t=23.5;h=48");

        let outcome = gw.pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::ValidationError));
    }

    #[tokio::test]
    async fn test_malformed_envelopes_are_permanent() {
        let gw = TestGateway::new();
        for raw in [
            &b"not json"[..],
            br#"{"deviceId":"","encryptedPayload":"00","envelopeVersion":1}"#,
            br#"{"deviceId":"D1","encryptedPayload":"zz","envelopeVersion":1}"#,
            br#"{"deviceId":"D1","encryptedPayload":"00","envelopeVersion":9}"#,
        ] {
            let outcome = gw.pipeline.ingest(TOPIC, raw).await;
            assert_eq!(outcome.rejection_kind(), Some(RejectionKind::MalformedEnvelope));
            assert!(!outcome.is_transient());
        }
    }

    #[tokio::test]
    async fn test_latest_queries_follow_ingest_order() {
        let gw = TestGateway::new();

        let first = gw
            .pipeline
            .ingest(TOPIC, &gw.d1_reading(&[("temperature", 20.0)]))
            .await;
        gw.clock.advance(Duration::seconds(30));
        let second = envelope(
            "D2",
            &device_key(2),
            &[("temperature", 24.0)],
            Some(base_time() + Duration::seconds(28)),
        );
        let second = gw.pipeline.ingest(TOPIC, &second).await;

        let latest = gw.event_store.latest().await.unwrap().unwrap();
        assert_eq!(Some(&latest.event_id), second.event_id());

        let d1 = gw
            .event_store
            .latest_for_device(&DeviceId::new("D1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Some(&d1.event_id), first.event_id());

        let d2_history = gw
            .event_store
            .events_for_device(&DeviceId::new("D2"), 10)
            .await
            .unwrap();
        assert_eq!(d2_history.len(), 1);
        assert!(gw
            .event_store
            .latest_for_device(&DeviceId::new("D9"))
            .await
            .unwrap()
            .is_none());
    }
}

#[cfg(test)]
mod proptests {
    use crate::fixtures::*;
    use proptest::prelude::*;
    use tg_02_event_store::EventStore;
    use tg_03_ingestion::IngestApi;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn arbitrary_bytes_never_store_anything(raw in proptest::collection::vec(any::<u8>(), 0..256)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let gw = TestGateway::new();
            let outcome = runtime.block_on(gw.pipeline.ingest(TOPIC, &raw));
            prop_assert_eq!(outcome.label(), "rejected");
            prop_assert!(!outcome.is_transient());
            prop_assert_eq!(runtime.block_on(gw.event_store.count()).unwrap(), 0);
        }

        #[test]
        fn humidity_outside_percent_range_is_rejected(humidity in prop_oneof![-1.0e6..-0.001f64, 100.001..1.0e6f64]) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let gw = TestGateway::new();
            let raw = gw.d1_reading(&[("temperature", 20.0), ("humidity", humidity)]);
            let outcome = runtime.block_on(gw.pipeline.ingest(TOPIC, &raw));
            prop_assert_eq!(outcome.label(), "rejected");
            prop_assert_eq!(runtime.block_on(gw.event_store.count()).unwrap(), 0);
        }
    }
}
