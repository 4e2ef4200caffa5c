//! Device identity, payload integrity and key rotation.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use chrono::Duration;
    use shared_types::{DeviceId, TimeSource};
    use tg_02_event_store::EventStore;
    use tg_03_ingestion::{IngestApi, IngestError, IngestOutcome, IngestionConfig, RejectionKind};

    #[tokio::test]
    async fn test_revoked_device_is_rejected_after_acceptance() {
        let gw = TestGateway::new();
        let accepted = gw
            .pipeline
            .ingest(TOPIC, &gw.d1_reading(&[("temperature", 20.0)]))
            .await;
        assert_eq!(accepted.label(), "accepted");

        assert!(gw.credentials.revoke(&DeviceId::new("D1")));
        let outcome = gw
            .pipeline
            .ingest(TOPIC, &gw.d1_reading(&[("temperature", 21.0)]))
            .await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::DeviceRevoked));
        assert!(!outcome.is_transient());
        assert_eq!(gw.event_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_device_is_rejected() {
        let gw = TestGateway::new();
        let raw = envelope("D404", &device_key(4), &[("temperature", 20.0)], None);

        let outcome = gw.pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::UnknownDevice));
    }

    #[tokio::test]
    async fn test_impersonation_fails_decryption() {
        let gw = TestGateway::new();
        // D2's payload relabelled as D1.
        let raw = envelope("D1", &device_key(2), &[("temperature", 20.0)], None);

        match gw.pipeline.ingest(TOPIC, &raw).await {
            IngestOutcome::Rejected(IngestError::DecryptionFailure { device_id, .. }) => {
                assert_eq!(device_id, DeviceId::new("D1"));
            }
            other => panic!("expected DecryptionFailure, got {other:?}"),
        }
        assert_eq!(gw.event_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_bit_flip_fails_decryption() {
        let gw = TestGateway::new();
        let raw = tamper(&gw.d1_reading(&[("temperature", 23.5), ("humidity", 48.0)]));

        let outcome = gw.pipeline.ingest(TOPIC, &raw).await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::DecryptionFailure));
        assert!(!outcome.is_transient());
        assert_eq!(gw.event_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retired_key_honoured_only_within_grace() {
        let config = IngestionConfig::builder()
            .key_rotation_grace_secs(600)
            .build()
            .unwrap();
        let gw = TestGateway::with_config(config);
        let old_key = device_key(1);

        assert!(gw
            .credentials
            .rotate(&DeviceId::new("D1"), device_key(11), gw.clock.now()));

        let in_grace = envelope("D1", &old_key, &[("temperature", 20.0)], None);
        assert_eq!(gw.pipeline.ingest(TOPIC, &in_grace).await.label(), "accepted");

        let new_key = envelope("D1", &device_key(11), &[("temperature", 21.0)], None);
        assert_eq!(gw.pipeline.ingest(TOPIC, &new_key).await.label(), "accepted");

        gw.clock.advance(Duration::seconds(601));
        let too_late = envelope("D1", &old_key, &[("temperature", 22.0)], None);
        assert_eq!(
            gw.pipeline.ingest(TOPIC, &too_late).await.rejection_kind(),
            Some(RejectionKind::DecryptionFailure)
        );
    }

    #[tokio::test]
    async fn test_rotation_without_grace_cuts_over_immediately() {
        let gw = TestGateway::new();
        gw.credentials
            .rotate(&DeviceId::new("D1"), device_key(11), gw.clock.now());

        let old = envelope("D1", &device_key(1), &[("temperature", 20.0)], None);
        assert_eq!(
            gw.pipeline.ingest(TOPIC, &old).await.rejection_kind(),
            Some(RejectionKind::DecryptionFailure)
        );
    }

    #[tokio::test]
    async fn test_failure_burst_raises_a_single_alert() {
        let config = IngestionConfig::builder().alerting(3, 60).build().unwrap();
        let gw = TestGateway::with_config(config);
        let forged = envelope("D1", &device_key(9), &[("temperature", 20.0)], None);

        for _ in 0..7 {
            gw.pipeline.ingest(TOPIC, &forged).await;
            gw.clock.advance(Duration::seconds(1));
        }

        let alerts = gw.alerts.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].device_id, DeviceId::new("D1"));
        assert!(alerts[0].failures >= 3);

        // A legitimate reading still goes through.
        let good = envelope("D1", &device_key(1), &[("temperature", 20.0)], None);
        assert_eq!(gw.pipeline.ingest(TOPIC, &good).await.label(), "accepted");
    }
}
