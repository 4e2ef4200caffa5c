//! Broker dispositions, dead letters and graceful shutdown.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use gateway_runtime::transport::{run_line_transport, LineTransportOptions, TransportStats};
    use shared_types::TimeSource;
    use std::sync::Arc;
    use tg_02_event_store::EventStore;
    use tg_03_ingestion::{
        DeadLetterSink, Disposition, InMemoryDeadLetterSink, RejectionKind, TransportAdapter,
        WorkerPool,
    };
    use tokio::sync::watch;

    struct Wired {
        gw: TestGateway,
        dead_letters: Arc<InMemoryDeadLetterSink>,
        transport: Arc<TransportAdapter<TestPipeline>>,
    }

    fn wired() -> Wired {
        let gw = TestGateway::new();
        let dead_letters = Arc::new(InMemoryDeadLetterSink::new(100));
        let sink: Arc<dyn DeadLetterSink> = dead_letters.clone();
        let clock: Arc<dyn TimeSource> = gw.clock.clone();
        let pool = Arc::new(WorkerPool::new(Arc::clone(&gw.pipeline), 4));
        let transport = Arc::new(TransportAdapter::new(pool, sink, clock));
        Wired {
            gw,
            dead_letters,
            transport,
        }
    }

    fn options(max_attempts: u32) -> LineTransportOptions {
        LineTransportOptions {
            default_topic: TOPIC.to_string(),
            max_attempts,
            max_pending: 8,
        }
    }

    #[tokio::test]
    async fn test_outcomes_map_to_dispositions() {
        let w = wired();
        let raw = w.gw.d1_reading(&[("temperature", 23.5), ("humidity", 48.0)]);

        assert_eq!(w.transport.deliver(TOPIC, &raw).await, Disposition::Ack);
        assert_eq!(w.transport.deliver(TOPIC, &raw).await, Disposition::Ack);

        let bad = w.gw.d1_reading(&[("humidity", 150.0)]);
        assert_eq!(w.transport.deliver(TOPIC, &bad).await, Disposition::DeadLetter);

        let letters = w.dead_letters.letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].kind, RejectionKind::ValidationError);
        assert_eq!(letters[0].raw, bad);
        assert_eq!(letters[0].topic, TOPIC);
    }

    #[tokio::test]
    async fn test_storage_outage_requeues_then_recovers() {
        let w = wired();
        let memory = w.gw.memory.clone().unwrap();
        let raw = w.gw.d1_reading(&[("temperature", 23.5)]);

        memory.set_unavailable(true);
        assert_eq!(w.transport.deliver(TOPIC, &raw).await, Disposition::Requeue);
        assert!(w.dead_letters.is_empty());

        memory.set_unavailable(false);
        assert_eq!(w.transport.deliver(TOPIC, &raw).await, Disposition::Ack);
        assert_eq!(w.gw.event_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_then_requeues() {
        let w = wired();
        let raw = w.gw.d1_reading(&[("temperature", 23.5)]);
        assert_eq!(w.transport.deliver(TOPIC, &raw).await, Disposition::Ack);

        w.transport.pool().shutdown().await;
        assert_eq!(w.transport.pool().in_flight(), 0);

        let later = w.gw.d1_reading(&[("temperature", 24.5)]);
        assert_eq!(w.transport.deliver(TOPIC, &later).await, Disposition::Requeue);
        assert_eq!(w.gw.event_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_line_transport_tallies_dispositions() {
        let w = wired();
        let reading = String::from_utf8(w.gw.d1_reading(&[("temperature", 23.5)])).unwrap();
        let other = String::from_utf8(w.gw.d1_reading(&[("temperature", 19.0)])).unwrap();
        let input = format!("{reading}\n\nplant-7\t{other}\n{reading}\nnot an envelope\n");

        let (_tx, rx) = watch::channel(false);
        let stats = run_line_transport(input.as_bytes(), Arc::clone(&w.transport), options(3), rx)
            .await
            .unwrap();

        assert_eq!(
            stats,
            TransportStats {
                acked: 3,
                dead_lettered: 1,
                abandoned: 0,
            }
        );
        assert_eq!(w.gw.event_store.count().await.unwrap(), 2);

        let topics: Vec<_> = w
            .gw
            .event_store
            .events_for_device(&"D1".into(), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.provenance.source_topic)
            .collect();
        assert!(topics.contains(&"plant-7".to_string()));
        assert!(topics.contains(&TOPIC.to_string()));
    }

    #[tokio::test]
    async fn test_line_transport_gives_up_after_max_attempts() {
        let w = wired();
        w.gw.memory.as_ref().unwrap().set_unavailable(true);
        let reading = String::from_utf8(w.gw.d1_reading(&[("temperature", 23.5)])).unwrap();

        let (_tx, rx) = watch::channel(false);
        let stats = run_line_transport(
            format!("{reading}\n").as_bytes(),
            Arc::clone(&w.transport),
            options(2),
            rx,
        )
        .await
        .unwrap();

        assert_eq!(stats.abandoned, 1);
        assert!(w.dead_letters.is_empty());
    }
}
