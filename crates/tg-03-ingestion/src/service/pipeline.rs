//! # Ingestion Pipeline
//!
//! One pass per delivery, in fixed order:
//!
//! ```text
//! parse -> authenticate -> decrypt -> validate -> enrich
//!       -> reserve -> save -> commit -> fan-out
//! ```
//!
//! Every collaborator call is bounded by the stage timeout. A rejection
//! before `reserve` leaves no trace in storage. After a `Fresh`
//! reservation the pipeline either stores the event or releases the
//! reservation. A release can itself fail, so a held reservation is only
//! reported as a duplicate once the event store confirms the event;
//! otherwise the delivery is rejected as transient and retried.

use crate::adapters::LoggingAlertSink;
use crate::config::IngestionConfig;
use crate::domain::cipher::{KeySlot, PayloadCipher};
use crate::domain::enrichment::Enricher;
use crate::domain::outcome::{IngestError, IngestOutcome, Stage};
use crate::domain::validation::{PayloadValidator, ValidationError};
use crate::ports::inbound::IngestApi;
use crate::ports::outbound::{AlertSink, EventPublisher, PublishError};
use crate::service::monitor::DecryptFailureMonitor;
use async_trait::async_trait;
use gateway_telemetry::{StageTimer, DECRYPT_FAILURES, FANOUT_FAILURES, INGEST_OUTCOMES};
use shared_types::{
    DeviceId, DeviceMessage, EnrichedEvent, EventId, TelemetryPayload, TimeSource, Timestamp,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tg_01_device_trust::DeviceAuthenticatorApi;
use tg_02_event_store::{EventStore, IdempotencyGuard, ReserveOutcome, StoreError};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Collaborators injected into the pipeline.
pub struct IngestionDependencies<A, E, G> {
    pub authenticator: Arc<A>,
    pub event_store: Arc<E>,
    pub idempotency: Arc<G>,
    pub time_source: Arc<dyn TimeSource>,
}

/// The ingestion pipeline.
pub struct IngestionPipeline<A, E, G>
where
    A: DeviceAuthenticatorApi,
    E: EventStore,
    G: IdempotencyGuard,
{
    authenticator: Arc<A>,
    event_store: Arc<E>,
    idempotency: Arc<G>,
    time_source: Arc<dyn TimeSource>,
    cipher: PayloadCipher,
    validator: PayloadValidator,
    enricher: Enricher,
    stage_timeout: Duration,
    monitor: DecryptFailureMonitor,
    alert_sink: Arc<dyn AlertSink>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl<A, E, G> IngestionPipeline<A, E, G>
where
    A: DeviceAuthenticatorApi,
    E: EventStore,
    G: IdempotencyGuard,
{
    /// Build a pipeline. Alerts go to the log until `with_alert_sink` is
    /// called; no downstream fan-out until `with_publisher` is called.
    pub fn new(config: &IngestionConfig, deps: IngestionDependencies<A, E, G>) -> Self {
        Self {
            authenticator: deps.authenticator,
            event_store: deps.event_store,
            idempotency: deps.idempotency,
            time_source: deps.time_source,
            cipher: PayloadCipher::new(config.key_rotation_grace()),
            validator: PayloadValidator::from_config(config),
            enricher: Enricher::new(config.dedup_bucket_secs),
            stage_timeout: config.stage_timeout(),
            monitor: DecryptFailureMonitor::new(config.alert_threshold, config.alert_window()),
            alert_sink: Arc::new(LoggingAlertSink),
            publisher: None,
        }
    }

    /// Republish accepted events.
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Route security alerts to `sink`.
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = sink;
        self
    }

    pub fn event_store(&self) -> &Arc<E> {
        &self.event_store
    }

    pub fn idempotency(&self) -> &Arc<G> {
        &self.idempotency
    }

    async fn bounded<T, F>(&self, stage: Stage, call: F) -> Result<T, IngestError>
    where
        F: Future<Output = T>,
    {
        let _timer = StageTimer::start(stage.as_str());
        tokio::time::timeout(self.stage_timeout, call)
            .await
            .map_err(|_| IngestError::Timeout { stage })
    }

    async fn process(&self, topic: &str, raw: &[u8]) -> Result<IngestOutcome, IngestError> {
        let message = {
            let _timer = StageTimer::start(Stage::Parse.as_str());
            DeviceMessage::parse(raw)?
        };
        Span::current().record("device_id", message.device_id.as_str());

        let credential = self
            .bounded(
                Stage::Authenticate,
                self.authenticator.authenticate(&message.device_id),
            )
            .await??;

        let now = self.time_source.now();
        let now_ms = self.time_source.monotonic_ms();

        let plaintext = {
            let _timer = StageTimer::start(Stage::Decrypt.as_str());
            self.cipher
                .open(&message.encrypted_payload, &credential, now)
        };
        let plaintext = match plaintext {
            Ok((plaintext, KeySlot::Current)) => plaintext,
            Ok((plaintext, KeySlot::Previous)) => {
                debug!("Payload opened with the retired key");
                plaintext
            }
            Err(failure) => {
                self.on_decrypt_failure(&message.device_id, now, now_ms).await;
                return Err(IngestError::DecryptionFailure {
                    device_id: message.device_id,
                    detail: failure.to_string(),
                });
            }
        };

        let validated = {
            let _timer = StageTimer::start(Stage::Validate.as_str());
            let payload =
                TelemetryPayload::from_json_bytes(&plaintext).map_err(ValidationError::from)?;
            self.validator.validate(&payload, now)?
        };

        let event = {
            let _timer = StageTimer::start(Stage::Enrich.as_str());
            self.enricher.enrich(validated, &message, topic, now, now_ms)
        };
        let event_id = event.event_id.clone();
        Span::current().record("event_id", event_id.as_str());

        let reservation = match self
            .bounded(Stage::Reserve, self.idempotency.check_and_reserve(&event_id))
            .await
        {
            Ok(reservation) => reservation?,
            Err(timeout) => {
                // The claim may have landed after we stopped waiting. The
                // store key still rejects a second copy if this drops a
                // claim held by another delivery.
                self.release(&event_id).await;
                return Err(timeout);
            }
        };
        match reservation {
            ReserveOutcome::Fresh => {}
            ReserveOutcome::AlreadySeen => return Ok(IngestOutcome::Duplicate(event_id)),
            ReserveOutcome::InFlight => return self.settle_in_flight(event_id).await,
        }

        match self
            .bounded(Stage::Save, self.event_store.save(&event))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(StoreError::DuplicateKey(_))) => {
                self.commit(&event_id).await;
                return Ok(IngestOutcome::Duplicate(event_id));
            }
            Ok(Err(err)) => {
                self.release(&event_id).await;
                return Err(err.into());
            }
            Err(timeout) => {
                self.release(&event_id).await;
                return Err(timeout);
            }
        }

        self.commit(&event_id).await;
        self.fan_out(&event).await;
        Ok(IngestOutcome::Accepted(event_id))
    }

    async fn on_decrypt_failure(&self, device_id: &DeviceId, now: Timestamp, now_ms: u64) {
        DECRYPT_FAILURES.inc();
        if let Some(alert) = self.monitor.record_failure(device_id, now, now_ms) {
            self.alert_sink.raise(&alert).await;
        }
    }

    /// Another delivery holds an uncommitted claim. Only a stored event
    /// makes this a duplicate; otherwise the broker has to retry.
    async fn settle_in_flight(&self, event_id: EventId) -> Result<IngestOutcome, IngestError> {
        let stored = self
            .bounded(Stage::Reserve, self.event_store.exists(&event_id))
            .await??;
        if stored {
            self.commit(&event_id).await;
            Ok(IngestOutcome::Duplicate(event_id))
        } else {
            debug!("Reservation held without a stored event");
            Err(IngestError::InFlight(event_id))
        }
    }

    // The event is already durable; a failed commit leaves a reservation
    // that `settle_in_flight` or the TTL resolves.
    async fn commit(&self, event_id: &EventId) {
        let committed = self
            .bounded(Stage::Commit, self.idempotency.commit(event_id))
            .await
            .and_then(|result| result.map_err(IngestError::from));
        if let Err(err) = committed {
            warn!(error = %err, "Idempotency commit failed");
        }
    }

    async fn release(&self, event_id: &EventId) {
        let released = self
            .bounded(Stage::Release, self.idempotency.release(event_id))
            .await
            .and_then(|result| result.map_err(IngestError::from));
        if let Err(err) = released {
            warn!(error = %err, "Reservation release failed; awaiting TTL");
        }
    }

    async fn fan_out(&self, event: &EnrichedEvent) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let failure = match self.bounded(Stage::Publish, publisher.publish(event)).await {
            Ok(Ok(_)) => return,
            Ok(Err(PublishError::NoSubscribers)) => {
                debug!("No downstream subscribers");
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(timeout) => timeout.to_string(),
        };
        FANOUT_FAILURES.inc();
        warn!(error = %failure, "Downstream republish failed");
    }

    fn report(outcome: &IngestOutcome) {
        let kind = outcome.rejection_kind().map_or("none", |k| k.as_str());
        INGEST_OUTCOMES
            .with_label_values(&[outcome.label(), kind])
            .inc();

        match outcome {
            IngestOutcome::Accepted(id) => info!(event_id = %id, "Event accepted"),
            IngestOutcome::Duplicate(id) => debug!(event_id = %id, "Duplicate delivery"),
            IngestOutcome::Rejected(err) if err.is_transient() => {
                error!(kind = %err.kind(), detail = %err, "Delivery rejected (transient)")
            }
            IngestOutcome::Rejected(err) => {
                warn!(kind = %err.kind(), detail = %err, "Delivery rejected")
            }
        }
    }
}

#[async_trait]
impl<A, E, G> IngestApi for IngestionPipeline<A, E, G>
where
    A: DeviceAuthenticatorApi,
    E: EventStore,
    G: IdempotencyGuard,
{
    async fn ingest(&self, topic: &str, raw: &[u8]) -> IngestOutcome {
        let span = info_span!(
            "ingest",
            topic = %topic,
            device_id = tracing::field::Empty,
            event_id = tracing::field::Empty,
        );
        async {
            let outcome = self
                .process(topic, raw)
                .await
                .unwrap_or_else(IngestOutcome::Rejected);
            Self::report(&outcome);
            outcome
        }
        .instrument(span)
        .await
    }
}
