use std::sync::Arc;
use std::time::Duration;
use tg_03_ingestion::{Disposition, IngestApi, TransportAdapter};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const REDELIVERY_BACKOFF: Duration = Duration::from_millis(100);

/// Split a line into `(topic, payload)`.
///
/// Returns `None` for blank lines.
pub fn parse_line<'a>(line: &'a str, default_topic: &'a str) -> Option<(&'a str, &'a str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    match line.split_once('\t') {
        Some((topic, payload)) if !topic.trim().is_empty() => Some((topic.trim(), payload)),
        Some((_, payload)) => Some((default_topic, payload)),
        None => Some((default_topic, line)),
    }
}

/// Line transport settings.
#[derive(Debug, Clone)]
pub struct LineTransportOptions {
    pub default_topic: String,
    /// Total attempts per delivery, first one included.
    pub max_attempts: u32,
    /// Deliveries allowed to wait on the worker pool at once.
    pub max_pending: usize,
}

/// Final dispositions of a transport run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub acked: u64,
    pub dead_lettered: u64,
    /// Gave up after `max_attempts` requeues.
    pub abandoned: u64,
}

impl TransportStats {
    fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Ack => self.acked += 1,
            Disposition::DeadLetter => self.dead_lettered += 1,
            Disposition::Requeue => self.abandoned += 1,
        }
    }
}

async fn deliver_with_redelivery<P: IngestApi + 'static>(
    transport: Arc<TransportAdapter<P>>,
    topic: String,
    payload: Vec<u8>,
    max_attempts: u32,
) -> Disposition {
    let mut attempt = 1;
    loop {
        let disposition = transport.deliver(&topic, &payload).await;
        if disposition != Disposition::Requeue
            || attempt >= max_attempts
            || transport.pool().is_shutting_down()
        {
            return disposition;
        }
        debug!(topic, attempt, "Redelivering");
        tokio::time::sleep(REDELIVERY_BACKOFF * attempt).await;
        attempt += 1;
    }
}

/// Feed lines from `reader` into `transport` until EOF or shutdown.
pub async fn run_line_transport<R, P>(
    reader: R,
    transport: Arc<TransportAdapter<P>>,
    options: LineTransportOptions,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<TransportStats>
where
    R: AsyncBufRead + Unpin,
    P: IngestApi + 'static,
{
    let mut lines = reader.lines();
    let mut pending = JoinSet::new();
    let mut stats = TransportStats::default();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.changed() => {
                info!("Line transport stopping");
                break;
            }
        };
        let Some(line) = line else {
            info!("Line transport reached end of input");
            break;
        };
        let Some((topic, payload)) = parse_line(&line, &options.default_topic) else {
            continue;
        };

        while pending.len() >= options.max_pending.max(1) {
            if let Some(result) = pending.join_next().await {
                record(&mut stats, result);
            }
        }
        pending.spawn(deliver_with_redelivery(
            Arc::clone(&transport),
            topic.to_string(),
            payload.as_bytes().to_vec(),
            options.max_attempts.max(1),
        ));
    }

    while let Some(result) = pending.join_next().await {
        record(&mut stats, result);
    }
    Ok(stats)
}

fn record(stats: &mut TransportStats, result: Result<Disposition, tokio::task::JoinError>) {
    match result {
        Ok(disposition) => stats.record(disposition),
        Err(err) => {
            warn!(error = %err, "Delivery task failed");
            stats.abandoned += 1;
        }
    }
}
