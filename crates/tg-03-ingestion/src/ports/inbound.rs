//! # Inbound Ports (Driving Ports / API)

use crate::domain::outcome::IngestOutcome;

/// Single entry point for one transport delivery.
///
/// Never fails at the call level: every problem is expressed as
/// `IngestOutcome::Rejected`.
#[async_trait::async_trait]
pub trait IngestApi: Send + Sync {
    /// Process the raw bytes delivered on `topic`.
    async fn ingest(&self, topic: &str, raw: &[u8]) -> IngestOutcome;
}
