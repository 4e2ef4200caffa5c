//! # Key Layout
//!
//! | Prefix | Value |
//! |--------|-------|
//! | `event:{event_id}` | bincode `EnrichedEvent` |
//! | `idem:{event_id}` | bincode `IdempotencyRecord` |
//! | `latest:all` | bincode `LatestPointer` |
//! | `latest:dev:{hex(device_id)}` | bincode `LatestPointer` |
//! | `devidx:{hex(device_id)}:{ordered_ms}:{event_id}` | empty |
//!
//! Device ids are hex-encoded inside keys so that no device id can be a
//! prefix of another's key range.

use shared_types::{DeviceId, EventId, Timestamp};

/// Prefix of all event keys.
pub const EVENT_PREFIX: &[u8] = b"event:";
/// Prefix of all idempotency keys.
pub const IDEMPOTENCY_PREFIX: &[u8] = b"idem:";
/// Newest event overall.
pub const LATEST_ALL_KEY: &[u8] = b"latest:all";

/// Key of a stored event.
pub fn event_key(id: &EventId) -> Vec<u8> {
    [EVENT_PREFIX, id.as_str().as_bytes()].concat()
}

/// Key of an idempotency record.
pub fn idempotency_key(id: &EventId) -> Vec<u8> {
    [IDEMPOTENCY_PREFIX, id.as_str().as_bytes()].concat()
}

/// Newest event of one device.
pub fn latest_device_key(device: &DeviceId) -> Vec<u8> {
    format!("latest:dev:{}", hex::encode(device.as_str())).into_bytes()
}

/// Prefix of one device's history index.
pub fn device_index_prefix(device: &DeviceId) -> Vec<u8> {
    format!("devidx:{}:", hex::encode(device.as_str())).into_bytes()
}

/// History index entry. Lexicographic key order equals ingest time order.
pub fn device_index_key(device: &DeviceId, at: Timestamp, id: &EventId) -> Vec<u8> {
    let mut key = device_index_prefix(device);
    key.extend_from_slice(format!("{:020}:{}", ordered_millis(at), id).as_bytes());
    key
}

/// Event id encoded at the end of a history index key.
pub fn event_id_from_index_key(key: &[u8]) -> Option<EventId> {
    let text = std::str::from_utf8(key).ok()?;
    let (_, id) = text.rsplit_once(':')?;
    Some(EventId::from_hex(id))
}

/// Event id encoded after a fixed prefix.
pub fn event_id_after_prefix(key: &[u8], prefix: &[u8]) -> Option<EventId> {
    let rest = key.strip_prefix(prefix)?;
    std::str::from_utf8(rest).ok().map(EventId::from_hex)
}

/// Millisecond timestamp mapped onto `u64` preserving order, including
/// instants before the epoch.
fn ordered_millis(at: Timestamp) -> u64 {
    (at.timestamp_millis() as u64) ^ (1 << 63)
}
