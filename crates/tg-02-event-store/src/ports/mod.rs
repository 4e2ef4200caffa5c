//! Ports layer for the event store.

pub mod inbound;
pub mod outbound;
