//! Ports layer for device trust.

pub mod inbound;
pub mod outbound;
