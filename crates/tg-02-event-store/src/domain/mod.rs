//! Domain layer for the event store.

pub mod entities;
pub mod errors;
pub mod keys;
