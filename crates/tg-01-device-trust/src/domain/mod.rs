//! Domain layer for device trust.

pub mod entities;
pub mod errors;
