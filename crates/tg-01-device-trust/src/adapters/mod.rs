//! Adapters for device trust.

pub mod file;
pub mod memory;
