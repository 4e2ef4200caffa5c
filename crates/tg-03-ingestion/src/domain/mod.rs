//! Domain layer for ingestion: the pure stages and the outcome taxonomy.

pub mod alerts;
pub mod cipher;
pub mod enrichment;
pub mod outcome;
pub mod validation;
