//! Assetbook Core - depreciation domain entities, services, and traits.
//!
//! This crate contains the depreciation engine: the method library, the
//! schedule calculator, the run orchestrator and the ledger writer.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod constants;
pub mod depreciation;
pub mod errors;
pub mod utils;

pub use depreciation::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
