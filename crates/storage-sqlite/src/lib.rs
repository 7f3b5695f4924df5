//! SQLite storage implementation for Assetbook.
//!
//! This crate is the only place where Diesel is used. It implements the
//! repository traits defined in `assetbook-core` and contains:
//! - Connection pooling and the single-writer actor
//! - Embedded Diesel migrations
//! - The depreciation repository and its row models
//!
//! ```text
//! core (domain) ──► storage-sqlite (this crate) ──► SQLite DB
//! ```

pub mod db;
pub mod depreciation;
pub mod errors;
pub mod schema;

pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};
pub use depreciation::DepreciationRepository;

pub use errors::{IntoCore, StorageError};

// Re-export from assetbook-core for convenience
pub use assetbook_core::errors::{DatabaseError, Error, Result};
