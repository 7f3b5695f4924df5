//! SQLite storage implementation for depreciation profiles, entries and run logs.

mod model;
mod repository;

pub use model::{AssetDB, DepreciationEntryDB, DepreciationProfileDB, MethodDB, RunLogDB};
pub use repository::DepreciationRepository;
