//! Depreciation module - method library, schedule calculator, run orchestrator
//! and ledger writer.

mod depreciation_constants;
mod depreciation_errors;
mod depreciation_model;
mod depreciation_service;
mod depreciation_traits;
mod idempotency;
mod ledger_writer;
mod methods;
mod schedule;


// Re-export the public interface
pub use depreciation_constants::*;
pub use depreciation_errors::{AssetErrorKind, DepreciationError};
pub use depreciation_model::{
    AssetBookValue, AssetError, DepreciationEntry, DepreciationPeriod, DepreciationProfile,
    DepreciationStatus, EntryType, MethodDefinition, NewAdjustment, Posting, PostingBatch,
    PostingFrequency, RunLog, RunOutput, RunResult, RunSettings, RunStatus,
};
pub use depreciation_service::DepreciationService;
pub use depreciation_traits::{DepreciationRepositoryTrait, DepreciationServiceTrait};
pub use idempotency::compute_entry_id;
pub use ledger_writer::LedgerWriter;
pub use methods::{compute_period_amount, validate_profile, DepreciationMethod};
pub use schedule::{next_entry, period_index, round_money, ScheduleOutcome, SkipReason};
