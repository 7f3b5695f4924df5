use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;

use super::depreciation_model::{
    AssetBookValue, DepreciationEntry, DepreciationPeriod, DepreciationProfile, MethodDefinition,
    NewAdjustment, PostingBatch, RunLog, RunResult,
};

/// Trait for depreciation storage operations.
///
/// Reads used inside a run are async so the orchestrator can bound them with a
/// timeout.
#[async_trait]
pub trait DepreciationRepositoryTrait: Send + Sync {
    /// Profiles of a tenant that are active and not soft-deleted.
    async fn load_active_profiles(&self, tenant_id: i64) -> Result<Vec<DepreciationProfile>>;
    async fn load_methods(&self) -> Result<Vec<MethodDefinition>>;
    async fn get_profile(&self, profile_id: &str) -> Result<DepreciationProfile>;
    /// Most recently written posted entry of any type; the head of the accumulated chain.
    async fn latest_posted_entry(&self, profile_id: &str) -> Result<Option<DepreciationEntry>>;
    /// Whether a normal entry overlapping `period` already exists.
    async fn has_normal_entry_for_period(
        &self,
        profile_id: &str,
        period: &DepreciationPeriod,
    ) -> Result<bool>;
    /// Whether a normal entry starts on or after `date`.
    async fn has_normal_entry_after(&self, profile_id: &str, date: NaiveDate) -> Result<bool>;
    /// Writes the whole batch in one transaction; returns the number of entries written.
    async fn commit_postings(&self, batch: PostingBatch) -> Result<usize>;
    async fn insert_run_log(&self, run_log: RunLog) -> Result<RunLog>;
    fn get_entries(&self, profile_id: &str) -> Result<Vec<DepreciationEntry>>;
    fn get_asset_book_value(&self, asset_id: &str) -> Result<Option<AssetBookValue>>;
    fn get_run_logs(&self, tenant_id: i64, limit: i64) -> Result<Vec<RunLog>>;
}

/// Trait for depreciation service operations
#[async_trait]
pub trait DepreciationServiceTrait: Send + Sync {
    /// Runs depreciation for every active profile of a tenant over `[period_start, period_end)`.
    ///
    /// Never fails: every failure mode is reported in the returned result.
    async fn run(
        &self,
        tenant_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
        dry_run: bool,
    ) -> RunResult;
    async fn post_adjustment(&self, adjustment: NewAdjustment) -> Result<DepreciationEntry>;
    fn get_entries(&self, profile_id: &str) -> Result<Vec<DepreciationEntry>>;
    fn get_asset_book_value(&self, asset_id: &str) -> Result<Option<AssetBookValue>>;
    fn get_run_logs(&self, tenant_id: i64, limit: Option<i64>) -> Result<Vec<RunLog>>;
}
