//! Depreciation domain models.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENCY};
use crate::errors::{Error, Result, ValidationError};
use crate::utils::time_utils::{add_months, days_between, period_start_containing};

use super::depreciation_errors::{AssetErrorKind, DepreciationError};

/// How often a profile is posted to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostingFrequency {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl PostingFrequency {
    pub fn months_per_period(&self) -> u32 {
        match self {
            PostingFrequency::Monthly => 1,
            PostingFrequency::Quarterly => 3,
            PostingFrequency::Annual => 12,
        }
    }

    pub fn periods_per_year(&self) -> u32 {
        12 / self.months_per_period()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostingFrequency::Monthly => "monthly",
            PostingFrequency::Quarterly => "quarterly",
            PostingFrequency::Annual => "annual",
        }
    }
}

impl FromStr for PostingFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(PostingFrequency::Monthly),
            "quarterly" => Ok(PostingFrequency::Quarterly),
            "annual" | "annually" | "yearly" => Ok(PostingFrequency::Annual),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown posting frequency '{}'",
                other
            )))),
        }
    }
}

/// Depreciation configuration for one asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepreciationProfile {
    pub id: String,
    pub tenant_id: i64,
    pub asset_id: String,
    pub method_code: String,
    pub cost_basis: Decimal,
    pub salvage_value: Decimal,
    pub useful_life_years: i32,
    pub useful_life_periods: i32,
    pub depreciation_start_date: NaiveDate,
    pub frequency: PostingFrequency,
    pub prorate_first_period: bool,
    pub prorate_last_period: bool,
    /// Lets declining-balance fall over to straight-line once that yields more.
    pub switch_to_straight_line: bool,
    pub is_active: bool,
    pub is_deleted: bool,
}

impl DepreciationProfile {
    pub fn depreciable_base(&self) -> Decimal {
        self.cost_basis - self.salvage_value
    }

    /// Exclusive end of the useful life, counted from the start date.
    pub fn useful_life_end(&self) -> Option<NaiveDate> {
        let periods = u32::try_from(self.useful_life_periods).ok()?;
        let months = periods.checked_mul(self.frequency.months_per_period())?;
        add_months(self.depreciation_start_date, months)
    }
}

/// Method reference data as stored: a code plus optional parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodDefinition {
    pub code: String,
    pub name: String,
    pub factor: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[default]
    Normal,
    Adjustment,
    Correction,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Normal => "normal",
            EntryType::Adjustment => "adjustment",
            EntryType::Correction => "correction",
        }
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(EntryType::Normal),
            "adjustment" => Ok(EntryType::Adjustment),
            "correction" => Ok(EntryType::Correction),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown entry type '{}'",
                other
            )))),
        }
    }
}

/// Half-open posting window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepreciationPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DepreciationPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Period start {} must be before period end {}",
                start, end
            ))));
        }
        Ok(Self { start, end })
    }

    /// The calendar period of the given frequency that contains `date`.
    pub fn containing(date: NaiveDate, frequency: PostingFrequency) -> Result<Self> {
        let months = frequency.months_per_period();
        let start = period_start_containing(date, months)
            .ok_or_else(|| invalid_date(date))?;
        let end = add_months(start, months).ok_or_else(|| invalid_date(date))?;
        Self::new(start, end)
    }

    pub fn days(&self) -> i64 {
        days_between(self.start, self.end)
    }

    /// Whether the window is exactly one posting period of `frequency`.
    pub fn spans(&self, frequency: PostingFrequency) -> bool {
        add_months(self.start, frequency.months_per_period()) == Some(self.end)
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start < end && start < self.end
    }
}

impl fmt::Display for DepreciationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

fn invalid_date(date: NaiveDate) -> Error {
    Error::Validation(ValidationError::InvalidInput(format!(
        "Date {} is out of range",
        date
    )))
}

/// One ledger line for a profile and period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepreciationEntry {
    pub id: String,
    pub profile_id: String,
    pub asset_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub depreciation_amount: Decimal,
    pub accumulated_depreciation: Decimal,
    pub book_value: Decimal,
    pub entry_type: EntryType,
    pub posted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationStatus {
    #[default]
    Active,
    FullyDepreciated,
}

impl DepreciationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepreciationStatus::Active => "active",
            DepreciationStatus::FullyDepreciated => "fully_depreciated",
        }
    }
}

impl FromStr for DepreciationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(DepreciationStatus::Active),
            "fully_depreciated" => Ok(DepreciationStatus::FullyDepreciated),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown depreciation status '{}'",
                other
            )))),
        }
    }
}

/// Denormalized book-value snapshot kept on the asset record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetBookValue {
    pub asset_id: String,
    pub accumulated_depreciation: Decimal,
    pub book_value: Decimal,
    pub depreciation_status: DepreciationStatus,
}

impl AssetBookValue {
    /// Snapshot implied by a freshly posted entry.
    pub fn after_entry(entry: &DepreciationEntry, salvage_value: Decimal) -> Self {
        let depreciation_status = if entry.book_value <= salvage_value {
            DepreciationStatus::FullyDepreciated
        } else {
            DepreciationStatus::Active
        };
        Self {
            asset_id: entry.asset_id.clone(),
            accumulated_depreciation: entry.accumulated_depreciation,
            book_value: entry.book_value,
            depreciation_status,
        }
    }

    pub fn is_fully_depreciated(&self) -> bool {
        self.depreciation_status == DepreciationStatus::FullyDepreciated
    }
}

/// A computed entry paired with what the ledger writer needs to post it.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub entry: DepreciationEntry,
    pub salvage_value: Decimal,
}

/// Everything written in one ledger transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostingBatch {
    pub entries: Vec<DepreciationEntry>,
    pub book_values: Vec<AssetBookValue>,
    /// Profiles that reached salvage and stop being picked up by future runs.
    pub deactivate_profile_ids: Vec<String>,
}

impl PostingBatch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-asset failure collected by a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetError {
    pub profile_id: String,
    pub asset_id: String,
    pub error_kind: AssetErrorKind,
    pub error: String,
}

impl AssetError {
    /// `None` for errors that are never reported, such as an already posted period.
    pub fn new(profile: &DepreciationProfile, error: &DepreciationError) -> Option<Self> {
        Some(Self {
            profile_id: profile.id.clone(),
            asset_id: profile.asset_id.clone(),
            error_kind: error.kind()?,
            error: error.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Success,
    PartialSuccess,
    Failed,
}

impl RunStatus {
    pub fn classify(entries: usize, errors: usize) -> Self {
        match (entries, errors) {
            (_, 0) => RunStatus::Success,
            (0, _) => RunStatus::Failed,
            _ => RunStatus::PartialSuccess,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::PartialSuccess => "partial_success",
            RunStatus::Failed => "failed",
        }
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(RunStatus::Success),
            "partial_success" => Ok(RunStatus::PartialSuccess),
            "failed" => Ok(RunStatus::Failed),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown run status '{}'",
                other
            )))),
        }
    }
}

/// Audit record of one committed run attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunLog {
    pub id: String,
    pub tenant_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: RunStatus,
    pub entries_created: i64,
    pub errors: Vec<AssetError>,
    /// Run-level failure, e.g. the storage error that aborted the commit.
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Outcome of `run`, covering dry runs and committed runs alike.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub tenant_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub dry_run: bool,
    pub status: RunStatus,
    pub entries: Vec<DepreciationEntry>,
    pub errors: Vec<AssetError>,
    pub failure: Option<String>,
    pub run_log: Option<RunLog>,
}

impl RunResult {
    pub fn entries_created(&self) -> usize {
        if self.dry_run {
            0
        } else {
            self.entries.len()
        }
    }

    /// Caller-facing shape: a preview for dry runs, a summary otherwise.
    pub fn output(&self) -> RunOutput {
        if self.dry_run {
            RunOutput::Preview {
                preview: self.entries.clone(),
                errors: self.errors.clone(),
            }
        } else {
            RunOutput::Committed {
                success: self.status != RunStatus::Failed,
                entries_created: self.entries_created(),
                errors: self.errors.clone(),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum RunOutput {
    Preview {
        preview: Vec<DepreciationEntry>,
        errors: Vec<AssetError>,
    },
    Committed {
        success: bool,
        entries_created: usize,
        errors: Vec<AssetError>,
    },
}

/// Input for a manual adjustment or correction entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAdjustment {
    pub profile_id: String,
    pub entry_type: EntryType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub amount: Decimal,
}

/// Tunables for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}
