//! Database models for depreciation.
//!
//! Money is stored as decimal TEXT, dates as `YYYY-MM-DD` and timestamps as
//! ISO text with microseconds, so reading a row back can fail on bad data.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use assetbook_core::depreciation::{
    AssetBookValue, AssetError, DepreciationEntry, DepreciationProfile, DepreciationStatus,
    EntryType, MethodDefinition, PostingFrequency, RunLog, RunStatus,
};
use assetbook_core::errors::{Error, Result};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(value, DATE_FORMAT)?)
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)?)
}

fn parse_money(value: &str) -> Result<Decimal> {
    Ok(Decimal::from_str(value.trim())?)
}

/// Asset row; only the book-value columns are written by this crate.
#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AssetDB {
    pub id: String,
    pub tenant_id: i64,
    pub name: String,
    pub accumulated_depreciation: String,
    pub book_value: String,
    pub depreciation_status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<AssetDB> for AssetBookValue {
    type Error = Error;

    fn try_from(db: AssetDB) -> Result<Self> {
        Ok(Self {
            accumulated_depreciation: parse_money(&db.accumulated_depreciation)?,
            book_value: parse_money(&db.book_value)?,
            depreciation_status: DepreciationStatus::from_str(&db.depreciation_status)?,
            asset_id: db.id,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::depreciation_methods)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MethodDB {
    pub code: String,
    pub name: String,
    pub factor: Option<String>,
}

impl TryFrom<MethodDB> for MethodDefinition {
    type Error = Error;

    fn try_from(db: MethodDB) -> Result<Self> {
        Ok(Self {
            factor: db.factor.as_deref().map(parse_money).transpose()?,
            code: db.code,
            name: db.name,
        })
    }
}

#[derive(
    Queryable, Identifiable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::depreciation_profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct DepreciationProfileDB {
    pub id: String,
    pub tenant_id: i64,
    pub asset_id: String,
    pub method_code: String,
    pub cost_basis: String,
    pub salvage_value: String,
    pub useful_life_years: i32,
    pub useful_life_periods: i32,
    pub depreciation_start_date: String,
    pub frequency: String,
    pub prorate_first_period: bool,
    pub prorate_last_period: bool,
    pub switch_to_straight_line: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<DepreciationProfileDB> for DepreciationProfile {
    type Error = Error;

    fn try_from(db: DepreciationProfileDB) -> Result<Self> {
        Ok(Self {
            cost_basis: parse_money(&db.cost_basis)?,
            salvage_value: parse_money(&db.salvage_value)?,
            depreciation_start_date: parse_date(&db.depreciation_start_date)?,
            frequency: PostingFrequency::from_str(&db.frequency)?,
            id: db.id,
            tenant_id: db.tenant_id,
            asset_id: db.asset_id,
            method_code: db.method_code,
            useful_life_years: db.useful_life_years,
            useful_life_periods: db.useful_life_periods,
            prorate_first_period: db.prorate_first_period,
            prorate_last_period: db.prorate_last_period,
            switch_to_straight_line: db.switch_to_straight_line,
            is_active: db.is_active,
            is_deleted: db.is_deleted,
        })
    }
}

impl From<DepreciationProfile> for DepreciationProfileDB {
    fn from(domain: DepreciationProfile) -> Self {
        let now = format_timestamp(chrono::Utc::now().naive_utc());
        Self {
            id: domain.id,
            tenant_id: domain.tenant_id,
            asset_id: domain.asset_id,
            method_code: domain.method_code,
            cost_basis: domain.cost_basis.to_string(),
            salvage_value: domain.salvage_value.to_string(),
            useful_life_years: domain.useful_life_years,
            useful_life_periods: domain.useful_life_periods,
            depreciation_start_date: format_date(domain.depreciation_start_date),
            frequency: domain.frequency.as_str().to_string(),
            prorate_first_period: domain.prorate_first_period,
            prorate_last_period: domain.prorate_last_period,
            switch_to_straight_line: domain.switch_to_straight_line,
            is_active: domain.is_active,
            is_deleted: domain.is_deleted,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(
    Queryable, Identifiable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::depreciation_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct DepreciationEntryDB {
    pub id: String,
    pub profile_id: String,
    pub asset_id: String,
    pub period_start: String,
    pub period_end: String,
    pub depreciation_amount: String,
    pub accumulated_depreciation: String,
    pub book_value: String,
    pub entry_type: String,
    pub posted: bool,
    pub created_at: String,
}

impl DepreciationEntryDB {
    pub fn from_domain(entry: DepreciationEntry, created_at: NaiveDateTime) -> Self {
        Self {
            id: entry.id,
            profile_id: entry.profile_id,
            asset_id: entry.asset_id,
            period_start: format_date(entry.period_start),
            period_end: format_date(entry.period_end),
            depreciation_amount: entry.depreciation_amount.to_string(),
            accumulated_depreciation: entry.accumulated_depreciation.to_string(),
            book_value: entry.book_value.to_string(),
            entry_type: entry.entry_type.as_str().to_string(),
            posted: entry.posted,
            created_at: format_timestamp(created_at),
        }
    }
}

impl TryFrom<DepreciationEntryDB> for DepreciationEntry {
    type Error = Error;

    fn try_from(db: DepreciationEntryDB) -> Result<Self> {
        Ok(Self {
            period_start: parse_date(&db.period_start)?,
            period_end: parse_date(&db.period_end)?,
            depreciation_amount: parse_money(&db.depreciation_amount)?,
            accumulated_depreciation: parse_money(&db.accumulated_depreciation)?,
            book_value: parse_money(&db.book_value)?,
            entry_type: EntryType::from_str(&db.entry_type)?,
            id: db.id,
            profile_id: db.profile_id,
            asset_id: db.asset_id,
            posted: db.posted,
        })
    }
}

/// Run log row. Per-asset errors are kept as a JSON array.
#[derive(Queryable, Identifiable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::depreciation_run_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RunLogDB {
    pub id: String,
    pub tenant_id: i64,
    pub period_start: String,
    pub period_end: String,
    pub status: String,
    pub entries_created: i64,
    pub errors: String,
    pub error: Option<String>,
    pub created_at: String,
}

impl TryFrom<RunLog> for RunLogDB {
    type Error = Error;

    fn try_from(domain: RunLog) -> Result<Self> {
        Ok(Self {
            errors: serde_json::to_string(&domain.errors)?,
            id: domain.id,
            tenant_id: domain.tenant_id,
            period_start: format_date(domain.period_start),
            period_end: format_date(domain.period_end),
            status: domain.status.as_str().to_string(),
            entries_created: domain.entries_created,
            error: domain.error,
            created_at: format_timestamp(domain.created_at),
        })
    }
}

impl TryFrom<RunLogDB> for RunLog {
    type Error = Error;

    fn try_from(db: RunLogDB) -> Result<Self> {
        let errors: Vec<AssetError> = serde_json::from_str(&db.errors)?;
        Ok(Self {
            period_start: parse_date(&db.period_start)?,
            period_end: parse_date(&db.period_end)?,
            status: RunStatus::from_str(&db.status)?,
            created_at: parse_timestamp(&db.created_at)?,
            id: db.id,
            tenant_id: db.tenant_id,
            entries_created: db.entries_created,
            errors,
            error: db.error,
        })
    }
}
