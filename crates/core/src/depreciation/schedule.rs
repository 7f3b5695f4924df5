//! Schedule calculator: turns a profile and its ledger position into the next entry.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::MONEY_DECIMAL_PRECISION;
use crate::utils::time_utils::{days_between, month_ordinal};

use super::depreciation_errors::DepreciationError;
use super::depreciation_model::{
    DepreciationEntry, DepreciationPeriod, DepreciationProfile, EntryType,
};
use super::idempotency::compute_entry_id;
use super::methods::{compute_period_amount, validate_profile, DepreciationMethod};

/// Result of scheduling one profile for one period.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    Scheduled(DepreciationEntry),
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Book value already sits at salvage.
    FullyDepreciated,
    /// The period ends before depreciation starts.
    NotYetInService,
    /// The run window is not one posting period of the profile's frequency.
    FrequencyMismatch,
}

/// Rounds a money amount to two decimals, half-to-even.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMAL_PRECISION, RoundingStrategy::MidpointNearestEven)
}

/// 0-based index of `period` counted in posting periods from the start date.
///
/// Returns `None` when the period ends on or before the depreciation start.
pub fn period_index(profile: &DepreciationProfile, period: &DepreciationPeriod) -> Option<u32> {
    let start = profile.depreciation_start_date;
    if period.end <= start {
        return None;
    }
    if period.start <= start {
        return Some(0);
    }
    let months_per_period = i64::from(profile.frequency.months_per_period());
    let elapsed_months = month_ordinal(period.start) - month_ordinal(start);
    // Ceiling: a period opening after the start date is at least the second one.
    let index = (elapsed_months + months_per_period - 1) / months_per_period;
    u32::try_from(index.max(1)).ok()
}

/// Share of `period` during which the asset is depreciating, after proration flags.
fn proration_factor(
    profile: &DepreciationProfile,
    period: &DepreciationPeriod,
    life_end: NaiveDate,
) -> Decimal {
    let period_days = period.days();
    if period_days <= 0 {
        return Decimal::ONE;
    }
    let total = Decimal::from(period_days);
    let mut factor = Decimal::ONE;

    let start = profile.depreciation_start_date;
    if profile.prorate_first_period && start > period.start && start < period.end {
        factor *= Decimal::from(days_between(start, period.end)) / total;
    }
    if profile.prorate_last_period && life_end > period.start && life_end < period.end {
        factor *= Decimal::from(days_between(period.start, life_end)) / total;
    }
    factor
}

/// Computes the entry that follows `last_accumulated` for `period`.
pub fn next_entry(
    profile: &DepreciationProfile,
    method: &DepreciationMethod,
    last_accumulated: Decimal,
    period: &DepreciationPeriod,
    posted: bool,
) -> Result<ScheduleOutcome, DepreciationError> {
    validate_profile(profile, method)?;

    if !period.spans(profile.frequency) {
        return Ok(ScheduleOutcome::Skip(SkipReason::FrequencyMismatch));
    }

    let book_value = profile.cost_basis - last_accumulated;
    let remaining = book_value - profile.salvage_value;
    if remaining <= Decimal::ZERO {
        return Ok(ScheduleOutcome::Skip(SkipReason::FullyDepreciated));
    }

    let Some(index) = period_index(profile, period) else {
        return Ok(ScheduleOutcome::Skip(SkipReason::NotYetInService));
    };

    let life_end = profile.useful_life_end().ok_or_else(|| {
        DepreciationError::InvalidProfile(format!(
            "useful life of {} periods overflows the calendar",
            profile.useful_life_periods
        ))
    })?;

    let raw_amount = if period.start >= life_end {
        // Useful life is over; post whatever is left in one go.
        remaining
    } else {
        compute_period_amount(method, profile, index, last_accumulated)?
            * proration_factor(profile, period, life_end)
    };

    // Cap after rounding so the floor holds to the cent.
    let amount = round_money(raw_amount).min(remaining).max(Decimal::ZERO);
    let accumulated_depreciation = last_accumulated + amount;
    let new_book_value = profile.cost_basis - accumulated_depreciation;

    Ok(ScheduleOutcome::Scheduled(DepreciationEntry {
        id: compute_entry_id(&profile.id, period, EntryType::Normal),
        profile_id: profile.id.clone(),
        asset_id: profile.asset_id.clone(),
        period_start: period.start,
        period_end: period.end,
        depreciation_amount: amount,
        accumulated_depreciation,
        book_value: new_book_value,
        entry_type: EntryType::Normal,
        posted,
    }))
}
