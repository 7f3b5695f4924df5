//! Depreciation method library.
//!
//! Pure per-period formulas. Amounts are returned unrounded; the schedule
//! calculator caps and rounds them once when it builds the entry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DECLINING_BALANCE_FACTOR, MONEY_DECIMAL_PRECISION};

use super::depreciation_constants::{
    METHOD_DECLINING_BALANCE, METHOD_DOUBLE_DECLINING_BALANCE, METHOD_STRAIGHT_LINE,
    METHOD_SUM_OF_YEARS_DIGITS,
};
use super::depreciation_errors::DepreciationError;
use super::depreciation_model::{DepreciationProfile, MethodDefinition};

/// Supported amortization methods with their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
    DecliningBalance { factor: Decimal },
    SumOfYearsDigits,
}

impl DepreciationMethod {
    /// Resolves stored reference data into a method.
    pub fn resolve(definition: &MethodDefinition) -> Result<Self, DepreciationError> {
        match definition.code.as_str() {
            METHOD_STRAIGHT_LINE => Ok(DepreciationMethod::StraightLine),
            METHOD_DECLINING_BALANCE | METHOD_DOUBLE_DECLINING_BALANCE => {
                let factor = match definition.factor {
                    Some(factor) => factor,
                    None => default_declining_factor()?,
                };
                if factor <= Decimal::ZERO {
                    return Err(DepreciationError::InvalidProfile(format!(
                        "declining-balance factor must be positive, got {}",
                        factor
                    )));
                }
                Ok(DepreciationMethod::DecliningBalance { factor })
            }
            METHOD_SUM_OF_YEARS_DIGITS => Ok(DepreciationMethod::SumOfYearsDigits),
            other => Err(DepreciationError::UnsupportedMethod(other.to_string())),
        }
    }

    pub fn uses_years(&self) -> bool {
        !matches!(self, DepreciationMethod::StraightLine)
    }
}

fn default_declining_factor() -> Result<Decimal, DepreciationError> {
    DEFAULT_DECLINING_BALANCE_FACTOR
        .parse::<Decimal>()
        .map_err(|e| DepreciationError::InvalidProfile(e.to_string()))
}

/// Checks the cost, salvage and life configuration of a profile.
pub fn validate_profile(
    profile: &DepreciationProfile,
    method: &DepreciationMethod,
) -> Result<(), DepreciationError> {
    if profile.useful_life_periods <= 0 {
        return Err(DepreciationError::InvalidProfile(format!(
            "useful life must span at least one period, got {}",
            profile.useful_life_periods
        )));
    }
    if method.uses_years() && profile.useful_life_years <= 0 {
        return Err(DepreciationError::InvalidProfile(format!(
            "useful life must span at least one year, got {}",
            profile.useful_life_years
        )));
    }
    if profile.cost_basis < Decimal::ZERO || profile.salvage_value < Decimal::ZERO {
        return Err(DepreciationError::InvalidProfile(format!(
            "cost basis {} and salvage value {} must not be negative",
            profile.cost_basis, profile.salvage_value
        )));
    }
    if profile.cost_basis < profile.salvage_value {
        return Err(DepreciationError::InvalidProfile(format!(
            "cost basis {} is below salvage value {}",
            profile.cost_basis, profile.salvage_value
        )));
    }
    // Entries are posted in whole cents, so the base must be too.
    for (field, value) in [
        ("cost basis", profile.cost_basis),
        ("salvage value", profile.salvage_value),
    ] {
        if value.normalize().scale() > MONEY_DECIMAL_PRECISION {
            return Err(DepreciationError::InvalidProfile(format!(
                "{} {} has more than {} decimal places",
                field, value, MONEY_DECIMAL_PRECISION
            )));
        }
    }
    Ok(())
}

/// Raw depreciation for the period at `period_index` (0-based from the start date).
///
/// `current_accumulated` is the accumulated depreciation before this period.
pub fn compute_period_amount(
    method: &DepreciationMethod,
    profile: &DepreciationProfile,
    period_index: u32,
    current_accumulated: Decimal,
) -> Result<Decimal, DepreciationError> {
    validate_profile(profile, method)?;

    let periods_per_year = Decimal::from(profile.frequency.periods_per_year());

    let amount = match method {
        DepreciationMethod::StraightLine => straight_line(profile),
        DepreciationMethod::DecliningBalance { factor } => {
            let book_value = profile.cost_basis - current_accumulated;
            // rate = factor / years, applied per period
            let declining = book_value * *factor
                / Decimal::from(profile.useful_life_years)
                / periods_per_year;

            let remaining_periods = i64::from(profile.useful_life_periods) - i64::from(period_index);
            if profile.switch_to_straight_line && remaining_periods > 0 {
                let straight =
                    (book_value - profile.salvage_value) / Decimal::from(remaining_periods);
                declining.max(straight)
            } else {
                declining
            }
        }
        DepreciationMethod::SumOfYearsDigits => {
            let total_years = i64::from(profile.useful_life_years);
            let year = (i64::from(period_index) / i64::from(profile.frequency.periods_per_year())
                + 1)
                .min(total_years);
            let digits_sum = Decimal::from(total_years * (total_years + 1) / 2);
            profile.depreciable_base() * Decimal::from(total_years - year + 1)
                / digits_sum
                / periods_per_year
        }
    };

    Ok(amount.max(Decimal::ZERO))
}

fn straight_line(profile: &DepreciationProfile) -> Decimal {
    profile.depreciable_base() / Decimal::from(profile.useful_life_periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depreciation::PostingFrequency;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn profile(cost: Decimal, salvage: Decimal, years: i32, periods: i32) -> DepreciationProfile {
        DepreciationProfile {
            id: "p-1".to_string(),
            tenant_id: 1,
            asset_id: "a-1".to_string(),
            method_code: METHOD_STRAIGHT_LINE.to_string(),
            cost_basis: cost,
            salvage_value: salvage,
            useful_life_years: years,
            useful_life_periods: periods,
            depreciation_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            frequency: PostingFrequency::Monthly,
            prorate_first_period: false,
            prorate_last_period: false,
            switch_to_straight_line: false,
            is_active: true,
            is_deleted: false,
        }
    }

    fn definition(code: &str, factor: Option<Decimal>) -> MethodDefinition {
        MethodDefinition {
            code: code.to_string(),
            name: code.to_string(),
            factor,
        }
    }

    #[test]
    fn test_resolve_known_codes() {
        assert_eq!(
            DepreciationMethod::resolve(&definition(METHOD_STRAIGHT_LINE, None)).unwrap(),
            DepreciationMethod::StraightLine
        );
        assert_eq!(
            DepreciationMethod::resolve(&definition(METHOD_DOUBLE_DECLINING_BALANCE, None))
                .unwrap(),
            DepreciationMethod::DecliningBalance { factor: dec!(2.0) }
        );
        assert_eq!(
            DepreciationMethod::resolve(&definition(METHOD_DECLINING_BALANCE, Some(dec!(1.5))))
                .unwrap(),
            DepreciationMethod::DecliningBalance { factor: dec!(1.5) }
        );
        assert_eq!(
            DepreciationMethod::resolve(&definition(METHOD_SUM_OF_YEARS_DIGITS, None)).unwrap(),
            DepreciationMethod::SumOfYearsDigits
        );
    }

    #[test]
    fn test_resolve_unknown_code() {
        let err = DepreciationMethod::resolve(&definition("units_of_production", None)).unwrap_err();
        assert_eq!(
            err,
            DepreciationError::UnsupportedMethod("units_of_production".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_non_positive_factor() {
        let err = DepreciationMethod::resolve(&definition(METHOD_DECLINING_BALANCE, Some(dec!(0))))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidProfile(_)));
    }

    #[test]
    fn test_straight_line_is_constant() {
        let p = profile(dec!(12000), dec!(0), 1, 12);
        let method = DepreciationMethod::StraightLine;
        for index in 0..12 {
            let amount =
                compute_period_amount(&method, &p, index, Decimal::from(index) * dec!(1000))
                    .unwrap();
            assert_eq!(amount, dec!(1000));
        }
    }

    #[test]
    fn test_declining_balance_annual() {
        let mut p = profile(dec!(10000), dec!(1000), 5, 5);
        p.frequency = PostingFrequency::Annual;
        let method = DepreciationMethod::DecliningBalance { factor: dec!(2) };

        assert_eq!(compute_period_amount(&method, &p, 0, dec!(0)).unwrap(), dec!(4000));
        assert_eq!(compute_period_amount(&method, &p, 1, dec!(4000)).unwrap(), dec!(2400));
        assert_eq!(compute_period_amount(&method, &p, 2, dec!(6400)).unwrap(), dec!(1440));
    }

    #[test]
    fn test_declining_balance_monthly_spreads_rate() {
        let p = profile(dec!(12000), dec!(0), 2, 24);
        let method = DepreciationMethod::DecliningBalance { factor: dec!(2) };
        // 12000 * (2 / 2) / 12
        assert_eq!(compute_period_amount(&method, &p, 0, dec!(0)).unwrap(), dec!(1000));
    }

    #[test]
    fn test_declining_balance_switches_to_straight_line() {
        let mut p = profile(dec!(10000), dec!(1000), 5, 5);
        p.frequency = PostingFrequency::Annual;
        p.switch_to_straight_line = true;
        let method = DepreciationMethod::DecliningBalance { factor: dec!(2) };

        // Year 4: DB gives 2160 * 0.4 = 864, SL over 2 remaining years gives 580.
        assert_eq!(compute_period_amount(&method, &p, 3, dec!(7840)).unwrap(), dec!(864));
        // Year 5: DB gives 1296 * 0.4 = 518.4, SL over 1 remaining year gives 296.
        assert_eq!(compute_period_amount(&method, &p, 4, dec!(8704)).unwrap(), dec!(518.4));

        let mut low_salvage = p.clone();
        low_salvage.salvage_value = dec!(0);
        // Year 5 with salvage 0: SL gives the full 1296 remaining.
        assert_eq!(
            compute_period_amount(&method, &low_salvage, 4, dec!(8704)).unwrap(),
            dec!(1296)
        );
    }

    #[test]
    fn test_sum_of_years_digits_weights() {
        let mut p = profile(dec!(16000), dec!(1000), 5, 5);
        p.frequency = PostingFrequency::Annual;
        let method = DepreciationMethod::SumOfYearsDigits;

        let amounts: Vec<Decimal> = (0..5)
            .map(|i| compute_period_amount(&method, &p, i, dec!(0)).unwrap())
            .collect();
        assert_eq!(
            amounts,
            vec![dec!(5000), dec!(4000), dec!(3000), dec!(2000), dec!(1000)]
        );
    }

    #[test]
    fn test_sum_of_years_digits_spreads_year_over_periods() {
        let p = profile(dec!(3600), dec!(0), 2, 24);
        let method = DepreciationMethod::SumOfYearsDigits;
        // Year 1 weight 2/3 -> 2400 over 12 months.
        assert_eq!(compute_period_amount(&method, &p, 0, dec!(0)).unwrap(), dec!(200));
        assert_eq!(compute_period_amount(&method, &p, 11, dec!(0)).unwrap(), dec!(200));
        // Year 2 weight 1/3 -> 1200 over 12 months.
        assert_eq!(compute_period_amount(&method, &p, 12, dec!(0)).unwrap(), dec!(100));
    }

    #[test]
    fn test_sum_of_years_digits_clamps_to_last_year() {
        // 2 years but 30 periods: periods past month 24 stay in year 2.
        let p = profile(dec!(3600), dec!(0), 2, 30);
        let method = DepreciationMethod::SumOfYearsDigits;
        assert_eq!(compute_period_amount(&method, &p, 29, dec!(0)).unwrap(), dec!(100));
    }

    #[test]
    fn test_zero_life_is_invalid() {
        let p = profile(dec!(1000), dec!(0), 1, 0);
        let err = compute_period_amount(&DepreciationMethod::StraightLine, &p, 0, dec!(0))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidProfile(_)));

        let p = profile(dec!(1000), dec!(0), 0, 12);
        assert!(compute_period_amount(&DepreciationMethod::SumOfYearsDigits, &p, 0, dec!(0))
            .is_err());
        assert!(compute_period_amount(&DepreciationMethod::StraightLine, &p, 0, dec!(0)).is_ok());
    }

    #[test]
    fn test_sub_cent_money_is_invalid() {
        let method = DepreciationMethod::StraightLine;
        for (cost, salvage) in [(dec!(100.005), dec!(0)), (dec!(100.015), dec!(0.5001))] {
            let err = validate_profile(&profile(cost, salvage, 1, 12), &method).unwrap_err();
            assert!(matches!(err, DepreciationError::InvalidProfile(_)));
        }
        // Trailing zeros are not extra precision.
        assert!(validate_profile(&profile(dec!(100.5000), dec!(0.10), 1, 12), &method).is_ok());
    }
}
