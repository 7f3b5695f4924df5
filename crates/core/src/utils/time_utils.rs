use chrono::{Datelike, Months, NaiveDate};

/// Months elapsed since year zero; used for month arithmetic across years.
pub fn month_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Adds whole calendar months, clamping the day to the end of shorter months.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Number of days in the half-open range `[start, end)`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// First day of the calendar period of `months_per_period` months that contains `date`.
///
/// Periods are aligned to January: quarters start in January, April, July and
/// October; annual periods start on January 1st.
pub fn period_start_containing(date: NaiveDate, months_per_period: u32) -> Option<NaiveDate> {
    let months_per_period = months_per_period.max(1);
    let month0 = date.month0() - date.month0() % months_per_period;
    NaiveDate::from_ymd_opt(date.year(), month0 + 1, 1)
}
