/// Straight-line method code
pub const METHOD_STRAIGHT_LINE: &str = "straight_line";

/// Declining-balance method code (factor taken from the method row)
pub const METHOD_DECLINING_BALANCE: &str = "declining_balance";

/// Double-declining-balance method code
pub const METHOD_DOUBLE_DECLINING_BALANCE: &str = "double_declining_balance";

/// Sum-of-years-digits method code
pub const METHOD_SUM_OF_YEARS_DIGITS: &str = "sum_of_years_digits";
