/// Decimal places kept on posted money values
pub const MONEY_DECIMAL_PRECISION: u32 = 2;

/// Declining-balance factor used when a method row carries none
pub const DEFAULT_DECLINING_BALANCE_FACTOR: &str = "2.0";

/// Upper bound on profiles processed at once within a run
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Per-asset storage fetch timeout, in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Number of run logs returned when no limit is given
pub const DEFAULT_RUN_LOG_LIMIT: i64 = 50;
