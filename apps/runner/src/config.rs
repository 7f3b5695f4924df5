use std::time::Duration;

use anyhow::{anyhow, Context};
use assetbook_core::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENCY};
use assetbook_core::depreciation::{DepreciationPeriod, PostingFrequency, RunSettings};
use chrono::NaiveDate;

pub struct Config {
    pub db_path: String,
    pub tenant_id: i64,
    pub dry_run: bool,
    /// Month to post, as `YYYY-MM`. The current period is used when unset.
    pub period: Option<String>,
    pub frequency: PostingFrequency,
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db_path = lookup("ASSETBOOK_DB_PATH").unwrap_or_else(|| "./assetbook.db".into());
        let tenant_id = lookup("ASSETBOOK_TENANT_ID")
            .ok_or_else(|| anyhow!("ASSETBOOK_TENANT_ID is required"))?
            .trim()
            .parse()
            .context("Invalid ASSETBOOK_TENANT_ID")?;
        let dry_run = lookup("ASSETBOOK_DRY_RUN")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let period = lookup("ASSETBOOK_PERIOD").filter(|v| !v.trim().is_empty());
        let frequency = match lookup("ASSETBOOK_FREQUENCY") {
            Some(v) => v.parse().context("Invalid ASSETBOOK_FREQUENCY")?,
            None => PostingFrequency::Monthly,
        };
        let max_concurrency = lookup("ASSETBOOK_MAX_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);
        let timeout_secs: u64 = lookup("ASSETBOOK_FETCH_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        Ok(Self {
            db_path,
            tenant_id,
            dry_run,
            period,
            frequency,
            max_concurrency,
            fetch_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            max_concurrency: self.max_concurrency,
            fetch_timeout: self.fetch_timeout,
        }
    }

    /// The posting window containing the configured month, or `today`.
    pub fn period(&self, today: NaiveDate) -> anyhow::Result<DepreciationPeriod> {
        let anchor = match &self.period {
            Some(month) => {
                NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
                    .with_context(|| {
                        format!("Invalid ASSETBOOK_PERIOD '{}', expected YYYY-MM", month)
                    })?
            }
            None => today,
        };
        Ok(DepreciationPeriod::containing(anchor, self.frequency)?)
    }
}
