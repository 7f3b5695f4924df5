use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;

use crate::constants::DEFAULT_RUN_LOG_LIMIT;
use crate::errors::{DatabaseError, Error, Result, ValidationError};

use super::depreciation_errors::DepreciationError;
use super::depreciation_model::{
    AssetBookValue, AssetError, DepreciationEntry, DepreciationPeriod, DepreciationProfile,
    EntryType, MethodDefinition, NewAdjustment, Posting, RunLog, RunResult, RunSettings,
    RunStatus,
};
use super::depreciation_traits::{DepreciationRepositoryTrait, DepreciationServiceTrait};
use super::ledger_writer::LedgerWriter;
use super::methods::DepreciationMethod;
use super::schedule::{next_entry, round_money, ScheduleOutcome};

/// What happened to one profile during a run.
enum ProfileOutcome {
    Scheduled(Posting),
    Skipped,
    Failed(AssetError),
}

/// Run orchestrator for depreciation.
pub struct DepreciationService {
    repository: Arc<dyn DepreciationRepositoryTrait>,
    ledger_writer: LedgerWriter,
    settings: RunSettings,
}

impl DepreciationService {
    pub fn new(repository: Arc<dyn DepreciationRepositoryTrait>) -> Self {
        Self::with_settings(repository, RunSettings::default())
    }

    pub fn with_settings(
        repository: Arc<dyn DepreciationRepositoryTrait>,
        settings: RunSettings,
    ) -> Self {
        DepreciationService {
            ledger_writer: LedgerWriter::new(repository.clone()),
            repository,
            settings,
        }
    }

    /// Bounds a storage call by the fetch timeout; failures become storage errors.
    async fn with_timeout<T, F>(&self, what: &str, fut: F) -> std::result::Result<T, DepreciationError>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.settings.fetch_timeout, fut).await {
            Ok(result) => result.map_err(DepreciationError::from),
            Err(_) => Err(DepreciationError::from(Error::Database(DatabaseError::Timeout(
                format!("{} exceeded {:?}", what, self.settings.fetch_timeout),
            )))),
        }
    }

    async fn process_profile(
        &self,
        profile: DepreciationProfile,
        methods: &HashMap<String, MethodDefinition>,
        period: &DepreciationPeriod,
        dry_run: bool,
    ) -> ProfileOutcome {
        match self.schedule_profile(&profile, methods, period, dry_run).await {
            Ok(Some(posting)) => ProfileOutcome::Scheduled(posting),
            Ok(None) => ProfileOutcome::Skipped,
            Err(err) => match AssetError::new(&profile, &err) {
                Some(asset_error) => {
                    warn!(
                        "Depreciation failed for profile {} (asset {}): {}",
                        profile.id, profile.asset_id, err
                    );
                    ProfileOutcome::Failed(asset_error)
                }
                None => {
                    debug!("{}", err);
                    ProfileOutcome::Skipped
                }
            },
        }
    }

    async fn schedule_profile(
        &self,
        profile: &DepreciationProfile,
        methods: &HashMap<String, MethodDefinition>,
        period: &DepreciationPeriod,
        dry_run: bool,
    ) -> std::result::Result<Option<Posting>, DepreciationError> {
        let already_posted = self
            .with_timeout(
                "idempotency check",
                self.repository
                    .has_normal_entry_for_period(&profile.id, period),
            )
            .await?;
        // A later normal entry means the ledger has moved past this period.
        let moved_past = already_posted
            || self
                .with_timeout(
                    "ledger position check",
                    self.repository.has_normal_entry_after(&profile.id, period.end),
                )
                .await?;
        if moved_past {
            return Err(DepreciationError::AlreadyPosted {
                profile_id: profile.id.clone(),
                period: period.to_string(),
            });
        }

        let last_entry = self
            .with_timeout(
                "latest entry fetch",
                self.repository.latest_posted_entry(&profile.id),
            )
            .await?;

        let definition = methods
            .get(&profile.method_code)
            .ok_or_else(|| DepreciationError::UnsupportedMethod(profile.method_code.clone()))?;
        let method = DepreciationMethod::resolve(definition)?;

        let last_accumulated = last_entry
            .map(|entry| entry.accumulated_depreciation)
            .unwrap_or(Decimal::ZERO);

        match next_entry(profile, &method, last_accumulated, period, !dry_run)? {
            ScheduleOutcome::Scheduled(entry) => Ok(Some(Posting {
                entry,
                salvage_value: profile.salvage_value,
            })),
            ScheduleOutcome::Skip(reason) => {
                debug!("Skipping profile {} for {}: {:?}", profile.id, period, reason);
                Ok(None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_run(
        &self,
        tenant_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
        status: RunStatus,
        entries_created: usize,
        errors: &[AssetError],
        failure: Option<String>,
    ) -> Option<RunLog> {
        match self
            .ledger_writer
            .write_run_log(
                tenant_id,
                period_start,
                period_end,
                status,
                entries_created,
                errors,
                failure,
            )
            .await
        {
            Ok(run_log) => Some(run_log),
            Err(e) => {
                error!("Failed to write run log for tenant {}: {}", tenant_id, e);
                None
            }
        }
    }

    async fn fail_run(
        &self,
        tenant_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
        dry_run: bool,
        errors: Vec<AssetError>,
        failure: String,
    ) -> RunResult {
        error!(
            "Depreciation run for tenant {} over [{}, {}) failed: {}",
            tenant_id, period_start, period_end, failure
        );
        let run_log = if dry_run {
            None
        } else {
            self.record_run(
                tenant_id,
                period_start,
                period_end,
                RunStatus::Failed,
                0,
                &errors,
                Some(failure.clone()),
            )
            .await
        };
        RunResult {
            tenant_id,
            period_start,
            period_end,
            dry_run,
            status: RunStatus::Failed,
            entries: Vec::new(),
            errors,
            failure: Some(failure),
            run_log,
        }
    }
}

#[async_trait]
impl DepreciationServiceTrait for DepreciationService {
    async fn run(
        &self,
        tenant_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
        dry_run: bool,
    ) -> RunResult {
        info!(
            "Starting depreciation run for tenant {} over [{}, {}) (dry_run={})",
            tenant_id, period_start, period_end, dry_run
        );

        let period = match DepreciationPeriod::new(period_start, period_end) {
            Ok(period) => period,
            Err(e) => {
                return self
                    .fail_run(tenant_id, period_start, period_end, dry_run, Vec::new(), e.to_string())
                    .await
            }
        };

        let profiles = match self
            .with_timeout("profile load", self.repository.load_active_profiles(tenant_id))
            .await
        {
            Ok(profiles) => profiles,
            Err(e) => {
                return self
                    .fail_run(tenant_id, period.start, period.end, dry_run, Vec::new(), e.to_string())
                    .await
            }
        };

        let methods: HashMap<String, MethodDefinition> = match self
            .with_timeout("method load", self.repository.load_methods())
            .await
        {
            Ok(definitions) => definitions
                .into_iter()
                .map(|definition| (definition.code.clone(), definition))
                .collect(),
            Err(e) => {
                return self
                    .fail_run(tenant_id, period.start, period.end, dry_run, Vec::new(), e.to_string())
                    .await
            }
        };

        let profiles: Vec<DepreciationProfile> = profiles
            .into_iter()
            .filter(|profile| profile.is_active && !profile.is_deleted)
            .collect();
        let profile_count = profiles.len();

        // `buffered` keeps results in profile order regardless of completion order.
        let outcomes: Vec<ProfileOutcome> = stream::iter(profiles)
            .map(|profile| self.process_profile(profile, &methods, &period, dry_run))
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        let mut postings = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                ProfileOutcome::Scheduled(posting) => postings.push(posting),
                ProfileOutcome::Skipped => {}
                ProfileOutcome::Failed(asset_error) => errors.push(asset_error),
            }
        }
        let skipped = profile_count - postings.len() - errors.len();
        let status = RunStatus::classify(postings.len(), errors.len());
        let entries: Vec<DepreciationEntry> =
            postings.iter().map(|posting| posting.entry.clone()).collect();

        if dry_run {
            info!(
                "Dry run for tenant {}: {} entries previewed, {} skipped, {} errors",
                tenant_id,
                entries.len(),
                skipped,
                errors.len()
            );
            return RunResult {
                tenant_id,
                period_start: period.start,
                period_end: period.end,
                dry_run,
                status,
                entries,
                errors,
                failure: None,
                run_log: None,
            };
        }

        match self.ledger_writer.commit(&postings).await {
            Ok(written) => {
                let run_log = self
                    .record_run(
                        tenant_id,
                        period.start,
                        period.end,
                        status,
                        written,
                        &errors,
                        None,
                    )
                    .await;
                info!(
                    "Depreciation run for tenant {} finished with status {}: {} entries, {} skipped, {} errors",
                    tenant_id,
                    status.as_str(),
                    written,
                    skipped,
                    errors.len()
                );
                RunResult {
                    tenant_id,
                    period_start: period.start,
                    period_end: period.end,
                    dry_run,
                    status,
                    entries,
                    errors,
                    failure: None,
                    run_log,
                }
            }
            Err(e) => {
                self.fail_run(
                    tenant_id,
                    period.start,
                    period.end,
                    dry_run,
                    errors,
                    format!("Commit failed: {}", e),
                )
                .await
            }
        }
    }

    async fn post_adjustment(&self, adjustment: NewAdjustment) -> Result<DepreciationEntry> {
        if adjustment.entry_type == EntryType::Normal {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Manual entries must be adjustments or corrections".to_string(),
            )));
        }
        let amount = round_money(adjustment.amount);
        if amount <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Adjustment amount must be positive, got {}",
                adjustment.amount
            ))));
        }
        let period = DepreciationPeriod::new(adjustment.period_start, adjustment.period_end)?;

        let profile = self.repository.get_profile(&adjustment.profile_id).await?;
        let last_entry = self.repository.latest_posted_entry(&profile.id).await?;
        if let Some(last) = &last_entry {
            if period.end < last.period_end {
                return Err(Error::Validation(ValidationError::InvalidInput(format!(
                    "Adjustment period {} ends before the latest posted period ending {}",
                    period, last.period_end
                ))));
            }
        }
        let last_accumulated = last_entry
            .map(|entry| entry.accumulated_depreciation)
            .unwrap_or(Decimal::ZERO);

        let accumulated_depreciation = last_accumulated + amount;
        let book_value = profile.cost_basis - accumulated_depreciation;
        if book_value < profile.salvage_value {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Adjustment of {} would take book value {} below salvage value {}",
                amount, book_value, profile.salvage_value
            ))));
        }

        let entry = DepreciationEntry {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile.id.clone(),
            asset_id: profile.asset_id.clone(),
            period_start: period.start,
            period_end: period.end,
            depreciation_amount: amount,
            accumulated_depreciation,
            book_value,
            entry_type: adjustment.entry_type,
            posted: true,
        };
        self.ledger_writer
            .commit(&[Posting {
                entry: entry.clone(),
                salvage_value: profile.salvage_value,
            }])
            .await?;
        info!(
            "Posted {} of {} for profile {} over {}",
            entry.entry_type.as_str(),
            amount,
            profile.id,
            period
        );
        Ok(entry)
    }

    fn get_entries(&self, profile_id: &str) -> Result<Vec<DepreciationEntry>> {
        self.repository.get_entries(profile_id)
    }

    fn get_asset_book_value(&self, asset_id: &str) -> Result<Option<AssetBookValue>> {
        self.repository.get_asset_book_value(asset_id)
    }

    fn get_run_logs(&self, tenant_id: i64, limit: Option<i64>) -> Result<Vec<RunLog>> {
        self.repository
            .get_run_logs(tenant_id, limit.unwrap_or(DEFAULT_RUN_LOG_LIMIT))
    }
}
