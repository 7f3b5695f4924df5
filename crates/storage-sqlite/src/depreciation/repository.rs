use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::SqliteConnection;
use log::debug;

use assetbook_core::depreciation::{
    AssetBookValue, DepreciationEntry, DepreciationPeriod, DepreciationProfile,
    DepreciationRepositoryTrait, EntryType, MethodDefinition, PostingBatch, RunLog,
};
use assetbook_core::errors::{DatabaseError, Error, Result};

use super::model::{
    format_date, format_timestamp, AssetDB, DepreciationEntryDB, DepreciationProfileDB, MethodDB,
    RunLogDB,
};
use crate::db::{get_connection, run_blocking, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{
    assets, depreciation_entries, depreciation_methods, depreciation_profiles,
    depreciation_run_logs,
};

pub struct DepreciationRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl DepreciationRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        DepreciationRepository { pool, writer }
    }
}

fn latest_entry(
    conn: &mut SqliteConnection,
    profile_id: &str,
) -> Result<Option<DepreciationEntry>> {
    depreciation_entries::table
        .filter(depreciation_entries::profile_id.eq(profile_id))
        .filter(depreciation_entries::posted.eq(true))
        // Write order, not period order: each entry accumulates on the one before it.
        .order(depreciation_entries::created_at.desc())
        .then_order_by(diesel::dsl::sql::<BigInt>("rowid DESC"))
        .select(DepreciationEntryDB::as_select())
        .first::<DepreciationEntryDB>(conn)
        .optional()
        .into_core()?
        .map(DepreciationEntry::try_from)
        .transpose()
}

#[async_trait]
impl DepreciationRepositoryTrait for DepreciationRepository {
    async fn load_active_profiles(&self, tenant_id: i64) -> Result<Vec<DepreciationProfile>> {
        run_blocking(&self.pool, move |conn| {
            let rows = depreciation_profiles::table
                .filter(depreciation_profiles::tenant_id.eq(tenant_id))
                .filter(depreciation_profiles::is_active.eq(true))
                .filter(depreciation_profiles::is_deleted.eq(false))
                .order((
                    depreciation_profiles::created_at.asc(),
                    depreciation_profiles::id.asc(),
                ))
                .select(DepreciationProfileDB::as_select())
                .load::<DepreciationProfileDB>(conn)
                .into_core()?;
            rows.into_iter().map(DepreciationProfile::try_from).collect()
        })
        .await
    }

    async fn load_methods(&self) -> Result<Vec<MethodDefinition>> {
        run_blocking(&self.pool, |conn| {
            let rows = depreciation_methods::table
                .order(depreciation_methods::code.asc())
                .select(MethodDB::as_select())
                .load::<MethodDB>(conn)
                .into_core()?;
            rows.into_iter().map(MethodDefinition::try_from).collect()
        })
        .await
    }

    async fn get_profile(&self, profile_id: &str) -> Result<DepreciationProfile> {
        let profile_id = profile_id.to_string();
        run_blocking(&self.pool, move |conn| {
            let row = depreciation_profiles::table
                .find(&profile_id)
                .select(DepreciationProfileDB::as_select())
                .first::<DepreciationProfileDB>(conn)
                .optional()
                .into_core()?
                .ok_or_else(|| {
                    Error::Database(DatabaseError::NotFound(format!(
                        "Depreciation profile {} not found",
                        profile_id
                    )))
                })?;
            DepreciationProfile::try_from(row)
        })
        .await
    }

    async fn latest_posted_entry(&self, profile_id: &str) -> Result<Option<DepreciationEntry>> {
        let profile_id = profile_id.to_string();
        run_blocking(&self.pool, move |conn| latest_entry(conn, &profile_id)).await
    }

    async fn has_normal_entry_for_period(
        &self,
        profile_id: &str,
        period: &DepreciationPeriod,
    ) -> Result<bool> {
        let profile_id = profile_id.to_string();
        let start = format_date(period.start);
        let end = format_date(period.end);
        run_blocking(&self.pool, move |conn| {
            // ISO dates compare correctly as text.
            let overlapping: i64 = depreciation_entries::table
                .filter(depreciation_entries::profile_id.eq(&profile_id))
                .filter(depreciation_entries::entry_type.eq(EntryType::Normal.as_str()))
                .filter(depreciation_entries::period_start.lt(&end))
                .filter(depreciation_entries::period_end.gt(&start))
                .count()
                .get_result(conn)
                .into_core()?;
            Ok(overlapping > 0)
        })
        .await
    }

    async fn has_normal_entry_after(&self, profile_id: &str, date: NaiveDate) -> Result<bool> {
        let profile_id = profile_id.to_string();
        let date = format_date(date);
        run_blocking(&self.pool, move |conn| {
            let later: i64 = depreciation_entries::table
                .filter(depreciation_entries::profile_id.eq(&profile_id))
                .filter(depreciation_entries::entry_type.eq(EntryType::Normal.as_str()))
                .filter(depreciation_entries::period_start.ge(&date))
                .count()
                .get_result(conn)
                .into_core()?;
            Ok(later > 0)
        })
        .await
    }

    async fn commit_postings(&self, batch: PostingBatch) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let now = Utc::now().naive_utc();
                let updated_at = format_timestamp(now);

                let rows: Vec<DepreciationEntryDB> = batch
                    .entries
                    .into_iter()
                    .map(|entry| DepreciationEntryDB::from_domain(entry, now))
                    .collect();
                let written = diesel::insert_into(depreciation_entries::table)
                    .values(&rows)
                    .execute(conn)
                    .into_core()?;

                for book_value in &batch.book_values {
                    let updated = diesel::update(assets::table.find(&book_value.asset_id))
                        .set((
                            assets::accumulated_depreciation
                                .eq(book_value.accumulated_depreciation.to_string()),
                            assets::book_value.eq(book_value.book_value.to_string()),
                            assets::depreciation_status
                                .eq(book_value.depreciation_status.as_str()),
                            assets::updated_at.eq(&updated_at),
                        ))
                        .execute(conn)
                        .into_core()?;
                    if updated == 0 {
                        return Err(Error::Database(DatabaseError::NotFound(format!(
                            "Asset {} not found",
                            book_value.asset_id
                        ))));
                    }
                }

                if !batch.deactivate_profile_ids.is_empty() {
                    let deactivated = diesel::update(
                        depreciation_profiles::table
                            .filter(depreciation_profiles::id.eq_any(&batch.deactivate_profile_ids)),
                    )
                    .set((
                        depreciation_profiles::is_active.eq(false),
                        depreciation_profiles::updated_at.eq(&updated_at),
                    ))
                    .execute(conn)
                    .into_core()?;
                    debug!("Deactivated {} fully depreciated profiles", deactivated);
                }

                Ok(written)
            })
            .await
    }

    async fn insert_run_log(&self, run_log: RunLog) -> Result<RunLog> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<RunLog> {
                let row = RunLogDB::try_from(run_log)?;
                diesel::insert_into(depreciation_run_logs::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                RunLog::try_from(row)
            })
            .await
    }

    fn get_entries(&self, profile_id: &str) -> Result<Vec<DepreciationEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = depreciation_entries::table
            .filter(depreciation_entries::profile_id.eq(profile_id))
            .order((
                depreciation_entries::period_end.asc(),
                depreciation_entries::created_at.asc(),
            ))
            .select(DepreciationEntryDB::as_select())
            .load::<DepreciationEntryDB>(&mut conn)
            .into_core()?;
        rows.into_iter().map(DepreciationEntry::try_from).collect()
    }

    fn get_asset_book_value(&self, asset_id: &str) -> Result<Option<AssetBookValue>> {
        let mut conn = get_connection(&self.pool)?;
        assets::table
            .find(asset_id)
            .select(AssetDB::as_select())
            .first::<AssetDB>(&mut conn)
            .optional()
            .into_core()?
            .map(AssetBookValue::try_from)
            .transpose()
    }

    fn get_run_logs(&self, tenant_id: i64, limit: i64) -> Result<Vec<RunLog>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = depreciation_run_logs::table
            .filter(depreciation_run_logs::tenant_id.eq(tenant_id))
            .order(depreciation_run_logs::created_at.desc())
            .limit(limit)
            .select(RunLogDB::as_select())
            .load::<RunLogDB>(&mut conn)
            .into_core()?;
        rows.into_iter().map(RunLog::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use assetbook_core::depreciation::{
        DepreciationService, DepreciationServiceTrait, DepreciationStatus, LedgerWriter,
        NewAdjustment, Posting, PostingFrequency, RunStatus,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    const TENANT: i64 = 42;

    async fn create_test_repository() -> (
        DepreciationRepository,
        Arc<DbPool>,
        tempfile::TempDir,
    ) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        let repo = DepreciationRepository::new(Arc::clone(&pool), writer);
        (repo, pool, temp_dir)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn month(y: i32, m: u32) -> DepreciationPeriod {
        DepreciationPeriod::containing(d(y, m, 1), PostingFrequency::Monthly).unwrap()
    }

    fn test_profile(id: &str, cost: Decimal) -> DepreciationProfile {
        DepreciationProfile {
            id: id.to_string(),
            tenant_id: TENANT,
            asset_id: format!("asset-{}", id),
            method_code: "straight_line".to_string(),
            cost_basis: cost,
            salvage_value: Decimal::ZERO,
            useful_life_years: 1,
            useful_life_periods: 12,
            depreciation_start_date: d(2025, 1, 1),
            frequency: PostingFrequency::Monthly,
            prorate_first_period: false,
            prorate_last_period: false,
            switch_to_straight_line: false,
            is_active: true,
            is_deleted: false,
        }
    }

    /// Inserts the asset row and the profile that depreciates it.
    fn insert_profile(pool: &Arc<DbPool>, profile: DepreciationProfile) {
        let mut conn = get_connection(pool).expect("Failed to get connection");
        let now = format_timestamp(Utc::now().naive_utc());
        diesel::insert_into(assets::table)
            .values(&AssetDB {
                id: profile.asset_id.clone(),
                tenant_id: profile.tenant_id,
                name: format!("Asset {}", profile.id),
                accumulated_depreciation: "0".to_string(),
                book_value: profile.cost_basis.to_string(),
                depreciation_status: DepreciationStatus::Active.as_str().to_string(),
                created_at: now.clone(),
                updated_at: now,
            })
            .execute(&mut conn)
            .expect("Failed to insert asset");
        diesel::insert_into(depreciation_profiles::table)
            .values(&DepreciationProfileDB::from(profile))
            .execute(&mut conn)
            .expect("Failed to insert profile");
    }

    fn entry(
        profile: &DepreciationProfile,
        period: DepreciationPeriod,
        accumulated: Decimal,
    ) -> Posting {
        let amount = accumulated;
        Posting {
            entry: DepreciationEntry {
                id: format!("{}-{}", profile.id, period.start),
                profile_id: profile.id.clone(),
                asset_id: profile.asset_id.clone(),
                period_start: period.start,
                period_end: period.end,
                depreciation_amount: amount,
                accumulated_depreciation: accumulated,
                book_value: profile.cost_basis - accumulated,
                entry_type: EntryType::Normal,
                posted: true,
            },
            salvage_value: profile.salvage_value,
        }
    }

    #[tokio::test]
    async fn test_load_active_profiles_filters_rows() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        insert_profile(&pool, test_profile("active", dec!(1200)));
        let mut inactive = test_profile("inactive", dec!(1200));
        inactive.is_active = false;
        insert_profile(&pool, inactive);
        let mut deleted = test_profile("deleted", dec!(1200));
        deleted.is_deleted = true;
        insert_profile(&pool, deleted);
        let mut other_tenant = test_profile("other", dec!(1200));
        other_tenant.tenant_id = 7;
        insert_profile(&pool, other_tenant);

        let profiles = repo.load_active_profiles(TENANT).await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0], test_profile("active", dec!(1200)));

        let fetched = repo.get_profile("inactive").await.unwrap();
        assert!(!fetched.is_active);
        assert!(matches!(
            repo.get_profile("missing").await,
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_seeded_methods() {
        let (repo, _pool, _temp_dir) = create_test_repository().await;
        let methods = repo.load_methods().await.unwrap();
        let codes: Vec<&str> = methods.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "declining_balance",
                "double_declining_balance",
                "straight_line",
                "sum_of_years_digits"
            ]
        );
        let ddb = methods
            .iter()
            .find(|m| m.code == "double_declining_balance")
            .unwrap();
        assert_eq!(ddb.factor, Some(dec!(2.0)));
    }

    #[tokio::test]
    async fn test_commit_updates_ledger_and_asset() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        let profile = test_profile("p1", dec!(1000));
        insert_profile(&pool, profile.clone());
        let ledger_writer = LedgerWriter::new(Arc::new(DepreciationRepository::new(
            Arc::clone(&pool),
            repo.writer.clone(),
        )));

        let written = ledger_writer
            .commit(&[entry(&profile, month(2025, 1), dec!(250.50))])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let latest = repo.latest_posted_entry("p1").await.unwrap().unwrap();
        assert_eq!(latest.depreciation_amount, dec!(250.50));
        assert_eq!(latest.book_value, dec!(749.50));
        assert_eq!(latest.period_start, d(2025, 1, 1));

        assert!(repo
            .has_normal_entry_for_period("p1", &month(2025, 1))
            .await
            .unwrap());
        assert!(!repo
            .has_normal_entry_for_period("p1", &month(2025, 2))
            .await
            .unwrap());
        let straddling = DepreciationPeriod::new(d(2025, 1, 15), d(2025, 2, 15)).unwrap();
        assert!(repo
            .has_normal_entry_for_period("p1", &straddling)
            .await
            .unwrap());

        let book_value = repo.get_asset_book_value("asset-p1").unwrap().unwrap();
        assert_eq!(book_value.accumulated_depreciation, dec!(250.50));
        assert_eq!(book_value.book_value, dec!(749.50));
        assert_eq!(book_value.depreciation_status, DepreciationStatus::Active);
        assert!(repo.get_asset_book_value("asset-none").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fully_depreciated_profile_is_deactivated() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        let profile = test_profile("p1", dec!(100));
        insert_profile(&pool, profile.clone());

        let batch = LedgerWriter::prepare_batch(&[entry(&profile, month(2025, 1), dec!(100))]);
        repo.commit_postings(batch).await.unwrap();

        assert!(repo.load_active_profiles(TENANT).await.unwrap().is_empty());
        let book_value = repo.get_asset_book_value("asset-p1").unwrap().unwrap();
        assert_eq!(
            book_value.depreciation_status,
            DepreciationStatus::FullyDepreciated
        );
    }

    #[tokio::test]
    async fn test_failed_commit_writes_nothing() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        let first = test_profile("p1", dec!(1000));
        let second = test_profile("p2", dec!(1000));
        insert_profile(&pool, first.clone());
        insert_profile(&pool, second.clone());

        repo.commit_postings(LedgerWriter::prepare_batch(&[entry(
            &first,
            month(2025, 1),
            dec!(100),
        )]))
        .await
        .unwrap();

        // p2 is valid, but p1's duplicate normal entry violates the unique index.
        let mut duplicate = entry(&first, month(2025, 1), dec!(100));
        duplicate.entry.id = "another-id".to_string();
        let result = repo
            .commit_postings(LedgerWriter::prepare_batch(&[
                entry(&second, month(2025, 1), dec!(100)),
                duplicate,
            ]))
            .await;

        assert!(matches!(
            result,
            Err(Error::Database(DatabaseError::UniqueViolation(_)))
        ));
        assert!(repo.get_entries("p2").unwrap().is_empty());
        let untouched = repo.get_asset_book_value("asset-p2").unwrap().unwrap();
        assert_eq!(untouched.accumulated_depreciation, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_adjustment_may_share_a_period() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        let profile = test_profile("p1", dec!(1000));
        insert_profile(&pool, profile.clone());
        repo.commit_postings(LedgerWriter::prepare_batch(&[entry(
            &profile,
            month(2025, 1),
            dec!(100),
        )]))
        .await
        .unwrap();

        let mut adjustment = entry(&profile, month(2025, 1), dec!(50));
        adjustment.entry.id = "adj-1".to_string();
        adjustment.entry.entry_type = EntryType::Adjustment;
        adjustment.entry.accumulated_depreciation = dec!(150);
        adjustment.entry.book_value = dec!(850);
        repo.commit_postings(LedgerWriter::prepare_batch(&[adjustment]))
            .await
            .unwrap();

        let entries = repo.get_entries("p1").unwrap();
        assert_eq!(entries.len(), 2);
        let latest = repo.latest_posted_entry("p1").await.unwrap().unwrap();
        assert_eq!(latest.entry_type, EntryType::Adjustment);
        assert_eq!(latest.accumulated_depreciation, dec!(150));
    }

    #[tokio::test]
    async fn test_latest_entry_follows_write_order() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        let profile = test_profile("p1", dec!(1000));
        insert_profile(&pool, profile.clone());
        repo.commit_postings(LedgerWriter::prepare_batch(&[entry(
            &profile,
            month(2025, 3),
            dec!(300),
        )]))
        .await
        .unwrap();

        // Dated after the normal entry but written first in the chain.
        let mut future = entry(&profile, month(2025, 12), dec!(50));
        future.entry.id = "adj-dec".to_string();
        future.entry.entry_type = EntryType::Adjustment;
        future.entry.accumulated_depreciation = dec!(350);
        future.entry.book_value = dec!(650);
        repo.commit_postings(LedgerWriter::prepare_batch(&[future]))
            .await
            .unwrap();

        let mut april = entry(&profile, month(2025, 4), dec!(100));
        april.entry.accumulated_depreciation = dec!(450);
        april.entry.book_value = dec!(550);
        repo.commit_postings(LedgerWriter::prepare_batch(&[april]))
            .await
            .unwrap();

        let latest = repo.latest_posted_entry("p1").await.unwrap().unwrap();
        assert_eq!(latest.period_start, d(2025, 4, 1));
        assert_eq!(latest.accumulated_depreciation, dec!(450));

        // Only normal entries mark the ledger position.
        assert!(repo.has_normal_entry_after("p1", d(2025, 4, 1)).await.unwrap());
        assert!(!repo.has_normal_entry_after("p1", d(2025, 5, 1)).await.unwrap());
        assert!(!repo.has_normal_entry_after("p2", d(2025, 1, 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_run_logs_round_trip() {
        let (repo, _pool, _temp_dir) = create_test_repository().await;
        let ledger_writer = LedgerWriter::new(Arc::new(DepreciationRepository::new(
            Arc::clone(&repo.pool),
            repo.writer.clone(),
        )));

        for m in 1..=3 {
            ledger_writer
                .write_run_log(
                    TENANT,
                    d(2025, m, 1),
                    d(2025, m + 1, 1),
                    RunStatus::Success,
                    m as usize,
                    &[],
                    None,
                )
                .await
                .unwrap();
        }

        let logs = repo.get_run_logs(TENANT, 2).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].period_start, d(2025, 3, 1));
        assert_eq!(logs[0].entries_created, 3);
        assert!(repo.get_run_logs(7, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_runs_against_sqlite() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        insert_profile(&pool, test_profile("sl", dec!(12000)));
        let mut broken = test_profile("broken", dec!(500));
        broken.useful_life_periods = 0;
        insert_profile(&pool, broken);
        let service = DepreciationService::new(Arc::new(repo));

        let period = month(2025, 1);
        let preview = service.run(TENANT, period.start, period.end, true).await;
        assert_eq!(preview.entries.len(), 1);
        assert!(service.get_entries("sl").unwrap().is_empty());
        assert!(service.get_run_logs(TENANT, None).unwrap().is_empty());

        let result = service.run(TENANT, period.start, period.end, false).await;
        assert_eq!(result.status, RunStatus::PartialSuccess);
        assert_eq!(result.entries_created(), 1);
        assert_eq!(result.errors[0].profile_id, "broken");

        let logs = service.get_run_logs(TENANT, None).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, RunStatus::PartialSuccess);
        assert_eq!(logs[0].errors, result.errors);

        // Rerunning the same period posts nothing new.
        let rerun = service.run(TENANT, period.start, period.end, false).await;
        assert!(rerun.entries.is_empty());
        let entries = service.get_entries("sl").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].depreciation_amount, dec!(1000));
        assert_eq!(
            service.get_asset_book_value("asset-sl").unwrap().unwrap().book_value,
            dec!(11000)
        );
    }

    #[tokio::test]
    async fn test_adjustments_keep_the_chain_against_sqlite() {
        let (repo, pool, _temp_dir) = create_test_repository().await;
        insert_profile(&pool, test_profile("sl", dec!(12000)));
        let service = DepreciationService::new(Arc::new(repo));
        for m in 1..=3 {
            let period = month(2025, m);
            service.run(TENANT, period.start, period.end, false).await;
        }

        let adjustment = |period: DepreciationPeriod| NewAdjustment {
            profile_id: "sl".to_string(),
            entry_type: EntryType::Correction,
            period_start: period.start,
            period_end: period.end,
            amount: dec!(500),
        };
        assert!(matches!(
            service.post_adjustment(adjustment(month(2025, 1))).await,
            Err(Error::Validation(_))
        ));
        service
            .post_adjustment(adjustment(month(2025, 12)))
            .await
            .unwrap();

        let april = month(2025, 4);
        let result = service.run(TENANT, april.start, april.end, false).await;
        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].accumulated_depreciation, dec!(4500));
        assert_eq!(result.entries[0].book_value, dec!(7500));

        let snapshot = service.get_asset_book_value("asset-sl").unwrap().unwrap();
        assert_eq!(snapshot.accumulated_depreciation, dec!(4500));
        assert_eq!(snapshot.book_value, dec!(7500));
    }
}
