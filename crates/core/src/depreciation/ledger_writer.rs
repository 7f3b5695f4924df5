//! Ledger writer: posts computed entries and records run logs.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{debug, info};

use crate::errors::Result;

use super::depreciation_model::{
    AssetBookValue, AssetError, Posting, PostingBatch, RunLog, RunStatus,
};
use super::depreciation_traits::DepreciationRepositoryTrait;

pub struct LedgerWriter {
    repository: Arc<dyn DepreciationRepositoryTrait>,
}

impl LedgerWriter {
    pub fn new(repository: Arc<dyn DepreciationRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Builds the batch for a set of postings: entries, asset snapshots and
    /// the profiles that are now fully depreciated.
    pub fn prepare_batch(postings: &[Posting]) -> PostingBatch {
        let mut batch = PostingBatch::default();
        for posting in postings {
            let book_value = AssetBookValue::after_entry(&posting.entry, posting.salvage_value);
            if book_value.is_fully_depreciated() {
                batch
                    .deactivate_profile_ids
                    .push(posting.entry.profile_id.clone());
            }
            batch.book_values.push(book_value);
            batch.entries.push(posting.entry.clone());
        }
        batch
    }

    /// Persists all postings atomically. Nothing is written if any part fails.
    pub async fn commit(&self, postings: &[Posting]) -> Result<usize> {
        if postings.is_empty() {
            debug!("Nothing to commit");
            return Ok(0);
        }
        let batch = Self::prepare_batch(postings);
        let deactivated = batch.deactivate_profile_ids.len();
        let written = self.repository.commit_postings(batch).await?;
        info!(
            "Committed {} depreciation entries ({} assets fully depreciated)",
            written, deactivated
        );
        Ok(written)
    }

    /// Records one run attempt. Written for committed runs only.
    #[allow(clippy::too_many_arguments)]
    pub async fn write_run_log(
        &self,
        tenant_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
        status: RunStatus,
        entries_created: usize,
        errors: &[AssetError],
        failure: Option<String>,
    ) -> Result<RunLog> {
        let run_log = RunLog {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            period_start,
            period_end,
            status,
            entries_created: i64::try_from(entries_created).unwrap_or(i64::MAX),
            errors: errors.to_vec(),
            error: failure,
            created_at: Utc::now().naive_utc(),
        };
        self.repository.insert_run_log(run_log).await
    }
}
