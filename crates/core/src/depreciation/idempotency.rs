//! Deterministic identifiers for ledger entries.
//!
//! An entry is identified by what it covers, not by when it was computed, so a
//! dry run and a live run over the same inputs produce the same entry ids.

use sha2::{Digest, Sha256};

use super::depreciation_model::{DepreciationPeriod, EntryType};

/// Computes the entry id for a profile, period and entry type.
pub fn compute_entry_id(profile_id: &str, period: &DepreciationPeriod, entry_type: EntryType) -> String {
    let mut hasher = Sha256::new();

    hasher.update(profile_id.as_bytes());
    hasher.update(b"|");
    hasher.update(period.start.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(period.end.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(entry_type.as_str().as_bytes());

    hex::encode(hasher.finalize())
}
