use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};

use crate::error::{Result, SyncError};
use crate::types::ContributionRecord;

/// Column name for the month containing `now`, e.g. `2026-03`.
pub fn month_key(now: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", now.year(), now.month())
}

/// Companion ids with a lifetime contribution or a contribution for `month_key`.
///
/// Every record must carry the `month_key` column; a missing column means the
/// upstream schema was not rolled forward and fails the run explicitly.
pub fn eligible_companions(
    records: &[ContributionRecord],
    month_key: &str,
) -> Result<HashSet<String>> {
    let mut eligible = HashSet::new();
    for record in records {
        let current = record
            .periods
            .get(month_key)
            .copied()
            .ok_or_else(|| SyncError::MissingEligibilityColumn(month_key.to_string()))?;

        if record.lifetime || current {
            eligible.insert(record.companion_id.clone());
        }
    }
    Ok(eligible)
}
