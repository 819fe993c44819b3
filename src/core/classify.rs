//! Staleness and deletion-candidate rules.

use chrono::{DateTime, Utc};

use crate::core::api::BranchNode;

pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A branch is stale when its last commit is strictly older than the cutoff,
/// `now` minus the threshold. A branch committed exactly at the cutoff is not
/// stale. Fractional thresholds are honored (0.5 days is twelve hours).
pub fn is_stale(committed_date: DateTime<Utc>, now: DateTime<Utc>, stale_days: f64) -> bool {
    let cutoff_millis = now.timestamp_millis() as f64 - stale_days * MILLIS_PER_DAY;
    (committed_date.timestamp_millis() as f64) < cutoff_millis
}

/// Default branches and protected branches are never deletion candidates, no
/// matter how old they are.
pub fn is_deletion_candidate(branch: &BranchNode, default_branch: &str) -> bool {
    branch.name != default_branch && !branch.is_protected
}
