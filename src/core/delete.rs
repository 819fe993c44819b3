//! Replays a stale-branch report against the deletion endpoint, strictly one
//! branch at a time and in report order.

use tracing::{info, warn};

use crate::core::api::RefDeleter;
use crate::core::report::StaleBranchRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub deleted: usize,
    pub failed: usize,
}

pub struct DeletionExecutor<'a, D: RefDeleter> {
    deleter: &'a D,
}

impl<'a, D: RefDeleter> DeletionExecutor<'a, D> {
    pub fn new(deleter: &'a D) -> Self {
        Self { deleter }
    }

    /// Deletes every listed branch, awaiting each deletion before starting
    /// the next. Failures are logged and counted but never stop the run; a
    /// branch that was already deleted by hand simply shows up as one
    /// failure.
    pub async fn delete_all(&self, records: &[StaleBranchRecord]) -> DeletionSummary {
        let mut summary = DeletionSummary::default();
        for record in records {
            match self
                .deleter
                .delete_branch(&record.organization, &record.repository, &record.branch)
                .await
            {
                Ok(()) => {
                    summary.deleted += 1;
                    info!(
                        "deleted branch '{}' from '{}/{}'",
                        record.branch, record.organization, record.repository
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        "failed to delete branch '{}' from '{}/{}': {}",
                        record.branch, record.organization, record.repository, e
                    );
                }
            }
        }
        summary
    }
}
