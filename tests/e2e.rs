//! End-to-end flow: discover stale branches into a CSV report, then replay
//! that report as deletions.

use std::sync::Mutex;

use async_trait::async_trait;
use branch_reaper::cli::commands::discover::run_discovery;
use branch_reaper::core::api::{
    BranchNode, BranchPageSource, CursorTriple, DeleteError, DeleteResult, EnterprisePage,
    FetchOutcome, OrganizationNode, Page, RefDeleter, RepositoryNode,
};
use branch_reaper::core::delete::{DeletionExecutor, DeletionSummary};
use branch_reaper::core::report::{read_report, report_file_name, ReportWriter};
use branch_reaper::Result;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap()
}

fn terminal<T>(items: Vec<T>) -> Page<T> {
    Page {
        items,
        has_next: false,
        end_cursor: None,
    }
}

/// The acme enterprise: one organization, one repository, three branches.
/// Only `feature-x` is a stale deletion candidate at a 30 day threshold.
fn acme_enterprise() -> StaticEnterprise {
    let old = Utc.with_ymd_and_hms(2023, 1, 15, 10, 30, 0).unwrap();
    let recent = Utc.with_ymd_and_hms(2023, 5, 25, 9, 0, 0).unwrap();

    StaticEnterprise {
        page: EnterprisePage {
            organizations: terminal(vec![OrganizationNode {
                login: "acme".to_string(),
                repositories: terminal(vec![RepositoryNode {
                    name: "svc".to_string(),
                    default_branch: Some("main".to_string()),
                    refs: terminal(vec![
                        BranchNode {
                            name: "main".to_string(),
                            author: "carol".to_string(),
                            committed_date: old,
                            is_protected: false,
                        },
                        BranchNode {
                            name: "feature-x".to_string(),
                            author: "alice".to_string(),
                            committed_date: old,
                            is_protected: false,
                        },
                        BranchNode {
                            name: "hotfix-y".to_string(),
                            author: "bob".to_string(),
                            committed_date: recent,
                            is_protected: false,
                        },
                    ]),
                }]),
            }]),
        },
    }
}

struct StaticEnterprise {
    page: EnterprisePage,
}

#[async_trait]
impl BranchPageSource for StaticEnterprise {
    async fn fetch_page(
        &self,
        _enterprise: &str,
        _cursors: &CursorTriple,
    ) -> Result<FetchOutcome> {
        Ok(FetchOutcome::Advance(self.page.clone()))
    }
}

struct RecordingDeleter {
    calls: Mutex<Vec<(String, String, String)>>,
    missing_branches: Vec<String>,
}

impl RecordingDeleter {
    fn new(missing_branches: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            missing_branches: missing_branches.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefDeleter for RecordingDeleter {
    async fn delete_branch(
        &self,
        organization: &str,
        repository: &str,
        branch: &str,
    ) -> DeleteResult<()> {
        self.calls.lock().unwrap().push((
            organization.to_string(),
            repository.to_string(),
            branch.to_string(),
        ));
        if self.missing_branches.iter().any(|name| name == branch) {
            return Err(DeleteError::Api {
                status: 422,
                message: "Reference does not exist".to_string(),
            });
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_discovery_reports_exactly_the_stale_candidate() {
    let dir = TempDir::new().unwrap();
    let report_path = report_file_name(dir.path(), fixed_now());
    let mut writer = ReportWriter::create(report_path.clone()).unwrap();

    let source = acme_enterprise();
    let stale = run_discovery(&source, "acme-corp", 30.0, fixed_now(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    assert_eq!(stale, 1);
    let records = read_report(&report_path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].organization, "acme");
    assert_eq!(records[0].repository, "svc");
    assert_eq!(records[0].branch, "feature-x");
    assert_eq!(records[0].author, "alice");
    assert_eq!(
        records[0].last_updated,
        Utc.with_ymd_and_hms(2023, 1, 15, 10, 30, 0).unwrap()
    );
}

#[tokio::test]
async fn test_discovered_report_drives_exactly_one_deletion() {
    let dir = TempDir::new().unwrap();
    let report_path = report_file_name(dir.path(), fixed_now());
    let mut writer = ReportWriter::create(report_path.clone()).unwrap();

    let source = acme_enterprise();
    run_discovery(&source, "acme-corp", 30.0, fixed_now(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    let records = read_report(&report_path).unwrap();
    let deleter = RecordingDeleter::new(&[]);
    let summary = DeletionExecutor::new(&deleter).delete_all(&records).await;

    assert_eq!(summary, DeletionSummary { deleted: 1, failed: 0 });
    assert_eq!(
        deleter.calls(),
        vec![("acme".to_string(), "svc".to_string(), "feature-x".to_string())]
    );
}

#[tokio::test]
async fn test_replaying_report_after_manual_deletion_finishes_cleanly() {
    let dir = TempDir::new().unwrap();
    let report_path = report_file_name(dir.path(), fixed_now());
    let mut writer = ReportWriter::create(report_path.clone()).unwrap();

    let source = acme_enterprise();
    run_discovery(&source, "acme-corp", 30.0, fixed_now(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    // Someone already deleted feature-x by hand; the replay must record the
    // failure and still finish.
    let records = read_report(&report_path).unwrap();
    let deleter = RecordingDeleter::new(&["feature-x"]);
    let summary = DeletionExecutor::new(&deleter).delete_all(&records).await;

    assert_eq!(summary, DeletionSummary { deleted: 0, failed: 1 });
    assert_eq!(deleter.calls().len(), 1);
}
