//! Discovery mode: walk every branch of the enterprise and write the report.

use std::fs;
use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::api::{BranchPageSource, GithubClient};
use crate::core::classify;
use crate::core::report::{report_file_name, ReportWriter, StaleBranchRecord};
use crate::core::walker::HierarchicalWalker;
use crate::utils::{ReaperError, Result};

pub async fn execute(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.output_dir).map_err(|e| {
        ReaperError::report_error(format!(
            "failed to create output directory {}: {}",
            config.output_dir.display(),
            e
        ))
    })?;

    let now = Utc::now();
    let mut writer = ReportWriter::create(report_file_name(&config.output_dir, now))?;
    let client = GithubClient::new(&config.endpoint, &config.token)?;

    let stale = run_discovery(
        &client,
        &config.enterprise,
        config.stale_days,
        now,
        &mut writer,
    )
    .await?;

    println!();
    println!("------------------------------------------------------");
    println!("--- Report Complete ---");
    println!("{} stale branches found", stale);
    if stale > 0 {
        println!();
        println!("Review {} for results", writer.path().display());
        println!("To delete stale branches, run:");
        println!("  branch-reaper --delete --csv {}", writer.path().display());
    }
    Ok(())
}

/// Walks the enterprise, appending every stale deletion candidate to the
/// report. Returns how many branches were stale.
pub async fn run_discovery<C: BranchPageSource, W: Write>(
    client: &C,
    enterprise: &str,
    stale_days: f64,
    now: DateTime<Utc>,
    writer: &mut ReportWriter<W>,
) -> Result<usize> {
    let mut stale = 0usize;
    let walker = HierarchicalWalker::new(client, enterprise);
    walker
        .walk(|discovered| {
            let branch = discovered.branch;
            let candidate = classify::is_deletion_candidate(branch, discovered.default_branch);
            if candidate && classify::is_stale(branch.committed_date, now, stale_days) {
                info!(
                    "branch '{}' in '{}/{}' is stale, adding to report",
                    branch.name, discovered.organization, discovered.repository
                );
                writer.append(&StaleBranchRecord {
                    organization: discovered.organization.to_string(),
                    repository: discovered.repository.to_string(),
                    branch: branch.name.clone(),
                    author: branch.author.clone(),
                    last_updated: branch.committed_date,
                });
                stale += 1;
            } else {
                debug!(
                    "branch '{}' in '{}/{}' is protected, default, or not stale, ignoring",
                    branch.name, discovered.organization, discovered.repository
                );
            }
        })
        .await?;
    Ok(stale)
}
