//! Deletion mode: replay a previously written report against the API.

use std::path::Path;

use crate::config::Config;
use crate::core::api::GithubClient;
use crate::core::delete::DeletionExecutor;
use crate::core::report::read_report;
use crate::utils::Result;

pub async fn execute(config: &Config, csv: &Path) -> Result<()> {
    let records = read_report(csv)?;
    let client = GithubClient::new(&config.endpoint, &config.token)?;
    let summary = DeletionExecutor::new(&client).delete_all(&records).await;

    println!();
    println!("------------------------------------------------------");
    println!("--- Stale Branch Delete Complete ---");
    println!("{} branches deleted", summary.deleted);
    if summary.failed > 0 {
        println!(
            "{} deletions failed; see the log for details",
            summary.failed
        );
    }
    if summary.deleted > 0 {
        println!();
        println!(
            "Review {} for a list of which branches were deleted",
            csv.display()
        );
    }
    Ok(())
}
