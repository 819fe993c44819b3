pub mod delete;
pub mod discover;

use crate::cli::parser::{Cli, RunMode};
use crate::config::Config;
use crate::utils::Result;

/// Entry point after argument parsing: load configuration, then run whichever
/// mode the flags selected.
pub async fn execute_command(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    match cli.mode() {
        RunMode::Discover => discover::execute(&config).await,
        RunMode::Delete(csv) => delete::execute(&config, &csv).await,
    }
}
