use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "branch-reaper")]
#[command(about = "Find and delete stale branches across a GitHub Enterprise")]
#[command(
    version,
    long_about = "When run without flags, walks every organization of the configured enterprise \
and writes a CSV report of branches whose last commit is older than the staleness threshold. \
Run again with --delete --csv <report> to delete exactly the branches that report lists."
)]
pub struct Cli {
    /// Delete the branches listed in the report given via --csv
    #[arg(long)]
    pub delete: bool,

    /// Path to a report produced by a previous discovery run
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Walk the enterprise and write a report.
    Discover,
    /// Replay the given report against the deletion endpoint.
    Delete(PathBuf),
}

impl Cli {
    /// Deletion needs both flags; either one alone leaves the tool in
    /// discovery mode.
    pub fn mode(&self) -> RunMode {
        match (self.delete, &self.csv) {
            (true, Some(path)) => RunMode::Delete(path.clone()),
            _ => RunMode::Discover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_selects_discovery() {
        let cli = Cli::try_parse_from(["branch-reaper"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Discover);
    }

    #[test]
    fn test_delete_with_csv_selects_deletion() {
        let cli =
            Cli::try_parse_from(["branch-reaper", "--delete", "--csv", "/tmp/report.csv"]).unwrap();
        assert_eq!(
            cli.mode(),
            RunMode::Delete(PathBuf::from("/tmp/report.csv"))
        );
    }

    #[test]
    fn test_delete_without_csv_still_discovers() {
        let cli = Cli::try_parse_from(["branch-reaper", "--delete"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Discover);
    }

    #[test]
    fn test_csv_alone_still_discovers() {
        let cli = Cli::try_parse_from(["branch-reaper", "--csv", "/tmp/report.csv"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Discover);
    }
}
