//! The stale-branch report: a timestamped CSV that the discovery run writes
//! and a later deletion run reads back.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::utils::{ReaperError, Result};

pub const REPORT_HEADER: &str = "Organization,Repository,Branch,Author,LastUpdated";

/// One row of the report. Rows are written, and later deleted, in traversal
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleBranchRecord {
    pub organization: String,
    pub repository: String,
    pub branch: String,
    pub author: String,
    pub last_updated: DateTime<Utc>,
}

/// Report path for a run starting at `now`, unique per run via the epoch
/// millisecond timestamp.
pub fn report_file_name(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "stale-branches-report-{}.csv",
        now.timestamp_millis()
    ))
}

pub struct ReportWriter<W: Write> {
    out: W,
    path: PathBuf,
    written: usize,
}

impl ReportWriter<File> {
    /// Creates the report file and writes the header. Failure here is fatal;
    /// a run that cannot record its findings is pointless.
    pub fn create(path: PathBuf) -> Result<Self> {
        let file = File::create(&path).map_err(|e| {
            ReaperError::report_error(format!("failed to create {}: {}", path.display(), e))
        })?;
        Self::from_writer(file, path)
    }
}

impl<W: Write> ReportWriter<W> {
    /// Wraps an open destination and writes the header; `path` labels the
    /// destination in log and summary messages. `create` is the usual entry
    /// point.
    pub fn from_writer(mut out: W, path: PathBuf) -> Result<Self> {
        writeln!(out, "{}", REPORT_HEADER).map_err(|e| {
            ReaperError::report_error(format!(
                "failed to write header to {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self {
            out,
            path,
            written: 0,
        })
    }

    /// Appends one row, flushing so a crash mid-traversal loses at most the
    /// current row. Row failures are logged and swallowed; one bad write
    /// should not abort a traversal that may already be hours in.
    pub fn append(&mut self, record: &StaleBranchRecord) {
        let result = writeln!(
            self.out,
            "{},{},{},{},{}",
            record.organization,
            record.repository,
            record.branch,
            record.author,
            format_timestamp(record.last_updated)
        )
        .and_then(|_| self.out.flush());

        match result {
            Ok(()) => self.written += 1,
            Err(e) => warn!("failed to append row to {}: {}", self.path.display(), e),
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads a report back, strictly: the header must match what the writer
/// produces, every row must have exactly five fields, and timestamps must be
/// RFC 3339. A file that fails any of these was not produced by a discovery
/// run and is not safe to feed into deletion.
pub fn read_report(path: &Path) -> Result<Vec<StaleBranchRecord>> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ReaperError::report_error(format!("failed to read {}: {}", path.display(), e))
    })?;

    let mut lines = contents.lines();
    match lines.next() {
        Some(header) if header == REPORT_HEADER => {}
        Some(header) => {
            return Err(ReaperError::report_error(format!(
                "unexpected header in {}: '{}'",
                path.display(),
                header
            )))
        }
        None => {
            return Err(ReaperError::report_error(format!(
                "{} is empty",
                path.display()
            )))
        }
    }

    let mut records = Vec::new();
    for (index, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_number = index + 2;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 {
            return Err(ReaperError::report_error(format!(
                "line {} of {}: expected 5 fields, found {}",
                line_number,
                path.display(),
                fields.len()
            )));
        }
        let last_updated = DateTime::parse_from_rfc3339(fields[4])
            .map_err(|e| {
                ReaperError::report_error(format!(
                    "line {} of {}: invalid timestamp '{}': {}",
                    line_number,
                    path.display(),
                    fields[4],
                    e
                ))
            })?
            .with_timezone(&Utc);

        records.push(StaleBranchRecord {
            organization: fields[0].to_string(),
            repository: fields[1].to_string(),
            branch: fields[2].to_string(),
            author: fields[3].to_string(),
            last_updated,
        });
    }
    Ok(records)
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
