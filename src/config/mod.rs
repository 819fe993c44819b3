use crate::utils::{ReaperError, Result};
use std::path::PathBuf;

pub const ENV_ENDPOINT: &str = "GITHUB_ENDPOINT";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_ENTERPRISE: &str = "ENTERPRISE_SLUG";
pub const ENV_OUTPUT_FOLDER: &str = "OUTPUT_FOLDER";
pub const ENV_STALE_DAYS: &str = "STALE_DAYS";

/// Runtime configuration, sourced entirely from the process environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// API base URL, e.g. `https://github.example.com/api/v3`.
    pub endpoint: String,
    /// Bearer credential for both the branch query and ref deletion.
    pub token: String,
    /// Enterprise slug whose organizations are enumerated.
    pub enterprise: String,
    /// Directory that receives generated report files.
    pub output_dir: PathBuf,
    /// Staleness threshold in days; fractional values are allowed.
    pub stale_days: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = require(&get, ENV_ENDPOINT)?;
        let token = require(&get, ENV_TOKEN)?;
        let enterprise = require(&get, ENV_ENTERPRISE)?;
        let output_dir = PathBuf::from(require(&get, ENV_OUTPUT_FOLDER)?);
        let stale_days = parse_stale_days(&require(&get, ENV_STALE_DAYS)?)?;

        Ok(Self {
            endpoint,
            token,
            enterprise,
            output_dir,
            stale_days,
        })
    }
}

fn require<F>(get: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ReaperError::config_error(format!(
            "environment variable {name} is not set"
        ))),
    }
}

fn parse_stale_days(raw: &str) -> Result<f64> {
    let days: f64 = raw.trim().parse().map_err(|_| {
        ReaperError::config_error(format!(
            "{ENV_STALE_DAYS} must be a number of days, got \"{raw}\""
        ))
    })?;

    if !days.is_finite() || days < 0.0 {
        return Err(ReaperError::config_error(format!(
            "{ENV_STALE_DAYS} must be a non-negative number of days, got \"{raw}\""
        )));
    }

    Ok(days)
}
