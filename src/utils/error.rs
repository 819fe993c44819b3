use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaperError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Traversal failed: {message}")]
    Traversal { message: String },

    #[error("Report error: {message}")]
    Report { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ReaperError>;

impl ReaperError {
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn traversal(message: impl Into<String>) -> Self {
        Self::Traversal {
            message: message.into(),
        }
    }

    pub fn report_error(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_helpers() {
        let config_err = ReaperError::config_error("GITHUB_TOKEN is not set");
        assert!(matches!(config_err, ReaperError::Config { .. }));
        assert_eq!(
            config_err.to_string(),
            "Configuration error: GITHUB_TOKEN is not set"
        );

        let traversal_err = ReaperError::traversal("branch query failed");
        assert!(matches!(traversal_err, ReaperError::Traversal { .. }));
        assert_eq!(
            traversal_err.to_string(),
            "Traversal failed: branch query failed"
        );

        let report_err = ReaperError::report_error("missing header row");
        assert!(matches!(report_err, ReaperError::Report { .. }));
        assert_eq!(report_err.to_string(), "Report error: missing header row");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let reaper_err: ReaperError = io_err.into();
        assert!(matches!(reaper_err, ReaperError::Io(_)));
    }
}
