use thiserror::Error;

/// Failure of a single branch deletion. These never abort the run; the
/// executor records them and moves on to the next row.
#[derive(Error, Debug)]
pub enum DeleteError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
}

pub type DeleteResult<T> = std::result::Result<T, DeleteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_error_display() {
        let transport = DeleteError::Transport("connection reset".to_string());
        assert_eq!(transport.to_string(), "request failed: connection reset");

        let api = DeleteError::Api {
            status: 422,
            message: "Reference does not exist".to_string(),
        };
        assert_eq!(api.to_string(), "API returned 422: Reference does not exist");
    }
}
