//! Error types for the queue client

use thiserror::Error;

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the batch scheduler
#[derive(Debug, Error)]
pub enum ClientError {
    /// The submission tool produced no parseable job identifier
    #[error("Submission failed: {0}")]
    Submission(String),

    /// The query tool was unavailable or printed something unexpected.
    ///
    /// Callers must read this as "no information", never as "no jobs".
    #[error("Queue query failed: {0}")]
    QueryTransient(String),

    /// The cancel tool reported a failure
    #[error("Cancel failed: {0}")]
    Cancel(String),

    /// A scheduler tool could not be started
    #[error("Failed to execute '{tool}': {source}")]
    Launch {
        /// Name of the tool that could not be run
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Create a launch error for the given tool
    pub fn launch(tool: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            tool: tool.into(),
            source,
        }
    }

    /// Check if this error only means the queue state is unknown right now
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueryTransient(_))
    }

    /// Check if this error came from a failed submission
    pub fn is_submission(&self) -> bool {
        matches!(self, Self::Submission(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(ClientError::QueryTransient("qstat: timeout".into()).is_transient());
        assert!(ClientError::Submission("no job id".into()).is_submission());
        assert!(!ClientError::Cancel("denied".into()).is_transient());
    }

    #[test]
    fn test_launch_error_message() {
        let err = ClientError::launch(
            "qsub",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.to_string(), "Failed to execute 'qsub': not found");
    }
}
