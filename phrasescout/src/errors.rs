/// This module defines the error types for phrasescout.
///
/// Every failure surfaces to the original caller as a `SearchError`; nothing is
/// logged-and-swallowed inside the library. A failed match request yields no
/// partial result.
///
/// # Error Kinds
///
/// ```rust,ignore
/// match pool.match_text(request)?.wait() {
///     Ok(matches) => // Render highlights,
///     Err(SearchError::InvalidInput(msg)) => // Fix the request, never retried,
///     Err(SearchError::ExecutionFailure { .. }) => // A unit panicked, the pool recovered the slot,
///     Err(SearchError::PoolSaturationTimeout(_)) => // No unit freed up in time,
///     Err(e) => // Handle other errors
/// }
/// ```
///
/// Retrying is always the caller's decision; the pool never re-queues a task.
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while matching, extracting or running pool tasks
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Task {task} failed: {message}")]
    ExecutionFailure { task: String, message: String },
    #[error("No worker became free within {0:?}")]
    PoolSaturationTimeout(Duration),
    #[error("Task {task} did not finish within {timeout:?}")]
    TaskTimeout { task: String, timeout: Duration },
    #[error("Worker pool is shut down")]
    PoolClosed,
    #[error("Task {0} was aborted by a forced shutdown")]
    TaskAborted(String),
    #[error("Text extraction failed for {source_name}: {message}")]
    Extraction {
        source_name: String,
        message: String,
    },
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SearchError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn execution_failure(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionFailure {
            task: task.into(),
            message: message.into(),
        }
    }

    pub fn task_timeout(task: impl Into<String>, timeout: Duration) -> Self {
        Self::TaskTimeout {
            task: task.into(),
            timeout,
        }
    }

    pub fn extraction(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Maps an IO error on `path` to the most specific variant
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Whether the error was raised before any work was dispatched
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = SearchError::invalid_input("max_window must be at least 1");
        assert!(matches!(err, SearchError::InvalidInput(_)));
        assert!(err.is_invalid_input());

        let err = SearchError::execution_failure("match_text", "worker panicked");
        assert!(matches!(err, SearchError::ExecutionFailure { .. }));
        assert!(!err.is_invalid_input());

        let err = SearchError::extraction("report.txt", "invalid UTF-8");
        assert!(matches!(err, SearchError::Extraction { .. }));

        let err = SearchError::file_not_found(Path::new("missing.txt"));
        assert!(matches!(err, SearchError::FileNotFound(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::invalid_input("empty search list");
        assert_eq!(err.to_string(), "Invalid input: empty search list");

        let err = SearchError::execution_failure("match_text", "boom");
        assert_eq!(err.to_string(), "Task match_text failed: boom");

        let err = SearchError::PoolSaturationTimeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "No worker became free within 250ms");

        let err = SearchError::task_timeout("extract_text", Duration::from_secs(2));
        assert_eq!(err.to_string(), "Task extract_text did not finish within 2s");

        let err = SearchError::config_error("Missing required field");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );

        let err = SearchError::file_not_found("test.txt");
        assert_eq!(err.to_string(), "File not found: test.txt");
    }

    #[test]
    fn test_from_io_maps_kinds() {
        let path = Path::new("doc.txt");
        let err = SearchError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::from_io(path, std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert!(matches!(err, SearchError::IoError(_)));
    }
}
