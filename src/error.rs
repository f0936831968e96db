//! Error types for panel-index
//!
//! A closed set of error kinds so callers can branch on what went wrong
//! (connection, schema, cancellation, rebuild) without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Underlying cause of a connection failure
#[derive(Error, Debug)]
pub enum ConnectionCause {
    /// Creating the index directory or touching the file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// SQLite refused to open or configure the connection
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Main error type for index operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// Directory, file or connection setup failures
    #[error("Connection error for {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: ConnectionCause,
    },

    /// DDL or migration statement failure; the step was rolled back
    #[error("Schema error at step {step}: {source}")]
    Schema {
        step: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// The index file is unreadable or fails a health probe
    #[error("Corruption detected in {}: {reason}", path.display())]
    CorruptionDetected { path: PathBuf, reason: String },

    /// Self-healing rebuild failed; there is no further recovery tier
    #[error("Rebuild failed for {}: {source}", path.display())]
    RebuildFailed {
        path: PathBuf,
        #[source]
        source: Box<IndexError>,
    },

    /// The caller's deadline passed while the operation was running
    #[error("{op} timed out")]
    QueryTimeout { op: &'static str },

    /// The caller canceled the operation
    #[error("{op} canceled")]
    Canceled { op: &'static str },

    /// Any other statement failure, tagged with the operation name
    #[error("Database error in {op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    /// Wrap a statement failure with the name of the operation that issued it
    pub(crate) fn db(op: &'static str) -> impl FnOnce(rusqlite::Error) -> IndexError {
        move |source| IndexError::Database { op, source }
    }

    /// Wrap a DDL/DML failure inside migration step `step`
    pub(crate) fn schema(step: u32) -> impl FnOnce(rusqlite::Error) -> IndexError {
        move |source| IndexError::Schema { step, source }
    }

    /// True for timeouts and cancellations ("try again"), false for real failures
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            IndexError::QueryTimeout { .. } | IndexError::Canceled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = IndexError::QueryTimeout { op: "search" };
        assert_eq!(error.to_string(), "search timed out");

        let error = IndexError::Config("max_limit must be positive".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: max_limit must be positive"
        );
    }

    #[test]
    fn test_error_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let index_error = IndexError::from(io_error);

        match index_error {
            IndexError::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_schema_error_carries_step() {
        let err = IndexError::schema(3)(rusqlite::Error::InvalidQuery);
        match err {
            IndexError::Schema { step, .. } => assert_eq!(step, 3),
            other => panic!("Expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_cancellation_kinds() {
        assert!(IndexError::Canceled { op: "rebuild" }.is_cancellation());
        assert!(IndexError::QueryTimeout { op: "search" }.is_cancellation());
        assert!(!IndexError::Config("x".into()).is_cancellation());
    }
}
