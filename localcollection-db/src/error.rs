use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors surfaced by the collection store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be created or opened
    #[error("Cannot open collection database at {}: {reason}", path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    /// The metadata table is missing its version or holds garbage
    #[error("Collection schema is corrupt: {0}")]
    SchemaCorrupt(String),

    /// The database was written by a newer schema than this code knows
    #[error("Collection schema version {found} is newer than supported version {expected}")]
    SchemaIncompatible { expected: i64, found: i64 },

    /// A unique or check constraint rejected a write
    #[error("{operation}: constraint violation: {source}")]
    ConstraintViolation {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Malformed statement or engine-level failure
    #[error("{operation}: query failed: {source}")]
    QueryFailed {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    pub fn storage_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema_corrupt(msg: impl Into<String>) -> Self {
        Self::SchemaCorrupt(msg.into())
    }

    /// Name of the operation that failed, for query-level errors.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::ConstraintViolation { operation, .. } | Self::QueryFailed { operation, .. } => {
                Some(operation)
            }
            _ => None,
        }
    }

    fn from_sqlite(operation: &'static str, source: rusqlite::Error) -> Self {
        let is_constraint = matches!(
            &source,
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
        );
        if is_constraint {
            Self::ConstraintViolation { operation, source }
        } else {
            Self::QueryFailed { operation, source }
        }
    }
}

/// Tags a `rusqlite` result with the name of the operation issuing it.
///
/// Every statement the store runs goes through `.during("op_name")`, so an
/// error always says which store operation produced it.
pub trait OperationContext<T> {
    fn during(self, operation: &'static str) -> Result<T, StoreError>;
}

impl<T> OperationContext<T> for rusqlite::Result<T> {
    fn during(self, operation: &'static str) -> Result<T, StoreError> {
        self.map_err(|e| StoreError::from_sqlite(operation, e))
    }
}
