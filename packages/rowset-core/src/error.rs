//! Database error types.

use thiserror::Error;

use crate::row::RowId;

/// Database operation errors.
#[derive(Error, Debug, Clone)]
pub enum DbError {
    /// Operation not supported by the cursor type or concurrency mode
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Access while the cursor is not on a row that permits it
    #[error("Invalid cursor position: {0}")]
    InvalidCursorPosition(String),

    /// Column name or index did not match the result window
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    /// Row was deleted through the result window
    #[error("Row {row} has been deleted")]
    RowDeleted { row: RowId },

    /// Statement rejected by the store
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Commit stopped at the first failing edit
    #[error("Commit failed at edit {index}: {source}")]
    CommitFailed {
        index: usize,
        #[source]
        source: Box<DbError>,
    },

    /// Batch stopped at the first failing statement
    #[error("Batch failed at statement {index}: {source}")]
    BatchFailed {
        index: usize,
        counts: Vec<usize>,
        #[source]
        source: Box<DbError>,
    },

    /// Transaction ended by a failed commit and must be reset
    #[error("Transaction ended; reset or reconnect")]
    TransactionEnded,

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Table not found
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Table already exists
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    /// Row identifier not present in the table
    #[error("Row {row} not found in table '{table}'")]
    RowNotFound { table: String, row: RowId },

    /// Type mismatch error
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// NOT NULL or PRIMARY KEY violated
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    IoError(String),

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl DbError {
    /// Index of the failing edit when this is a `CommitFailed`.
    pub fn commit_failed_index(&self) -> Option<usize> {
        match self {
            DbError::CommitFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}
