//! Error type for logbook operations.

use precept_core::ids::{EntryId, StudentId};
use precept_core::types::EntryStatus;
use precept_store::StoreError;
use thiserror::Error;

/// Errors returned by the lifecycle manager and the lock registry.
#[derive(Debug, Error)]
pub enum LogbookError {
    /// A term lock covers the entry's date; the logbook is frozen for that
    /// term regardless of the entry's own status.
    #[error("logbook is locked for term {term}")]
    LogbookLocked {
        /// The locked term's label.
        term: String,
    },

    /// The entry's current status forbids this operation.
    #[error("entry is not editable in status {status:?}")]
    NotEditable {
        /// The status that blocked the operation.
        status: EntryStatus,
    },

    /// The caller is not the entry's owner, or not the student's currently
    /// assigned preceptor.
    #[error("caller is not authorized for this entry")]
    NotAuthorized,

    /// No entry with this ID.
    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),

    /// No student profile with this ID.
    #[error("student not found: {0}")]
    StudentNotFound(StudentId),

    /// The term label is not a defined term.
    #[error("term not found: {0}")]
    TermNotFound(String),

    /// A field value failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Persistence failure. Retryable by the caller with backoff.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for LogbookError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(StoreError::Sqlite(err))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
