//! Error type for assignment operations.
//!
//! Every domain rejection is its own variant so callers can render a
//! specific message; only `Store` wraps infrastructure failures, which are
//! the retryable class.

use precept_core::ids::{AssignmentId, PreceptorId, StudentId};
use precept_store::StoreError;
use thiserror::Error;

/// Errors returned by the assignment engine.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The student already has an active assignment. Carries the current
    /// preceptor so the caller can say who.
    #[error("student already assigned to {preceptor_name}")]
    DuplicateActive {
        /// The preceptor currently supervising the student.
        preceptor_id: PreceptorId,
        /// That preceptor's display name, for rendering.
        preceptor_name: String,
    },

    /// Student and preceptor are not in the same institution, or one of
    /// them has no institution at all.
    #[error("student and preceptor institutions do not match")]
    InstitutionMismatch,

    /// The preceptor is already supervising the maximum number of students.
    #[error("preceptor {preceptor_id} is at capacity ({limit} students)")]
    CapacityExceeded {
        /// The preceptor whose capacity is exhausted.
        preceptor_id: PreceptorId,
        /// The capacity limit that was hit.
        limit: u32,
    },

    /// No student profile with this ID.
    #[error("student not found: {0}")]
    StudentNotFound(StudentId),

    /// No preceptor profile with this ID.
    #[error("preceptor not found: {0}")]
    PreceptorNotFound(PreceptorId),

    /// No assignment row with this ID.
    #[error("assignment not found: {0}")]
    AssignmentNotFound(AssignmentId),

    /// The assignment exists but is not active, so it cannot be ended.
    #[error("assignment {0} is not active")]
    NotActive(AssignmentId),

    /// Persistence failure. Retryable by the caller with backoff.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for AssignmentError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(StoreError::Sqlite(err))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
