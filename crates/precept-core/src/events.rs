//! Change events published after successful mutations.
//!
//! Every engine hands the result of a committed mutation to the notifier as
//! a [`DomainEvent`]. Dashboards subscribe per [`EntityKind`] and use the
//! carried IDs to refresh only the views they care about. Events are
//! transient: nothing here is persisted or replayed.

use serde::{Deserialize, Serialize};

use crate::ids::{AssignmentId, EntryId, PreceptorId, StudentId};
use crate::types::EntryStatus;

/// The entity family an event belongs to. One broadcast channel exists
/// per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Student ↔ preceptor assignments.
    Assignment,
    /// Clinical log entries.
    ClinicalEntry,
    /// Per-term logbook locks.
    TermLock,
}

/// A change to the shared data set, keyed by the affected parties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A new active assignment was created.
    AssignmentCreated {
        /// The assignment row.
        assignment_id: AssignmentId,
        /// The assigned student.
        student_id: StudentId,
        /// The supervising preceptor.
        preceptor_id: PreceptorId,
        /// ISO-8601 UTC timestamp of the commit.
        at: String,
    },

    /// An assignment was ended by an admin.
    AssignmentEnded {
        /// The assignment row.
        assignment_id: AssignmentId,
        /// The formerly assigned student.
        student_id: StudentId,
        /// The formerly supervising preceptor.
        preceptor_id: PreceptorId,
        /// ISO-8601 UTC timestamp of the commit.
        at: String,
    },

    /// A clinical entry was created, edited, submitted, or reviewed.
    ClinicalEntryChanged {
        /// The entry that changed.
        entry_id: EntryId,
        /// The owning student.
        student_id: StudentId,
        /// The entry's status after the change.
        status: EntryStatus,
        /// ISO-8601 UTC timestamp of the commit.
        at: String,
    },

    /// A term lock was created or removed.
    LockChanged {
        /// The student whose logbook is affected.
        student_id: StudentId,
        /// The term label.
        term: String,
        /// True when the term is now locked.
        locked: bool,
        /// ISO-8601 UTC timestamp of the commit.
        at: String,
    },
}

impl DomainEvent {
    /// The channel this event is delivered on.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::AssignmentCreated { .. } | Self::AssignmentEnded { .. } => {
                EntityKind::Assignment
            }
            Self::ClinicalEntryChanged { .. } => EntityKind::ClinicalEntry,
            Self::LockChanged { .. } => EntityKind::TermLock,
        }
    }

    /// Snake-case event name, stable across releases.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AssignmentCreated { .. } => "assignment_created",
            Self::AssignmentEnded { .. } => "assignment_ended",
            Self::ClinicalEntryChanged { .. } => "clinical_entry_changed",
            Self::LockChanged { .. } => "lock_changed",
        }
    }

    /// The student every event variant is keyed by.
    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        match self {
            Self::AssignmentCreated { student_id, .. }
            | Self::AssignmentEnded { student_id, .. }
            | Self::ClinicalEntryChanged { student_id, .. }
            | Self::LockChanged { student_id, .. } => student_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
