//! Status and role enums shared across the workspace.
//!
//! Each enum carries its SQL string mapping (`as_sql` / `from_sql`) so the
//! repositories and the schema CHECK constraints agree on one vocabulary.
//! `from_sql` falls back to the most conservative reading of an unknown
//! value rather than failing a whole row scan.

use serde::{Deserialize, Serialize};

/// Profile role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A student logging clinical activity.
    Student,
    /// A supervising preceptor reviewing entries.
    Preceptor,
    /// An administrator managing assignments and locks.
    Admin,
}

impl Role {
    /// SQL string for this role.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Preceptor => "preceptor",
            Self::Admin => "admin",
        }
    }

    /// Parse a stored role string. Unknown values read as `Student`,
    /// the least-privileged role.
    #[must_use]
    pub fn from_sql(s: &str) -> Self {
        match s {
            "preceptor" => Self::Preceptor,
            "admin" => Self::Admin,
            _ => Self::Student,
        }
    }
}

/// Lifecycle state of a supervisory assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// The relationship is in force and counts against capacity.
    Active,
    /// The relationship was ended by an admin action.
    Ended,
}

impl AssignmentStatus {
    /// SQL string for this status.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    /// Parse a stored status string. Unknown values read as `Ended` so a
    /// corrupt row can never inflate a preceptor's active load.
    #[must_use]
    pub fn from_sql(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            _ => Self::Ended,
        }
    }
}

/// Review state of a clinical entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Created but not yet submitted for review.
    Draft,
    /// Awaiting the assigned preceptor's review.
    Pending,
    /// Accepted by the preceptor. Terminal for the student.
    Approved,
    /// Sent back with feedback; editable and resubmittable.
    Rejected,
}

impl EntryStatus {
    /// SQL string for this status.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stored status string. Unknown values read as `Pending`.
    #[must_use]
    pub fn from_sql(s: &str) -> Self {
        match s {
            "draft" => Self::Draft,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }

    /// True when the student may still change the entry's content.
    #[must_use]
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    /// True when `bulk_submit` may move the entry to `Pending`.
    #[must_use]
    pub fn is_submittable(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }
}

/// A preceptor's verdict on a pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Accept the entry.
    Approve,
    /// Return the entry with required feedback.
    Reject,
}

impl ReviewDecision {
    /// The entry status this decision produces.
    #[must_use]
    pub fn resulting_status(self) -> EntryStatus {
        match self {
            Self::Approve => EntryStatus::Approved,
            Self::Reject => EntryStatus::Rejected,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
