//! Entity structs and parameter types for the repositories.
//!
//! Timestamps are ISO-8601 UTC strings as stored; entry dates are
//! [`chrono::NaiveDate`] serialized as `YYYY-MM-DD`.

use chrono::NaiveDate;
use precept_core::ids::{AssignmentId, EntryId, InstitutionId, PreceptorId, StudentId};
use precept_core::types::{AssignmentStatus, EntryStatus};
use serde::{Deserialize, Serialize};

/// A teaching institution. Students and preceptors must share one to be
/// assignable to each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    /// Institution ID.
    pub id: InstitutionId,
    /// Display name, unique.
    pub name: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// A student profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Profile ID.
    pub id: StudentId,
    /// Unique email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Institution membership, set by an admin.
    pub institution_id: Option<InstitutionId>,
    /// Creation timestamp.
    pub created_at: String,
}

/// A preceptor profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preceptor {
    /// Profile ID.
    pub id: PreceptorId,
    /// Unique email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Display-only specialty.
    pub specialty: Option<String>,
    /// Institution membership, set by an admin.
    pub institution_id: Option<InstitutionId>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Parameters for registering a student.
#[derive(Clone, Debug, Default)]
pub struct CreateStudent {
    /// Unique email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Optional institution at registration time.
    pub institution_id: Option<InstitutionId>,
}

/// Parameters for registering a preceptor.
#[derive(Clone, Debug, Default)]
pub struct CreatePreceptor {
    /// Unique email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Display-only specialty.
    pub specialty: Option<String>,
    /// Optional institution at registration time.
    pub institution_id: Option<InstitutionId>,
}

/// A supervisory relationship between one student and one preceptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assignment ID.
    pub id: AssignmentId,
    /// The supervised student.
    pub student_id: StudentId,
    /// The supervising preceptor.
    pub preceptor_id: PreceptorId,
    /// Active or ended.
    pub status: AssignmentStatus,
    /// Creation timestamp.
    pub created_at: String,
    /// Set when the assignment was ended.
    pub ended_at: Option<String>,
}

/// A single logged clinical activity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEntry {
    /// Entry ID.
    pub id: EntryId,
    /// The owning student.
    pub student_id: StudentId,
    /// Date the activity took place.
    pub date: NaiveDate,
    /// Where the activity took place.
    pub location: String,
    /// Specialty area.
    pub specialty: String,
    /// Clinical hours, non-negative.
    pub hours: f64,
    /// Activities performed.
    pub activities: Option<String>,
    /// Learning objectives.
    pub learning_objectives: Option<String>,
    /// Student reflection.
    pub reflection: Option<String>,
    /// Supervisor named on the entry (free text, not a profile reference).
    pub supervisor_name: Option<String>,
    /// Number of patients seen.
    pub patients_seen: Option<i64>,
    /// Review status.
    pub status: EntryStatus,
    /// Most recent reviewer feedback. Retained across resubmissions.
    pub feedback: Option<String>,
    /// When the entry last entered review.
    pub submitted_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last modification timestamp.
    pub updated_at: String,
}

/// Content fields for a new clinical entry.
#[derive(Clone, Debug)]
pub struct NewEntry {
    /// Date the activity took place.
    pub date: NaiveDate,
    /// Where the activity took place.
    pub location: String,
    /// Specialty area.
    pub specialty: String,
    /// Clinical hours, non-negative.
    pub hours: f64,
    /// Activities performed.
    pub activities: Option<String>,
    /// Learning objectives.
    pub learning_objectives: Option<String>,
    /// Student reflection.
    pub reflection: Option<String>,
    /// Supervisor named on the entry.
    pub supervisor_name: Option<String>,
    /// Number of patients seen.
    pub patients_seen: Option<i64>,
}

/// Partial update of an entry's content. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct EntryPatch {
    /// New activity date.
    pub date: Option<NaiveDate>,
    /// New location.
    pub location: Option<String>,
    /// New specialty.
    pub specialty: Option<String>,
    /// New hours value, non-negative.
    pub hours: Option<f64>,
    /// New activities text.
    pub activities: Option<String>,
    /// New learning objectives.
    pub learning_objectives: Option<String>,
    /// New reflection.
    pub reflection: Option<String>,
    /// New supervisor name.
    pub supervisor_name: Option<String>,
    /// New patient count.
    pub patients_seen: Option<i64>,
}

/// An academic period with a calendar range, used to scope logbook locks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Term label, e.g. "Fall 2025". Primary key.
    pub label: String,
    /// First day of the term, inclusive.
    pub starts_on: NaiveDate,
    /// Last day of the term, inclusive.
    pub ends_on: NaiveDate,
}

/// An administrative freeze of one student's entries for one term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermLock {
    /// The locked student.
    pub student_id: StudentId,
    /// The locked term label.
    pub term: String,
    /// Admin who placed the lock.
    pub locked_by: String,
    /// When the lock was placed.
    pub locked_at: String,
}

/// One appended audit record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Row ID.
    pub id: i64,
    /// Who performed the action, if known.
    pub actor_id: Option<String>,
    /// Action name, e.g. "assign".
    pub action: String,
    /// Affected entity family.
    pub entity_type: String,
    /// Affected entity ID.
    pub entity_id: String,
    /// Structured context.
    pub detail: Option<serde_json::Value>,
    /// When the action happened.
    pub created_at: String,
}

/// A preceptor together with their current active-student load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreceptorLoad {
    /// The preceptor.
    pub preceptor: Preceptor,
    /// Count of active assignments.
    pub active_students: u32,
    /// The capacity limit the count is measured against.
    pub max_students: u32,
}

/// Aggregate statistics over one student's logbook.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogbookStats {
    /// Total entries of any status.
    pub total_entries: u32,
    /// Sum of hours across all entries.
    pub total_hours: f64,
    /// Entries still in draft.
    pub draft_count: u32,
    /// Entries awaiting review.
    pub pending_count: u32,
    /// Approved entries.
    pub approved_count: u32,
    /// Rejected entries.
    pub rejected_count: u32,
}
