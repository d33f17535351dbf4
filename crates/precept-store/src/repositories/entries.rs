//! Clinical log entry rows.
//!
//! Status writes are only reached through the logbook lifecycle manager,
//! which validates transitions and lock state first. Content updates use a
//! dynamic SET clause so untouched fields stay untouched.

use precept_core::ids::{EntryId, PreceptorId, StudentId};
use precept_core::types::EntryStatus;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::repositories::{date_from_sql, date_to_sql, now_iso};
use crate::types::{ClinicalEntry, EntryPatch, LogbookStats, NewEntry};

const ENTRY_COLUMNS: &str = "id, student_id, entry_date, location, specialty, hours, activities,
     learning_objectives, reflection, supervisor_name, patients_seen, status,
     feedback, submitted_at, created_at, updated_at";

/// Repository for clinical entries.
pub struct EntryRepo;

impl EntryRepo {
    /// Insert a new entry with the given initial status. `submitted_at` is
    /// stamped when the entry starts out pending.
    pub fn create(
        conn: &Connection,
        student_id: &StudentId,
        fields: &NewEntry,
        status: EntryStatus,
    ) -> Result<ClinicalEntry> {
        let id = EntryId::new();
        let now = now_iso();
        let submitted_at = (status == EntryStatus::Pending).then(|| now.clone());
        let _ = conn.execute(
            "INSERT INTO log_entries (id, student_id, entry_date, location, specialty, hours,
             activities, learning_objectives, reflection, supervisor_name, patients_seen,
             status, feedback, submitted_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, NULL, ?13, ?14, ?14)",
            params![
                id.as_str(),
                student_id.as_str(),
                date_to_sql(fields.date),
                fields.location,
                fields.specialty,
                fields.hours,
                fields.activities,
                fields.learning_objectives,
                fields.reflection,
                fields.supervisor_name,
                fields.patients_seen,
                status.as_sql(),
                submitted_at,
                now,
            ],
        )?;
        Self::get(conn, &id)?.ok_or_else(|| {
            // The row was just inserted on this connection.
            rusqlite::Error::QueryReturnedNoRows.into()
        })
    }

    /// Get an entry by ID.
    pub fn get(conn: &Connection, id: &EntryId) -> Result<Option<ClinicalEntry>> {
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM log_entries WHERE id = ?1"),
                params![id.as_str()],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Apply a content patch. Returns false when the entry does not exist.
    pub fn update_content(conn: &Connection, id: &EntryId, patch: &EntryPatch) -> Result<bool> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(date) = patch.date {
            sets.push("entry_date = ?");
            values.push(Box::new(date_to_sql(date)));
        }
        if let Some(ref location) = patch.location {
            sets.push("location = ?");
            values.push(Box::new(location.clone()));
        }
        if let Some(ref specialty) = patch.specialty {
            sets.push("specialty = ?");
            values.push(Box::new(specialty.clone()));
        }
        if let Some(hours) = patch.hours {
            sets.push("hours = ?");
            values.push(Box::new(hours));
        }
        if let Some(ref activities) = patch.activities {
            sets.push("activities = ?");
            values.push(Box::new(activities.clone()));
        }
        if let Some(ref objectives) = patch.learning_objectives {
            sets.push("learning_objectives = ?");
            values.push(Box::new(objectives.clone()));
        }
        if let Some(ref reflection) = patch.reflection {
            sets.push("reflection = ?");
            values.push(Box::new(reflection.clone()));
        }
        if let Some(ref supervisor) = patch.supervisor_name {
            sets.push("supervisor_name = ?");
            values.push(Box::new(supervisor.clone()));
        }
        if let Some(patients_seen) = patch.patients_seen {
            sets.push("patients_seen = ?");
            values.push(Box::new(patients_seen));
        }

        if sets.is_empty() {
            return Ok(Self::get(conn, id)?.is_some());
        }

        sets.push("updated_at = ?");
        values.push(Box::new(now_iso()));
        values.push(Box::new(id.as_str().to_owned()));

        let sql = format!("UPDATE log_entries SET {} WHERE id = ?", sets.join(", "));
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(AsRef::as_ref).collect();
        let changed = conn.execute(&sql, params_refs.as_slice())?;
        Ok(changed > 0)
    }

    /// Set an entry's review status. `feedback`, when given, replaces the
    /// stored feedback; `stamp_submission` refreshes `submitted_at` (used
    /// when an entry (re)enters review). Returns false when the entry does
    /// not exist.
    pub fn set_status(
        conn: &Connection,
        id: &EntryId,
        status: EntryStatus,
        feedback: Option<&str>,
        stamp_submission: bool,
    ) -> Result<bool> {
        let now = now_iso();
        let changed = match (feedback, stamp_submission) {
            (Some(fb), true) => conn.execute(
                "UPDATE log_entries SET status = ?1, feedback = ?2, submitted_at = ?3,
                 updated_at = ?3 WHERE id = ?4",
                params![status.as_sql(), fb, now, id.as_str()],
            )?,
            (Some(fb), false) => conn.execute(
                "UPDATE log_entries SET status = ?1, feedback = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![status.as_sql(), fb, now, id.as_str()],
            )?,
            (None, true) => conn.execute(
                "UPDATE log_entries SET status = ?1, submitted_at = ?2, updated_at = ?2
                 WHERE id = ?3",
                params![status.as_sql(), now, id.as_str()],
            )?,
            (None, false) => conn.execute(
                "UPDATE log_entries SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_sql(), now, id.as_str()],
            )?,
        };
        Ok(changed > 0)
    }

    /// All entries of one student, newest activity date first.
    pub fn list_for_student(conn: &Connection, student_id: &StudentId) -> Result<Vec<ClinicalEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM log_entries
             WHERE student_id = ?1 ORDER BY entry_date DESC, created_at DESC"
        ))?;
        let entries = stmt
            .query_map(params![student_id.as_str()], entry_from_row)?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(entries)
    }

    /// Pending entries across every student currently assigned to the
    /// preceptor, oldest submission first. The preceptor's review queue.
    pub fn pending_for_preceptor(
        conn: &Connection,
        preceptor_id: &PreceptorId,
    ) -> Result<Vec<ClinicalEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {cols} FROM log_entries e
             JOIN assignments a ON a.student_id = e.student_id
             WHERE a.preceptor_id = ?1 AND a.status = 'active' AND e.status = 'pending'
             ORDER BY e.submitted_at",
            cols = ENTRY_COLUMNS
                .split(',')
                .map(|c| format!("e.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;
        let entries = stmt
            .query_map(params![preceptor_id.as_str()], entry_from_row)?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(entries)
    }

    /// Aggregate totals for one student's logbook.
    pub fn stats_for_student(conn: &Connection, student_id: &StudentId) -> Result<LogbookStats> {
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(hours), 0),
                    COALESCE(SUM(status = 'draft'), 0),
                    COALESCE(SUM(status = 'pending'), 0),
                    COALESCE(SUM(status = 'approved'), 0),
                    COALESCE(SUM(status = 'rejected'), 0)
             FROM log_entries WHERE student_id = ?1",
            params![student_id.as_str()],
            |row| {
                Ok(LogbookStats {
                    total_entries: row.get(0)?,
                    total_hours: row.get(1)?,
                    draft_count: row.get(2)?,
                    pending_count: row.get(3)?,
                    approved_count: row.get(4)?,
                    rejected_count: row.get(5)?,
                })
            },
        )
        .map_err(Into::into)
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClinicalEntry> {
    Ok(ClinicalEntry {
        id: EntryId::from(row.get::<_, String>(0)?),
        student_id: StudentId::from(row.get::<_, String>(1)?),
        date: date_from_sql(&row.get::<_, String>(2)?),
        location: row.get(3)?,
        specialty: row.get(4)?,
        hours: row.get(5)?,
        activities: row.get(6)?,
        learning_objectives: row.get(7)?,
        reflection: row.get(8)?,
        supervisor_name: row.get(9)?,
        patients_seen: row.get(10)?,
        status: EntryStatus::from_sql(&row.get::<_, String>(11)?),
        feedback: row.get(12)?,
        submitted_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
