//! Terms and per-term logbook locks.
//!
//! A term maps a label to an inclusive calendar range. A lock row for
//! (student, term) freezes every entry of that student dated inside the
//! range. Lock inserts use `INSERT OR IGNORE` so locking twice is a no-op,
//! with the returned flag telling the caller whether state changed.

use chrono::NaiveDate;
use precept_core::ids::StudentId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::repositories::{date_from_sql, date_to_sql, now_iso};
use crate::types::{Term, TermLock};

/// Repository for terms and term locks.
pub struct TermRepo;

impl TermRepo {
    /// Create or redefine a term's calendar range.
    pub fn upsert_term(conn: &Connection, term: &Term) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO terms (label, starts_on, ends_on) VALUES (?1, ?2, ?3)
             ON CONFLICT(label) DO UPDATE SET starts_on = ?2, ends_on = ?3",
            params![
                term.label,
                date_to_sql(term.starts_on),
                date_to_sql(term.ends_on)
            ],
        )?;
        Ok(())
    }

    /// Get a term by label.
    pub fn get_term(conn: &Connection, label: &str) -> Result<Option<Term>> {
        let term = conn
            .query_row(
                "SELECT label, starts_on, ends_on FROM terms WHERE label = ?1",
                params![label],
                term_from_row,
            )
            .optional()?;
        Ok(term)
    }

    /// The term whose range contains the given date, if any. Ranges are not
    /// expected to overlap; if they do, the earliest-starting term wins.
    pub fn term_covering(conn: &Connection, date: NaiveDate) -> Result<Option<Term>> {
        let term = conn
            .query_row(
                "SELECT label, starts_on, ends_on FROM terms
                 WHERE ?1 BETWEEN starts_on AND ends_on
                 ORDER BY starts_on LIMIT 1",
                params![date_to_sql(date)],
                term_from_row,
            )
            .optional()?;
        Ok(term)
    }

    /// List all terms, most recent first.
    pub fn list_terms(conn: &Connection) -> Result<Vec<Term>> {
        let mut stmt =
            conn.prepare("SELECT label, starts_on, ends_on FROM terms ORDER BY starts_on DESC")?;
        let terms = stmt
            .query_map([], term_from_row)?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(terms)
    }

    /// Insert a lock row. Returns true when the lock is new, false when the
    /// (student, term) pair was already locked.
    pub fn insert_lock(
        conn: &Connection,
        student_id: &StudentId,
        term: &str,
        locked_by: &str,
    ) -> Result<bool> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO term_locks (student_id, term, locked_by, locked_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![student_id.as_str(), term, locked_by, now_iso()],
        )?;
        Ok(changed > 0)
    }

    /// Remove a lock row. Returns true when a lock existed.
    pub fn remove_lock(conn: &Connection, student_id: &StudentId, term: &str) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM term_locks WHERE student_id = ?1 AND term = ?2",
            params![student_id.as_str(), term],
        )?;
        Ok(changed > 0)
    }

    /// Whether the (student, term) pair is locked.
    pub fn is_locked(conn: &Connection, student_id: &StudentId, term: &str) -> Result<bool> {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM term_locks WHERE student_id = ?1 AND term = ?2",
            params![student_id.as_str(), term],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All locks held against one student.
    pub fn locks_for_student(conn: &Connection, student_id: &StudentId) -> Result<Vec<TermLock>> {
        let mut stmt = conn.prepare(
            "SELECT student_id, term, locked_by, locked_at FROM term_locks
             WHERE student_id = ?1 ORDER BY locked_at",
        )?;
        let locks = stmt
            .query_map(params![student_id.as_str()], |row| {
                Ok(TermLock {
                    student_id: StudentId::from(row.get::<_, String>(0)?),
                    term: row.get(1)?,
                    locked_by: row.get(2)?,
                    locked_at: row.get(3)?,
                })
            })?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(locks)
    }
}

fn term_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Term> {
    Ok(Term {
        label: row.get(0)?,
        starts_on: date_from_sql(&row.get::<_, String>(1)?),
        ends_on: date_from_sql(&row.get::<_, String>(2)?),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
