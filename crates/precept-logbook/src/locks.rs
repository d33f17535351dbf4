//! Per-term logbook locks.
//!
//! A lock on (student, term) freezes every entry of that student dated
//! inside the term's calendar range. Locking and unlocking are idempotent;
//! a `LockChanged` event is published only when stored state actually
//! changed, so repeated locks do not spam dashboards.

use std::sync::Arc;

use chrono::NaiveDate;
use precept_core::events::DomainEvent;
use precept_core::ids::StudentId;
use precept_notify::ChangeNotifier;
use precept_store::connection::{ConnectionPool, PooledConnection};
use precept_store::repositories::{AppendAudit, AuditRepo, ProfileRepo, TermRepo};
use precept_store::types::{Term, TermLock};
use precept_store::StoreError;
use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::errors::LogbookError;

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Whether any term lock of this student covers the given date. Runs on the
/// caller's connection so the lifecycle manager can consult it inside its
/// own transaction.
pub(crate) fn date_locked(
    conn: &Connection,
    student_id: &StudentId,
    date: NaiveDate,
) -> Result<Option<String>, LogbookError> {
    match TermRepo::term_covering(conn, date)? {
        Some(term) if TermRepo::is_locked(conn, student_id, &term.label)? => Ok(Some(term.label)),
        _ => Ok(None),
    }
}

/// Outcome of one student within a [`TermLockRegistry::lock_many`] batch.
#[derive(Debug)]
pub struct LockOutcome {
    /// The student the outcome applies to.
    pub student_id: StudentId,
    /// `Ok(true)` when a new lock was created, `Ok(false)` when the pair
    /// was already locked, `Err` when this student's lock failed.
    pub result: Result<bool, LogbookError>,
}

/// Owns term definitions and term-lock rows.
pub struct TermLockRegistry {
    pool: ConnectionPool,
    notifier: Arc<ChangeNotifier>,
}

impl TermLockRegistry {
    /// Create a registry over the given pool and notifier.
    pub fn new(pool: ConnectionPool, notifier: Arc<ChangeNotifier>) -> Self {
        Self { pool, notifier }
    }

    fn conn(&self) -> Result<PooledConnection, LogbookError> {
        self.pool.get().map_err(StoreError::Pool).map_err(Into::into)
    }

    /// Define a term or redefine its calendar range.
    pub fn define_term(
        &self,
        label: &str,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Result<Term, LogbookError> {
        if label.trim().is_empty() {
            return Err(LogbookError::Validation("term label is required".into()));
        }
        if ends_on < starts_on {
            return Err(LogbookError::Validation(format!(
                "term {label} ends before it starts"
            )));
        }
        let term = Term {
            label: label.to_owned(),
            starts_on,
            ends_on,
        };
        let conn = self.conn()?;
        TermRepo::upsert_term(&conn, &term)?;
        Ok(term)
    }

    /// Lock a student's logbook for a term. Idempotent: locking an
    /// already-locked pair succeeds without changing anything. Returns
    /// whether a new lock was created.
    pub fn lock(
        &self,
        student_id: &StudentId,
        term: &str,
        locked_by: &str,
    ) -> Result<bool, LogbookError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        if TermRepo::get_term(&tx, term)?.is_none() {
            return Err(LogbookError::TermNotFound(term.to_owned()));
        }
        if ProfileRepo::get_student(&tx, student_id)?.is_none() {
            return Err(LogbookError::StudentNotFound(student_id.clone()));
        }

        let created = TermRepo::insert_lock(&tx, student_id, term, locked_by)?;
        if created {
            AuditRepo::append(
                &tx,
                &AppendAudit {
                    actor_id: Some(locked_by),
                    action: "lock_term",
                    entity_type: "term_lock",
                    entity_id: student_id.as_str(),
                    detail: Some(serde_json::json!({ "term": term })),
                },
            )?;
        }
        tx.commit().map_err(StoreError::Sqlite)?;

        if created {
            info!(%student_id, term, "logbook locked");
            let _ = self.notifier.publish(&DomainEvent::LockChanged {
                student_id: student_id.clone(),
                term: term.to_owned(),
                locked: true,
                at: now_iso(),
            });
        }
        Ok(created)
    }

    /// Remove a student's lock for a term. Idempotent. Returns whether a
    /// lock was actually removed.
    pub fn unlock(
        &self,
        student_id: &StudentId,
        term: &str,
        unlocked_by: &str,
    ) -> Result<bool, LogbookError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        let removed = TermRepo::remove_lock(&tx, student_id, term)?;
        if removed {
            AuditRepo::append(
                &tx,
                &AppendAudit {
                    actor_id: Some(unlocked_by),
                    action: "unlock_term",
                    entity_type: "term_lock",
                    entity_id: student_id.as_str(),
                    detail: Some(serde_json::json!({ "term": term })),
                },
            )?;
        }
        tx.commit().map_err(StoreError::Sqlite)?;

        if removed {
            info!(%student_id, term, "logbook unlocked");
            let _ = self.notifier.publish(&DomainEvent::LockChanged {
                student_id: student_id.clone(),
                term: term.to_owned(),
                locked: false,
                at: now_iso(),
            });
        }
        Ok(removed)
    }

    /// Whether (student, term) is locked.
    pub fn is_locked(&self, student_id: &StudentId, term: &str) -> Result<bool, LogbookError> {
        let conn = self.conn()?;
        Ok(TermRepo::is_locked(&conn, student_id, term)?)
    }

    /// Whether any lock of this student covers the given date.
    pub fn is_date_locked(
        &self,
        student_id: &StudentId,
        date: NaiveDate,
    ) -> Result<bool, LogbookError> {
        let conn = self.conn()?;
        Ok(date_locked(&conn, student_id, date)?.is_some())
    }

    /// All locks held against one student.
    pub fn locks_for_student(&self, student_id: &StudentId) -> Result<Vec<TermLock>, LogbookError> {
        let conn = self.conn()?;
        Ok(TermRepo::locks_for_student(&conn, student_id)?)
    }

    /// Lock many students' logbooks for one term. The term is validated
    /// once; each student is then checked and locked independently, so one
    /// failure never aborts the rest of the batch.
    pub fn lock_many(
        &self,
        student_ids: &[StudentId],
        term: &str,
        locked_by: &str,
    ) -> Result<Vec<LockOutcome>, LogbookError> {
        {
            let conn = self.conn()?;
            if TermRepo::get_term(&conn, term)?.is_none() {
                return Err(LogbookError::TermNotFound(term.to_owned()));
            }
        }

        let outcomes = student_ids
            .iter()
            .map(|student_id| LockOutcome {
                student_id: student_id.clone(),
                result: self.lock(student_id, term, locked_by),
            })
            .collect();
        Ok(outcomes)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
