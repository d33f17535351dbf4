//! The clinical-entry state machine.
//!
//! States: draft → pending → approved/rejected, with rejected entries
//! returning to pending on edit (resubmission). A term lock on the entry's
//! date freezes the entry ahead of every status rule, so the lock check
//! always runs first. Every successful transition is audited in the same
//! transaction and published after commit.

use std::sync::Arc;

use precept_core::events::DomainEvent;
use precept_core::ids::{EntryId, PreceptorId, StudentId};
use precept_core::types::{EntryStatus, ReviewDecision};
use precept_notify::ChangeNotifier;
use precept_store::connection::{ConnectionPool, PooledConnection};
use precept_store::repositories::{AppendAudit, AssignmentRepo, AuditRepo, EntryRepo, ProfileRepo};
use precept_store::types::{ClinicalEntry, EntryPatch, LogbookStats, NewEntry};
use precept_store::StoreError;
use rusqlite::TransactionBehavior;
use tracing::info;

use crate::errors::LogbookError;
use crate::locks::date_locked;

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// What happens to a newly created entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateDisposition {
    /// Submit immediately: the entry starts out `Pending`.
    Submit,
    /// Keep as a draft for a later [`EntryLifecycleManager::bulk_submit`].
    Draft,
}

/// Outcome of one entry within a [`EntryLifecycleManager::bulk_submit`]
/// batch.
#[derive(Debug)]
pub struct SubmitOutcome {
    /// The entry the outcome applies to.
    pub entry_id: EntryId,
    /// The entry's status after the attempt, or why it failed.
    pub result: Result<EntryStatus, LogbookError>,
}

/// Owns every status write on clinical entries.
pub struct EntryLifecycleManager {
    pool: ConnectionPool,
    notifier: Arc<ChangeNotifier>,
}

impl EntryLifecycleManager {
    /// Create a manager over the given pool and notifier.
    pub fn new(pool: ConnectionPool, notifier: Arc<ChangeNotifier>) -> Self {
        Self { pool, notifier }
    }

    fn conn(&self) -> Result<PooledConnection, LogbookError> {
        self.pool.get().map_err(StoreError::Pool).map_err(Into::into)
    }

    fn publish_change(&self, entry: &ClinicalEntry) {
        let _ = self.notifier.publish(&DomainEvent::ClinicalEntryChanged {
            entry_id: entry.id.clone(),
            student_id: entry.student_id.clone(),
            status: entry.status,
            at: now_iso(),
        });
    }

    /// Create an entry for a student.
    ///
    /// Rejected with [`LogbookError::LogbookLocked`] when a term lock
    /// covers the entry's date, before any row is written.
    pub fn create(
        &self,
        student_id: &StudentId,
        fields: &NewEntry,
        disposition: CreateDisposition,
    ) -> Result<ClinicalEntry, LogbookError> {
        if !fields.hours.is_finite() || fields.hours < 0.0 {
            return Err(LogbookError::Validation("hours must be non-negative".into()));
        }

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        if ProfileRepo::get_student(&tx, student_id)?.is_none() {
            return Err(LogbookError::StudentNotFound(student_id.clone()));
        }
        if let Some(term) = date_locked(&tx, student_id, fields.date)? {
            return Err(LogbookError::LogbookLocked { term });
        }

        let status = match disposition {
            CreateDisposition::Submit => EntryStatus::Pending,
            CreateDisposition::Draft => EntryStatus::Draft,
        };
        let entry = EntryRepo::create(&tx, student_id, fields, status)?;
        AuditRepo::append(
            &tx,
            &AppendAudit {
                actor_id: Some(student_id.as_str()),
                action: "create_entry",
                entity_type: "entry",
                entity_id: entry.id.as_str(),
                detail: Some(serde_json::json!({
                    "date": entry.date.to_string(),
                    "status": status.as_sql(),
                })),
            },
        )?;
        tx.commit().map_err(StoreError::Sqlite)?;

        info!(entry_id = %entry.id, %student_id, status = status.as_sql(), "entry created");
        self.publish_change(&entry);
        Ok(entry)
    }

    /// Edit an entry's content.
    ///
    /// Allowed only for the owning student, only while no term lock covers
    /// the entry's current (or new) date, and only in `Draft` or `Rejected`
    /// status. Editing a rejected entry re-queues it for review: status
    /// returns to `Pending` and `submitted_at` is refreshed, while the
    /// reviewer's previous feedback stays readable.
    pub fn edit(
        &self,
        entry_id: &EntryId,
        editor: &StudentId,
        patch: &EntryPatch,
    ) -> Result<ClinicalEntry, LogbookError> {
        if let Some(hours) = patch.hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(LogbookError::Validation("hours must be non-negative".into()));
            }
        }

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        let entry = EntryRepo::get(&tx, entry_id)?
            .ok_or_else(|| LogbookError::EntryNotFound(entry_id.clone()))?;
        if entry.student_id != *editor {
            return Err(LogbookError::NotAuthorized);
        }

        // The lock gate outranks every status rule.
        if let Some(term) = date_locked(&tx, editor, entry.date)? {
            return Err(LogbookError::LogbookLocked { term });
        }
        if let Some(new_date) = patch.date {
            if let Some(term) = date_locked(&tx, editor, new_date)? {
                return Err(LogbookError::LogbookLocked { term });
            }
        }

        if !entry.status.is_editable() {
            return Err(LogbookError::NotEditable {
                status: entry.status,
            });
        }

        let _ = EntryRepo::update_content(&tx, entry_id, patch)?;
        let resubmitted = entry.status == EntryStatus::Rejected;
        if resubmitted {
            let _ = EntryRepo::set_status(&tx, entry_id, EntryStatus::Pending, None, true)?;
        }
        AuditRepo::append(
            &tx,
            &AppendAudit {
                actor_id: Some(editor.as_str()),
                action: if resubmitted { "resubmit_entry" } else { "edit_entry" },
                entity_type: "entry",
                entity_id: entry_id.as_str(),
                detail: None,
            },
        )?;

        let updated = EntryRepo::get(&tx, entry_id)?
            .ok_or_else(|| LogbookError::EntryNotFound(entry_id.clone()))?;
        tx.commit().map_err(StoreError::Sqlite)?;

        info!(%entry_id, resubmitted, "entry edited");
        self.publish_change(&updated);
        Ok(updated)
    }

    /// Review a pending entry.
    ///
    /// Only the student's currently assigned preceptor may review, and a
    /// rejection must carry feedback for the student to act on. Approval
    /// makes the entry immutable to the student through the status rules
    /// alone.
    pub fn review(
        &self,
        entry_id: &EntryId,
        reviewer: &PreceptorId,
        decision: ReviewDecision,
        feedback: &str,
    ) -> Result<ClinicalEntry, LogbookError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        let entry = EntryRepo::get(&tx, entry_id)?
            .ok_or_else(|| LogbookError::EntryNotFound(entry_id.clone()))?;
        if entry.status != EntryStatus::Pending {
            return Err(LogbookError::NotEditable {
                status: entry.status,
            });
        }

        let assigned = AssignmentRepo::active_for_student(&tx, &entry.student_id)?
            .is_some_and(|a| a.preceptor_id == *reviewer);
        if !assigned {
            return Err(LogbookError::NotAuthorized);
        }

        if decision == ReviewDecision::Reject && feedback.trim().is_empty() {
            return Err(LogbookError::Validation(
                "feedback is required when rejecting an entry".into(),
            ));
        }

        let status = decision.resulting_status();
        let _ = EntryRepo::set_status(&tx, entry_id, status, Some(feedback), false)?;
        AuditRepo::append(
            &tx,
            &AppendAudit {
                actor_id: Some(reviewer.as_str()),
                action: match decision {
                    ReviewDecision::Approve => "approve_entry",
                    ReviewDecision::Reject => "reject_entry",
                },
                entity_type: "entry",
                entity_id: entry_id.as_str(),
                detail: Some(serde_json::json!({ "feedback": feedback })),
            },
        )?;

        let reviewed = EntryRepo::get(&tx, entry_id)?
            .ok_or_else(|| LogbookError::EntryNotFound(entry_id.clone()))?;
        tx.commit().map_err(StoreError::Sqlite)?;

        info!(%entry_id, status = status.as_sql(), "entry reviewed");
        self.publish_change(&reviewed);
        Ok(reviewed)
    }

    /// Submit a batch of entries for review.
    ///
    /// Each entry is checked and transitioned independently; one entry's
    /// failure is reported in its outcome and never blocks the others.
    /// Already-pending entries count as success without a new submission.
    pub fn bulk_submit(
        &self,
        student_id: &StudentId,
        entry_ids: &[EntryId],
    ) -> Result<Vec<SubmitOutcome>, LogbookError> {
        let outcomes = entry_ids
            .iter()
            .map(|entry_id| SubmitOutcome {
                entry_id: entry_id.clone(),
                result: self.submit_one(entry_id, student_id),
            })
            .collect();
        Ok(outcomes)
    }

    fn submit_one(
        &self,
        entry_id: &EntryId,
        student_id: &StudentId,
    ) -> Result<EntryStatus, LogbookError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        let entry = EntryRepo::get(&tx, entry_id)?
            .ok_or_else(|| LogbookError::EntryNotFound(entry_id.clone()))?;
        if entry.student_id != *student_id {
            return Err(LogbookError::NotAuthorized);
        }
        if let Some(term) = date_locked(&tx, student_id, entry.date)? {
            return Err(LogbookError::LogbookLocked { term });
        }
        match entry.status {
            // Submitting an already-pending entry is a no-op success.
            EntryStatus::Pending => return Ok(EntryStatus::Pending),
            status if !status.is_submittable() => {
                return Err(LogbookError::NotEditable { status });
            }
            _ => {}
        }

        let _ = EntryRepo::set_status(&tx, entry_id, EntryStatus::Pending, None, true)?;
        AuditRepo::append(
            &tx,
            &AppendAudit {
                actor_id: Some(student_id.as_str()),
                action: "submit_entry",
                entity_type: "entry",
                entity_id: entry_id.as_str(),
                detail: None,
            },
        )?;
        let submitted = EntryRepo::get(&tx, entry_id)?
            .ok_or_else(|| LogbookError::EntryNotFound(entry_id.clone()))?;
        tx.commit().map_err(StoreError::Sqlite)?;

        self.publish_change(&submitted);
        Ok(submitted.status)
    }

    /// All entries of one student, newest activity first.
    pub fn entries_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<ClinicalEntry>, LogbookError> {
        let conn = self.conn()?;
        Ok(EntryRepo::list_for_student(&conn, student_id)?)
    }

    /// The preceptor's review queue: pending entries across their active
    /// roster, oldest submission first.
    pub fn review_queue(
        &self,
        preceptor_id: &PreceptorId,
    ) -> Result<Vec<ClinicalEntry>, LogbookError> {
        let conn = self.conn()?;
        Ok(EntryRepo::pending_for_preceptor(&conn, preceptor_id)?)
    }

    /// Aggregate totals over one student's logbook.
    pub fn stats(&self, student_id: &StudentId) -> Result<LogbookStats, LogbookError> {
        let conn = self.conn()?;
        Ok(EntryRepo::stats_for_student(&conn, student_id)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use precept_core::events::EntityKind;
    use precept_store::connection::{self, ConnectionConfig};
    use precept_store::migrations::run_migrations;
    use precept_store::types::{CreatePreceptor, CreateStudent};

    use crate::locks::TermLockRegistry;

    struct Fixture {
        manager: EntryLifecycleManager,
        registry: TermLockRegistry,
        pool: ConnectionPool,
        notifier: Arc<ChangeNotifier>,
    }

    fn fixture() -> Fixture {
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        let notifier = Arc::new(ChangeNotifier::default());
        Fixture {
            manager: EntryLifecycleManager::new(pool.clone(), notifier.clone()),
            registry: TermLockRegistry::new(pool.clone(), notifier.clone()),
            pool,
            notifier,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn student(f: &Fixture, email: &str) -> StudentId {
        ProfileRepo::create_student(
            &f.pool.get().unwrap(),
            &CreateStudent {
                email: email.into(),
                full_name: "Student".into(),
                institution_id: None,
            },
        )
        .unwrap()
        .id
    }

    fn preceptor_for(f: &Fixture, email: &str, s: &StudentId) -> PreceptorId {
        let conn = f.pool.get().unwrap();
        let p = ProfileRepo::create_preceptor(
            &conn,
            &CreatePreceptor {
                email: email.into(),
                full_name: "Preceptor".into(),
                specialty: None,
                institution_id: None,
            },
        )
        .unwrap()
        .id;
        let _ = AssignmentRepo::insert_active(&conn, s, &p).unwrap();
        p
    }

    fn entry_fields(date_str: &str) -> NewEntry {
        NewEntry {
            date: date(date_str),
            location: "Riverside General".into(),
            specialty: "Pediatrics".into(),
            hours: 6.0,
            activities: Some("Ward rounds".into()),
            learning_objectives: None,
            reflection: None,
            supervisor_name: Some("Dr. Osei".into()),
            patients_seen: Some(3),
        }
    }

    fn lock_fall_2025(f: &Fixture, s: &StudentId) {
        let _ = f
            .registry
            .define_term("Fall 2025", date("2025-09-01"), date("2025-12-20"))
            .unwrap();
        let _ = f.registry.lock(s, "Fall 2025", "admin-1").unwrap();
    }

    // --- create ---

    #[test]
    fn create_submit_starts_pending() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert!(entry.submitted_at.is_some());
    }

    #[test]
    fn create_draft_starts_draft() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Draft)
            .unwrap();
        assert_eq!(entry.status, EntryStatus::Draft);
        assert!(entry.submitted_at.is_none());
    }

    #[test]
    fn create_in_locked_term_fails() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        lock_fall_2025(&f, &s);

        let err = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap_err();
        assert_matches!(err, LogbookError::LogbookLocked { term } if term == "Fall 2025");
    }

    #[test]
    fn create_outside_locked_term_succeeds() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        lock_fall_2025(&f, &s);

        assert!(f
            .manager
            .create(&s, &entry_fields("2026-01-15"), CreateDisposition::Submit)
            .is_ok());
    }

    #[test]
    fn create_rejects_negative_hours() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let mut fields = entry_fields("2025-10-03");
        fields.hours = -0.5;
        assert_matches!(
            f.manager.create(&s, &fields, CreateDisposition::Submit),
            Err(LogbookError::Validation(_))
        );
    }

    #[test]
    fn create_rejects_unknown_student() {
        let f = fixture();
        assert_matches!(
            f.manager.create(
                &StudentId::from("ghost"),
                &entry_fields("2025-10-03"),
                CreateDisposition::Submit
            ),
            Err(LogbookError::StudentNotFound(_))
        );
    }

    // --- edit ---

    #[test]
    fn edit_draft_stays_draft() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Draft)
            .unwrap();

        let patch = EntryPatch {
            location: Some("Lakeview Clinic".into()),
            ..Default::default()
        };
        let edited = f.manager.edit(&entry.id, &s, &patch).unwrap();
        assert_eq!(edited.status, EntryStatus::Draft);
        assert_eq!(edited.location, "Lakeview Clinic");
    }

    #[test]
    fn edit_rejected_resubmits_and_keeps_feedback() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();
        let _ = f
            .manager
            .review(&entry.id, &p, ReviewDecision::Reject, "add more detail")
            .unwrap();

        let patch = EntryPatch {
            reflection: Some("Expanded reflection".into()),
            ..Default::default()
        };
        let edited = f.manager.edit(&entry.id, &s, &patch).unwrap();
        assert_eq!(edited.status, EntryStatus::Pending);
        assert_eq!(edited.feedback.as_deref(), Some("add more detail"));
        assert!(edited.submitted_at.is_some());
    }

    #[test]
    fn edit_pending_and_approved_are_not_editable() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let pending = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();
        assert_matches!(
            f.manager.edit(&pending.id, &s, &EntryPatch::default()),
            Err(LogbookError::NotEditable {
                status: EntryStatus::Pending
            })
        );

        let _ = f
            .manager
            .review(&pending.id, &p, ReviewDecision::Approve, "well done")
            .unwrap();
        assert_matches!(
            f.manager.edit(&pending.id, &s, &EntryPatch::default()),
            Err(LogbookError::NotEditable {
                status: EntryStatus::Approved
            })
        );
    }

    #[test]
    fn edit_by_non_owner_is_not_authorized() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let other = student(&f, "other@x.edu");
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Draft)
            .unwrap();
        assert_matches!(
            f.manager.edit(&entry.id, &other, &EntryPatch::default()),
            Err(LogbookError::NotAuthorized)
        );
    }

    #[test]
    fn lock_overrides_status_on_edit() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();
        let _ = f
            .manager
            .review(&entry.id, &p, ReviewDecision::Approve, "")
            .unwrap();

        // Approved would already refuse the edit; the lock must win anyway.
        lock_fall_2025(&f, &s);
        assert_matches!(
            f.manager.edit(&entry.id, &s, &EntryPatch::default()),
            Err(LogbookError::LogbookLocked { .. })
        );
    }

    #[test]
    fn edit_cannot_move_entry_into_locked_term() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        lock_fall_2025(&f, &s);
        let entry = f
            .manager
            .create(&s, &entry_fields("2026-01-15"), CreateDisposition::Draft)
            .unwrap();

        let patch = EntryPatch {
            date: Some(date("2025-10-03")),
            ..Default::default()
        };
        assert_matches!(
            f.manager.edit(&entry.id, &s, &patch),
            Err(LogbookError::LogbookLocked { .. })
        );
    }

    // --- review ---

    #[test]
    fn review_approve_sets_status_and_feedback() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();

        let reviewed = f
            .manager
            .review(&entry.id, &p, ReviewDecision::Approve, "solid work")
            .unwrap();
        assert_eq!(reviewed.status, EntryStatus::Approved);
        assert_eq!(reviewed.feedback.as_deref(), Some("solid work"));
    }

    #[test]
    fn review_reject_requires_feedback() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();

        assert_matches!(
            f.manager.review(&entry.id, &p, ReviewDecision::Reject, "  "),
            Err(LogbookError::Validation(_))
        );
        assert!(f
            .manager
            .review(&entry.id, &p, ReviewDecision::Reject, "needs detail")
            .is_ok());
    }

    #[test]
    fn review_by_unassigned_preceptor_is_not_authorized() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let _assigned = preceptor_for(&f, "p1@x.edu", &s);
        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();

        let conn = f.pool.get().unwrap();
        let stranger = ProfileRepo::create_preceptor(
            &conn,
            &CreatePreceptor {
                email: "p2@x.edu".into(),
                full_name: "Stranger".into(),
                specialty: None,
                institution_id: None,
            },
        )
        .unwrap()
        .id;
        drop(conn);

        assert_matches!(
            f.manager.review(&entry.id, &stranger, ReviewDecision::Approve, ""),
            Err(LogbookError::NotAuthorized)
        );
    }

    #[test]
    fn review_non_pending_is_not_editable() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let draft = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Draft)
            .unwrap();

        assert_matches!(
            f.manager.review(&draft.id, &p, ReviewDecision::Approve, ""),
            Err(LogbookError::NotEditable {
                status: EntryStatus::Draft
            })
        );
    }

    // --- bulk submit ---

    #[test]
    fn bulk_submit_reports_per_entry_outcomes() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let other = student(&f, "other@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);

        let draft = f
            .manager
            .create(&s, &entry_fields("2026-01-10"), CreateDisposition::Draft)
            .unwrap();
        let approved = f
            .manager
            .create(&s, &entry_fields("2026-01-11"), CreateDisposition::Submit)
            .unwrap();
        let _ = f
            .manager
            .review(&approved.id, &p, ReviewDecision::Approve, "")
            .unwrap();
        let not_mine = f
            .manager
            .create(&other, &entry_fields("2026-01-12"), CreateDisposition::Draft)
            .unwrap();
        let ghost = EntryId::from("ghost");

        let outcomes = f
            .manager
            .bulk_submit(
                &s,
                &[draft.id.clone(), approved.id.clone(), not_mine.id.clone(), ghost],
            )
            .unwrap();

        assert_matches!(outcomes[0].result, Ok(EntryStatus::Pending));
        assert_matches!(
            outcomes[1].result,
            Err(LogbookError::NotEditable {
                status: EntryStatus::Approved
            })
        );
        assert_matches!(outcomes[2].result, Err(LogbookError::NotAuthorized));
        assert_matches!(outcomes[3].result, Err(LogbookError::EntryNotFound(_)));

        // The failing entries did not block the draft's submission.
        let submitted = f.manager.entries_for_student(&s).unwrap();
        let submitted_draft = submitted.iter().find(|e| e.id == draft.id).unwrap();
        assert_eq!(submitted_draft.status, EntryStatus::Pending);
    }

    #[test]
    fn bulk_submit_pending_is_noop_success() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let pending = f
            .manager
            .create(&s, &entry_fields("2026-01-10"), CreateDisposition::Submit)
            .unwrap();
        let mut sub = f.notifier.subscribe(EntityKind::ClinicalEntry);

        let outcomes = f.manager.bulk_submit(&s, &[pending.id]).unwrap();
        assert_matches!(outcomes[0].result, Ok(EntryStatus::Pending));
        assert!(sub.try_recv().unwrap().is_none(), "no-op publishes nothing");
    }

    #[test]
    fn bulk_submit_respects_term_locks() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let draft = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Draft)
            .unwrap();
        lock_fall_2025(&f, &s);

        let outcomes = f.manager.bulk_submit(&s, &[draft.id]).unwrap();
        assert_matches!(outcomes[0].result, Err(LogbookError::LogbookLocked { .. }));
    }

    // --- events and reads ---

    #[test]
    fn transitions_publish_entry_events() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let mut sub = f.notifier.subscribe(EntityKind::ClinicalEntry);

        let entry = f
            .manager
            .create(&s, &entry_fields("2025-10-03"), CreateDisposition::Submit)
            .unwrap();
        let _ = f
            .manager
            .review(&entry.id, &p, ReviewDecision::Reject, "more detail")
            .unwrap();
        let _ = f.manager.edit(&entry.id, &s, &EntryPatch::default()).unwrap();

        let statuses: Vec<EntryStatus> = std::iter::from_fn(|| sub.try_recv().unwrap())
            .map(|event| match event {
                DomainEvent::ClinicalEntryChanged { status, .. } => status,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(
            statuses,
            vec![EntryStatus::Pending, EntryStatus::Rejected, EntryStatus::Pending]
        );
    }

    #[test]
    fn review_queue_and_stats() {
        let f = fixture();
        let s = student(&f, "s@x.edu");
        let p = preceptor_for(&f, "p@x.edu", &s);
        let e1 = f
            .manager
            .create(&s, &entry_fields("2025-10-01"), CreateDisposition::Submit)
            .unwrap();
        let _e2 = f
            .manager
            .create(&s, &entry_fields("2025-10-02"), CreateDisposition::Draft)
            .unwrap();

        let queue = f.manager.review_queue(&p).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, e1.id);

        let stats = f.manager.stats(&s).unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.draft_count, 1);
        assert_eq!(stats.total_hours, 12.0);
    }
}
