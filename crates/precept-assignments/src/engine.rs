//! The assignment engine.
//!
//! Each write method checks its preconditions and performs its insert or
//! update inside one `BEGIN IMMEDIATE` transaction, appends an audit
//! record in the same transaction, and publishes a change event only after
//! the commit succeeds. Callers never observe partial state.

use std::sync::Arc;

use precept_core::events::DomainEvent;
use precept_core::ids::{AssignmentId, InstitutionId, PreceptorId, StudentId};
use precept_core::types::AssignmentStatus;
use precept_notify::ChangeNotifier;
use precept_store::connection::{ConnectionPool, PooledConnection};
use precept_store::repositories::{AppendAudit, AssignmentRepo, AuditRepo, ProfileRepo};
use precept_store::types::{Assignment, PreceptorLoad, Student};
use precept_store::StoreError;
use rusqlite::TransactionBehavior;
use tracing::info;

use crate::capacity::{CapacityLedger, MAX_ACTIVE_PER_PRECEPTOR};
use crate::errors::AssignmentError;

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Creates and ends supervisory assignments.
///
/// Shareable across request handlers: clone the pool handle and the
/// notifier `Arc` freely, or wrap the engine itself in an `Arc`.
pub struct AssignmentEngine {
    pool: ConnectionPool,
    notifier: Arc<ChangeNotifier>,
}

impl AssignmentEngine {
    /// Create an engine over the given pool and notifier.
    pub fn new(pool: ConnectionPool, notifier: Arc<ChangeNotifier>) -> Self {
        Self { pool, notifier }
    }

    fn conn(&self) -> Result<PooledConnection, AssignmentError> {
        self.pool.get().map_err(StoreError::Pool).map_err(Into::into)
    }

    /// Assign a student to a preceptor.
    ///
    /// Preconditions, all checked atomically with the insert:
    /// 1. both profiles exist;
    /// 2. the student has no active assignment;
    /// 3. both sides belong to the same, non-null institution;
    /// 4. the preceptor has a free capacity slot.
    pub fn assign(
        &self,
        student_id: &StudentId,
        preceptor_id: &PreceptorId,
        assigned_by: &str,
    ) -> Result<Assignment, AssignmentError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        let student = ProfileRepo::get_student(&tx, student_id)?
            .ok_or_else(|| AssignmentError::StudentNotFound(student_id.clone()))?;
        let preceptor = ProfileRepo::get_preceptor(&tx, preceptor_id)?
            .ok_or_else(|| AssignmentError::PreceptorNotFound(preceptor_id.clone()))?;

        if let Some(existing) = AssignmentRepo::active_for_student(&tx, student_id)? {
            let preceptor_name = ProfileRepo::get_preceptor(&tx, &existing.preceptor_id)?
                .map(|p| p.full_name)
                .unwrap_or_default();
            return Err(AssignmentError::DuplicateActive {
                preceptor_id: existing.preceptor_id,
                preceptor_name,
            });
        }

        // Missing institution on either side is a mismatch: institution-less
        // pairings are never allowed implicitly.
        match (&student.institution_id, &preceptor.institution_id) {
            (Some(s), Some(p)) if s == p => {}
            _ => return Err(AssignmentError::InstitutionMismatch),
        }

        CapacityLedger::try_reserve(&tx, preceptor_id)?;

        let assignment = AssignmentRepo::insert_active(&tx, student_id, preceptor_id)?;
        AuditRepo::append(
            &tx,
            &AppendAudit {
                actor_id: Some(assigned_by),
                action: "assign",
                entity_type: "assignment",
                entity_id: assignment.id.as_str(),
                detail: Some(serde_json::json!({
                    "student_id": student_id.as_str(),
                    "preceptor_id": preceptor_id.as_str(),
                })),
            },
        )?;

        tx.commit().map_err(StoreError::Sqlite)?;

        info!(
            assignment_id = %assignment.id,
            %student_id,
            %preceptor_id,
            "assignment created"
        );
        let _ = self.notifier.publish(&DomainEvent::AssignmentCreated {
            assignment_id: assignment.id.clone(),
            student_id: student_id.clone(),
            preceptor_id: preceptor_id.clone(),
            at: now_iso(),
        });

        Ok(assignment)
    }

    /// End an active assignment, freeing the preceptor's capacity slot.
    pub fn end_assignment(
        &self,
        assignment_id: &AssignmentId,
        ended_by: &str,
    ) -> Result<Assignment, AssignmentError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Sqlite)?;

        let assignment = AssignmentRepo::get(&tx, assignment_id)?
            .ok_or_else(|| AssignmentError::AssignmentNotFound(assignment_id.clone()))?;
        if assignment.status != AssignmentStatus::Active {
            return Err(AssignmentError::NotActive(assignment_id.clone()));
        }

        let _ = AssignmentRepo::mark_ended(&tx, assignment_id)?;
        AuditRepo::append(
            &tx,
            &AppendAudit {
                actor_id: Some(ended_by),
                action: "end_assignment",
                entity_type: "assignment",
                entity_id: assignment_id.as_str(),
                detail: None,
            },
        )?;

        let ended = AssignmentRepo::get(&tx, assignment_id)?
            .ok_or_else(|| AssignmentError::AssignmentNotFound(assignment_id.clone()))?;
        tx.commit().map_err(StoreError::Sqlite)?;

        info!(%assignment_id, "assignment ended");
        let _ = self.notifier.publish(&DomainEvent::AssignmentEnded {
            assignment_id: ended.id.clone(),
            student_id: ended.student_id.clone(),
            preceptor_id: ended.preceptor_id.clone(),
            at: now_iso(),
        });

        Ok(ended)
    }

    /// The student's current active assignment, if any.
    pub fn active_assignment(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<Assignment>, AssignmentError> {
        let conn = self.conn()?;
        Ok(AssignmentRepo::active_for_student(&conn, student_id)?)
    }

    /// The students a preceptor currently supervises.
    pub fn roster(&self, preceptor_id: &PreceptorId) -> Result<Vec<Student>, AssignmentError> {
        let conn = self.conn()?;
        Ok(AssignmentRepo::roster(&conn, preceptor_id)?)
    }

    /// Per-preceptor active-student counts for the admin dashboard,
    /// optionally scoped to one institution.
    pub fn preceptor_load(
        &self,
        institution: Option<&InstitutionId>,
    ) -> Result<Vec<PreceptorLoad>, AssignmentError> {
        let conn = self.conn()?;
        Ok(AssignmentRepo::preceptor_load(
            &conn,
            institution,
            MAX_ACTIVE_PER_PRECEPTOR,
        )?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use precept_core::events::EntityKind;
    use precept_store::connection::{self, ConnectionConfig};
    use precept_store::migrations::run_migrations;
    use precept_store::repositories::InstitutionRepo;
    use precept_store::types::{CreatePreceptor, CreateStudent};

    struct Fixture {
        engine: AssignmentEngine,
        pool: ConnectionPool,
        notifier: Arc<ChangeNotifier>,
    }

    fn fixture() -> Fixture {
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        let notifier = Arc::new(ChangeNotifier::default());
        Fixture {
            engine: AssignmentEngine::new(pool.clone(), notifier.clone()),
            pool,
            notifier,
        }
    }

    fn institution(f: &Fixture, name: &str) -> InstitutionId {
        InstitutionRepo::create(&f.pool.get().unwrap(), name).unwrap().id
    }

    fn student(f: &Fixture, email: &str, inst: Option<&InstitutionId>) -> StudentId {
        ProfileRepo::create_student(
            &f.pool.get().unwrap(),
            &CreateStudent {
                email: email.into(),
                full_name: "Student".into(),
                institution_id: inst.cloned(),
            },
        )
        .unwrap()
        .id
    }

    fn preceptor(f: &Fixture, email: &str, inst: Option<&InstitutionId>) -> PreceptorId {
        ProfileRepo::create_preceptor(
            &f.pool.get().unwrap(),
            &CreatePreceptor {
                email: email.into(),
                full_name: "Dr. Osei".into(),
                specialty: None,
                institution_id: inst.cloned(),
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn assign_happy_path() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p = preceptor(&f, "p@x.edu", Some(&inst));

        let assignment = f.engine.assign(&s, &p, "admin-1").unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(f.engine.active_assignment(&s).unwrap().unwrap().id, assignment.id);
    }

    #[test]
    fn assign_rejects_duplicate_active_with_current_preceptor() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p1 = preceptor(&f, "p1@x.edu", Some(&inst));
        let p2 = preceptor(&f, "p2@x.edu", Some(&inst));

        let _ = f.engine.assign(&s, &p1, "admin-1").unwrap();
        let err = f.engine.assign(&s, &p2, "admin-1").unwrap_err();
        assert_matches!(
            err,
            AssignmentError::DuplicateActive { preceptor_id, preceptor_name }
                if preceptor_id == p1 && preceptor_name == "Dr. Osei"
        );
    }

    #[test]
    fn assign_rejects_cross_institution() {
        let f = fixture();
        let riverside = institution(&f, "Riverside");
        let lakeview = institution(&f, "Lakeview");
        let s = student(&f, "s@x.edu", Some(&riverside));
        let p = preceptor(&f, "p@x.edu", Some(&lakeview));

        assert_matches!(
            f.engine.assign(&s, &p, "admin-1"),
            Err(AssignmentError::InstitutionMismatch)
        );
    }

    #[test]
    fn assign_rejects_missing_institution_on_either_side() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s_with = student(&f, "s1@x.edu", Some(&inst));
        let s_without = student(&f, "s2@x.edu", None);
        let p_with = preceptor(&f, "p1@x.edu", Some(&inst));
        let p_without = preceptor(&f, "p2@x.edu", None);

        assert_matches!(
            f.engine.assign(&s_without, &p_with, "admin-1"),
            Err(AssignmentError::InstitutionMismatch)
        );
        assert_matches!(
            f.engine.assign(&s_with, &p_without, "admin-1"),
            Err(AssignmentError::InstitutionMismatch)
        );
    }

    #[test]
    fn assign_rejects_unknown_profiles() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p = preceptor(&f, "p@x.edu", Some(&inst));

        assert_matches!(
            f.engine.assign(&StudentId::from("ghost"), &p, "admin-1"),
            Err(AssignmentError::StudentNotFound(_))
        );
        assert_matches!(
            f.engine.assign(&s, &PreceptorId::from("ghost"), "admin-1"),
            Err(AssignmentError::PreceptorNotFound(_))
        );
    }

    #[test]
    fn assign_enforces_capacity_limit() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let p = preceptor(&f, "p@x.edu", Some(&inst));
        for n in 0..MAX_ACTIVE_PER_PRECEPTOR {
            let s = student(&f, &format!("s{n}@x.edu"), Some(&inst));
            let _ = f.engine.assign(&s, &p, "admin-1").unwrap();
        }

        let overflow = student(&f, "s6@x.edu", Some(&inst));
        assert_matches!(
            f.engine.assign(&overflow, &p, "admin-1"),
            Err(AssignmentError::CapacityExceeded { limit: 5, .. })
        );
    }

    #[test]
    fn failed_assign_leaves_no_rows_behind() {
        let f = fixture();
        let riverside = institution(&f, "Riverside");
        let lakeview = institution(&f, "Lakeview");
        let s = student(&f, "s@x.edu", Some(&riverside));
        let p = preceptor(&f, "p@x.edu", Some(&lakeview));

        let _ = f.engine.assign(&s, &p, "admin-1").unwrap_err();
        let conn = f.pool.get().unwrap();
        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM assignments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn assign_publishes_after_commit() {
        let f = fixture();
        let mut sub = f.notifier.subscribe(EntityKind::Assignment);
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p = preceptor(&f, "p@x.edu", Some(&inst));

        let assignment = f.engine.assign(&s, &p, "admin-1").unwrap();
        let event = sub.try_recv().unwrap().unwrap();
        assert_matches!(
            event,
            DomainEvent::AssignmentCreated { assignment_id, .. }
                if assignment_id == assignment.id
        );
    }

    #[test]
    fn failed_assign_publishes_nothing() {
        let f = fixture();
        let mut sub = f.notifier.subscribe(EntityKind::Assignment);
        let p = preceptor(&f, "p@x.edu", None);
        let s = student(&f, "s@x.edu", None);

        let _ = f.engine.assign(&s, &p, "admin-1").unwrap_err();
        assert!(sub.try_recv().unwrap().is_none());
    }

    #[test]
    fn end_assignment_frees_the_slot() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p = preceptor(&f, "p@x.edu", Some(&inst));
        let assignment = f.engine.assign(&s, &p, "admin-1").unwrap();

        let ended = f.engine.end_assignment(&assignment.id, "admin-1").unwrap();
        assert_eq!(ended.status, AssignmentStatus::Ended);
        assert!(ended.ended_at.is_some());
        assert!(f.engine.active_assignment(&s).unwrap().is_none());

        // The student can be reassigned and the slot is free again.
        let again = f.engine.assign(&s, &p, "admin-1").unwrap();
        assert_ne!(again.id, assignment.id);
    }

    #[test]
    fn end_assignment_twice_is_not_active() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p = preceptor(&f, "p@x.edu", Some(&inst));
        let assignment = f.engine.assign(&s, &p, "admin-1").unwrap();

        let _ = f.engine.end_assignment(&assignment.id, "admin-1").unwrap();
        assert_matches!(
            f.engine.end_assignment(&assignment.id, "admin-1"),
            Err(AssignmentError::NotActive(_))
        );
        assert_matches!(
            f.engine.end_assignment(&AssignmentId::from("ghost"), "admin-1"),
            Err(AssignmentError::AssignmentNotFound(_))
        );
    }

    #[test]
    fn institution_change_does_not_revoke_existing_assignment() {
        let f = fixture();
        let riverside = institution(&f, "Riverside");
        let lakeview = institution(&f, "Lakeview");
        let s = student(&f, "s@x.edu", Some(&riverside));
        let p = preceptor(&f, "p@x.edu", Some(&riverside));
        let assignment = f.engine.assign(&s, &p, "admin-1").unwrap();

        // Grandfathering: the assignment stays active after the move.
        let conn = f.pool.get().unwrap();
        assert!(ProfileRepo::set_student_institution(&conn, &s, Some(&lakeview)).unwrap());
        drop(conn);
        let still_active = f.engine.active_assignment(&s).unwrap().unwrap();
        assert_eq!(still_active.id, assignment.id);
    }

    #[test]
    fn preceptor_load_reflects_assignments() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p = preceptor(&f, "p@x.edu", Some(&inst));
        let _ = f.engine.assign(&s, &p, "admin-1").unwrap();

        let loads = f.engine.preceptor_load(Some(&inst)).unwrap();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].active_students, 1);
        assert_eq!(loads[0].max_students, MAX_ACTIVE_PER_PRECEPTOR);
    }

    #[test]
    fn assign_writes_an_audit_record() {
        let f = fixture();
        let inst = institution(&f, "Riverside");
        let s = student(&f, "s@x.edu", Some(&inst));
        let p = preceptor(&f, "p@x.edu", Some(&inst));
        let assignment = f.engine.assign(&s, &p, "admin-1").unwrap();

        let conn = f.pool.get().unwrap();
        let records =
            AuditRepo::recent_for_entity(&conn, "assignment", assignment.id.as_str(), 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "assign");
        assert_eq!(records[0].actor_id.as_deref(), Some("admin-1"));
    }

    // Concurrency: a file-backed pool gives every thread its own
    // connection, so the immediate transactions genuinely contend.

    #[test]
    fn concurrent_assigns_cannot_overfill_the_last_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precept.db");
        let pool = connection::new_file(
            path.to_str().unwrap(),
            &ConnectionConfig {
                pool_size: 8,
                ..Default::default()
            },
        )
        .unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        let notifier = Arc::new(ChangeNotifier::default());
        let engine = Arc::new(AssignmentEngine::new(pool.clone(), notifier));

        let conn = pool.get().unwrap();
        let inst = InstitutionRepo::create(&conn, "Riverside").unwrap().id;
        let p = ProfileRepo::create_preceptor(
            &conn,
            &CreatePreceptor {
                email: "p@x.edu".into(),
                full_name: "Preceptor".into(),
                specialty: None,
                institution_id: Some(inst.clone()),
            },
        )
        .unwrap()
        .id;
        let mut students = Vec::new();
        for n in 0..6 {
            students.push(
                ProfileRepo::create_student(
                    &conn,
                    &CreateStudent {
                        email: format!("s{n}@x.edu"),
                        full_name: "Student".into(),
                        institution_id: Some(inst.clone()),
                    },
                )
                .unwrap()
                .id,
            );
        }
        // Four slots taken up front; two threads race for the last one.
        for s in &students[..4] {
            let _ = engine.assign(s, &p, "admin-1").unwrap();
        }
        drop(conn);

        let racers: Vec<_> = students[4..]
            .iter()
            .cloned()
            .map(|s| {
                let engine = engine.clone();
                let p = p.clone();
                std::thread::spawn(move || engine.assign(&s, &p, "admin-1"))
            })
            .collect();

        let results: Vec<_> = racers.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let capacity_errors = results
            .iter()
            .filter(|r| matches!(r, Err(AssignmentError::CapacityExceeded { .. })))
            .count();

        assert_eq!(successes, 1, "exactly one racer may take the last slot");
        assert_eq!(capacity_errors, 1);

        let conn = pool.get().unwrap();
        assert_eq!(
            CapacityLedger::active_count(&conn, &p).unwrap(),
            MAX_ACTIVE_PER_PRECEPTOR
        );
    }

    #[test]
    fn concurrent_assigns_fill_exactly_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precept.db");
        let pool = connection::new_file(
            path.to_str().unwrap(),
            &ConnectionConfig {
                pool_size: 10,
                ..Default::default()
            },
        )
        .unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        let notifier = Arc::new(ChangeNotifier::default());
        let engine = Arc::new(AssignmentEngine::new(pool.clone(), notifier));

        let conn = pool.get().unwrap();
        let inst = InstitutionRepo::create(&conn, "Riverside").unwrap().id;
        let p = ProfileRepo::create_preceptor(
            &conn,
            &CreatePreceptor {
                email: "p@x.edu".into(),
                full_name: "Preceptor".into(),
                specialty: None,
                institution_id: Some(inst.clone()),
            },
        )
        .unwrap()
        .id;
        let students: Vec<_> = (0..8)
            .map(|n| {
                ProfileRepo::create_student(
                    &conn,
                    &CreateStudent {
                        email: format!("s{n}@x.edu"),
                        full_name: "Student".into(),
                        institution_id: Some(inst.clone()),
                    },
                )
                .unwrap()
                .id
            })
            .collect();
        drop(conn);

        let handles: Vec<_> = students
            .into_iter()
            .map(|s| {
                let engine = engine.clone();
                let p = p.clone();
                std::thread::spawn(move || engine.assign(&s, &p, "admin-1"))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes as u32, MAX_ACTIVE_PER_PRECEPTOR);

        let conn = pool.get().unwrap();
        assert_eq!(
            CapacityLedger::active_count(&conn, &p).unwrap(),
            MAX_ACTIVE_PER_PRECEPTOR
        );
    }
}
