//! Assignment rows.
//!
//! Writes here are only reached through the assignment engine, which wraps
//! them in a `BEGIN IMMEDIATE` transaction together with its capacity and
//! duplicate checks. The partial unique index on active rows is the
//! database-level backstop for the single-active-per-student rule.

use precept_core::ids::{AssignmentId, InstitutionId, PreceptorId, StudentId};
use precept_core::types::AssignmentStatus;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::repositories::now_iso;
use crate::types::{Assignment, PreceptorLoad, Student};

/// Repository for student/preceptor assignments.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Insert a new active assignment.
    pub fn insert_active(
        conn: &Connection,
        student_id: &StudentId,
        preceptor_id: &PreceptorId,
    ) -> Result<Assignment> {
        let id = AssignmentId::new();
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO assignments (id, student_id, preceptor_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.as_str(),
                student_id.as_str(),
                preceptor_id.as_str(),
                AssignmentStatus::Active.as_sql(),
                now,
            ],
        )?;
        Ok(Assignment {
            id,
            student_id: student_id.clone(),
            preceptor_id: preceptor_id.clone(),
            status: AssignmentStatus::Active,
            created_at: now,
            ended_at: None,
        })
    }

    /// Get an assignment by ID.
    pub fn get(conn: &Connection, id: &AssignmentId) -> Result<Option<Assignment>> {
        let assignment = conn
            .query_row(
                "SELECT id, student_id, preceptor_id, status, created_at, ended_at
                 FROM assignments WHERE id = ?1",
                params![id.as_str()],
                assignment_from_row,
            )
            .optional()?;
        Ok(assignment)
    }

    /// The student's current active assignment, if any.
    pub fn active_for_student(
        conn: &Connection,
        student_id: &StudentId,
    ) -> Result<Option<Assignment>> {
        let assignment = conn
            .query_row(
                "SELECT id, student_id, preceptor_id, status, created_at, ended_at
                 FROM assignments WHERE student_id = ?1 AND status = 'active'",
                params![student_id.as_str()],
                assignment_from_row,
            )
            .optional()?;
        Ok(assignment)
    }

    /// Count of active assignments held by a preceptor. This recount is the
    /// capacity ledger's source of truth.
    pub fn active_count_for_preceptor(
        conn: &Connection,
        preceptor_id: &PreceptorId,
    ) -> Result<u32> {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE preceptor_id = ?1 AND status = 'active'",
            params![preceptor_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Flip an active assignment to ended, stamping `ended_at`. Returns
    /// false when the row is missing or already ended.
    pub fn mark_ended(conn: &Connection, id: &AssignmentId) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE assignments SET status = 'ended', ended_at = ?1
             WHERE id = ?2 AND status = 'active'",
            params![now_iso(), id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// The students currently supervised by a preceptor.
    pub fn roster(conn: &Connection, preceptor_id: &PreceptorId) -> Result<Vec<Student>> {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.email, p.full_name, p.institution_id, p.created_at
             FROM profiles p
             JOIN assignments a ON a.student_id = p.id
             WHERE a.preceptor_id = ?1 AND a.status = 'active'
             ORDER BY p.full_name",
        )?;
        let students = stmt
            .query_map(params![preceptor_id.as_str()], |row| {
                Ok(Student {
                    id: StudentId::from(row.get::<_, String>(0)?),
                    email: row.get(1)?,
                    full_name: row.get(2)?,
                    institution_id: row.get::<_, Option<String>>(3)?.map(InstitutionId::from),
                    created_at: row.get(4)?,
                })
            })?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(students)
    }

    /// Every preceptor with their current active-student count, optionally
    /// scoped to one institution. Feeds the admin assignment dashboard.
    pub fn preceptor_load(
        conn: &Connection,
        institution: Option<&InstitutionId>,
        max_students: u32,
    ) -> Result<Vec<PreceptorLoad>> {
        let base = "SELECT p.id, p.email, p.full_name, p.specialty, p.institution_id, p.created_at,
                      (SELECT COUNT(*) FROM assignments a
                       WHERE a.preceptor_id = p.id AND a.status = 'active') AS active_students
                    FROM profiles p
                    WHERE p.role = 'preceptor'";

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<PreceptorLoad> {
            Ok(PreceptorLoad {
                preceptor: crate::types::Preceptor {
                    id: PreceptorId::from(row.get::<_, String>(0)?),
                    email: row.get(1)?,
                    full_name: row.get(2)?,
                    specialty: row.get(3)?,
                    institution_id: row.get::<_, Option<String>>(4)?.map(InstitutionId::from),
                    created_at: row.get(5)?,
                },
                active_students: row.get(6)?,
                max_students,
            })
        };

        let loads = match institution {
            Some(inst) => {
                let mut stmt = conn
                    .prepare(&format!("{base} AND p.institution_id = ?1 ORDER BY p.full_name"))?;
                let rows = stmt
                    .query_map(params![inst.as_str()], map_row)?
                    .filter_map(std::result::Result::ok)
                    .collect();
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!("{base} ORDER BY p.full_name"))?;
                let rows = stmt
                    .query_map([], map_row)?
                    .filter_map(std::result::Result::ok)
                    .collect();
                rows
            }
        };
        Ok(loads)
    }
}

fn assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: AssignmentId::from(row.get::<_, String>(0)?),
        student_id: StudentId::from(row.get::<_, String>(1)?),
        preceptor_id: PreceptorId::from(row.get::<_, String>(2)?),
        status: AssignmentStatus::from_sql(&row.get::<_, String>(3)?),
        created_at: row.get(4)?,
        ended_at: row.get(5)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
