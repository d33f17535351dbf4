//! Student and preceptor profiles.
//!
//! Both roles live in the single `profiles` table and are surfaced as the
//! distinct [`Student`] and [`Preceptor`] types. Every accessor filters by
//! role, so a preceptor ID can never resolve to a student row.

use precept_core::ids::{InstitutionId, PreceptorId, StudentId};
use precept_core::types::Role;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::repositories::now_iso;
use crate::types::{CreatePreceptor, CreateStudent, Preceptor, Student};

/// Repository for profile rows.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Register a student.
    pub fn create_student(conn: &Connection, params: &CreateStudent) -> Result<Student> {
        let id = StudentId::new();
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO profiles (id, email, full_name, role, institution_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                id.as_str(),
                params.email,
                params.full_name,
                Role::Student.as_sql(),
                params.institution_id.as_ref().map(InstitutionId::as_str),
                now,
            ],
        )?;
        Ok(Student {
            id,
            email: params.email.clone(),
            full_name: params.full_name.clone(),
            institution_id: params.institution_id.clone(),
            created_at: now,
        })
    }

    /// Register a preceptor.
    pub fn create_preceptor(conn: &Connection, params: &CreatePreceptor) -> Result<Preceptor> {
        let id = PreceptorId::new();
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO profiles (id, email, full_name, role, specialty, institution_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                id.as_str(),
                params.email,
                params.full_name,
                Role::Preceptor.as_sql(),
                params.specialty,
                params.institution_id.as_ref().map(InstitutionId::as_str),
                now,
            ],
        )?;
        Ok(Preceptor {
            id,
            email: params.email.clone(),
            full_name: params.full_name.clone(),
            specialty: params.specialty.clone(),
            institution_id: params.institution_id.clone(),
            created_at: now,
        })
    }

    /// Get a student by ID.
    pub fn get_student(conn: &Connection, id: &StudentId) -> Result<Option<Student>> {
        let student = conn
            .query_row(
                "SELECT id, email, full_name, institution_id, created_at
                 FROM profiles WHERE id = ?1 AND role = 'student'",
                params![id.as_str()],
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }

    /// Get a preceptor by ID.
    pub fn get_preceptor(conn: &Connection, id: &PreceptorId) -> Result<Option<Preceptor>> {
        let preceptor = conn
            .query_row(
                "SELECT id, email, full_name, specialty, institution_id, created_at
                 FROM profiles WHERE id = ?1 AND role = 'preceptor'",
                params![id.as_str()],
                preceptor_from_row,
            )
            .optional()?;
        Ok(preceptor)
    }

    /// Set or clear a student's institution. Returns false when the student
    /// does not exist. Existing assignments are untouched.
    pub fn set_student_institution(
        conn: &Connection,
        id: &StudentId,
        institution: Option<&InstitutionId>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE profiles SET institution_id = ?1 WHERE id = ?2 AND role = 'student'",
            params![institution.map(InstitutionId::as_str), id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Set or clear a preceptor's institution.
    pub fn set_preceptor_institution(
        conn: &Connection,
        id: &PreceptorId,
        institution: Option<&InstitutionId>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE profiles SET institution_id = ?1 WHERE id = ?2 AND role = 'preceptor'",
            params![institution.map(InstitutionId::as_str), id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// List students, optionally scoped to one institution.
    pub fn list_students(
        conn: &Connection,
        institution: Option<&InstitutionId>,
    ) -> Result<Vec<Student>> {
        let sql = "SELECT id, email, full_name, institution_id, created_at
                   FROM profiles WHERE role = 'student'";
        let students = match institution {
            Some(inst) => {
                let mut stmt =
                    conn.prepare(&format!("{sql} AND institution_id = ?1 ORDER BY full_name"))?;
                let rows = stmt
                    .query_map(params![inst.as_str()], student_from_row)?
                    .filter_map(std::result::Result::ok)
                    .collect();
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!("{sql} ORDER BY full_name"))?;
                let rows = stmt
                    .query_map([], student_from_row)?
                    .filter_map(std::result::Result::ok)
                    .collect();
                rows
            }
        };
        Ok(students)
    }

    /// List preceptors, optionally scoped to one institution.
    pub fn list_preceptors(
        conn: &Connection,
        institution: Option<&InstitutionId>,
    ) -> Result<Vec<Preceptor>> {
        let sql = "SELECT id, email, full_name, specialty, institution_id, created_at
                   FROM profiles WHERE role = 'preceptor'";
        let preceptors = match institution {
            Some(inst) => {
                let mut stmt =
                    conn.prepare(&format!("{sql} AND institution_id = ?1 ORDER BY full_name"))?;
                let rows = stmt
                    .query_map(params![inst.as_str()], preceptor_from_row)?
                    .filter_map(std::result::Result::ok)
                    .collect();
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!("{sql} ORDER BY full_name"))?;
                let rows = stmt
                    .query_map([], preceptor_from_row)?
                    .filter_map(std::result::Result::ok)
                    .collect();
                rows
            }
        };
        Ok(preceptors)
    }

    /// Delete a student account. Entries and term locks cascade via foreign
    /// keys; assignment rows are removed explicitly first because they do
    /// not cascade. Returns false when no such student exists.
    pub fn delete_student(conn: &Connection, id: &StudentId) -> Result<bool> {
        let _ = conn.execute(
            "DELETE FROM assignments WHERE student_id = ?1",
            params![id.as_str()],
        )?;
        let changed = conn.execute(
            "DELETE FROM profiles WHERE id = ?1 AND role = 'student'",
            params![id.as_str()],
        )?;
        Ok(changed > 0)
    }
}

fn student_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: StudentId::from(row.get::<_, String>(0)?),
        email: row.get(1)?,
        full_name: row.get(2)?,
        institution_id: row.get::<_, Option<String>>(3)?.map(InstitutionId::from),
        created_at: row.get(4)?,
    })
}

fn preceptor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Preceptor> {
    Ok(Preceptor {
        id: PreceptorId::from(row.get::<_, String>(0)?),
        email: row.get(1)?,
        full_name: row.get(2)?,
        specialty: row.get(3)?,
        institution_id: row.get::<_, Option<String>>(4)?.map(InstitutionId::from),
        created_at: row.get(5)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
