//! Institution rows.

use precept_core::ids::InstitutionId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::repositories::now_iso;
use crate::types::Institution;

/// Repository for institutions.
pub struct InstitutionRepo;

impl InstitutionRepo {
    /// Create an institution with a unique name.
    pub fn create(conn: &Connection, name: &str) -> Result<Institution> {
        let id = InstitutionId::new();
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO institutions (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id.as_str(), name, now],
        )?;
        Ok(Institution {
            id,
            name: name.to_owned(),
            created_at: now,
        })
    }

    /// Get an institution by ID.
    pub fn get(conn: &Connection, id: &InstitutionId) -> Result<Option<Institution>> {
        let institution = conn
            .query_row(
                "SELECT id, name, created_at FROM institutions WHERE id = ?1",
                params![id.as_str()],
                institution_from_row,
            )
            .optional()?;
        Ok(institution)
    }

    /// Look an institution up by its unique name.
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Institution>> {
        let institution = conn
            .query_row(
                "SELECT id, name, created_at FROM institutions WHERE name = ?1",
                params![name],
                institution_from_row,
            )
            .optional()?;
        Ok(institution)
    }

    /// List all institutions by name.
    pub fn list(conn: &Connection) -> Result<Vec<Institution>> {
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM institutions ORDER BY name")?;
        let institutions = stmt
            .query_map([], institution_from_row)?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(institutions)
    }
}

fn institution_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Institution> {
    Ok(Institution {
        id: InstitutionId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
