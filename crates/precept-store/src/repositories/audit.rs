//! Append-only audit log.
//!
//! The engines append a record after every successful mutation, inside the
//! same transaction, so the audit trail can never disagree with the data.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::repositories::now_iso;
use crate::types::AuditRecord;

/// Parameters for one audit append.
#[derive(Clone, Debug)]
pub struct AppendAudit<'a> {
    /// Who performed the action, if known.
    pub actor_id: Option<&'a str>,
    /// Action name, e.g. "assign" or "review".
    pub action: &'a str,
    /// Affected entity family, e.g. "assignment".
    pub entity_type: &'a str,
    /// Affected entity ID.
    pub entity_id: &'a str,
    /// Structured context, stored as JSON.
    pub detail: Option<serde_json::Value>,
}

/// Repository for audit records.
pub struct AuditRepo;

impl AuditRepo {
    /// Append one record.
    pub fn append(conn: &Connection, params: &AppendAudit<'_>) -> Result<()> {
        let detail = params
            .detail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let _ = conn.execute(
            "INSERT INTO audit_log (actor_id, action, entity_type, entity_id, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                params.actor_id,
                params.action,
                params.entity_type,
                params.entity_id,
                detail,
                now_iso(),
            ],
        )?;
        Ok(())
    }

    /// Most recent records for one entity, newest first.
    pub fn recent_for_entity(
        conn: &Connection,
        entity_type: &str,
        entity_id: &str,
        limit: u32,
    ) -> Result<Vec<AuditRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, actor_id, action, entity_type, entity_id, detail, created_at
             FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY id DESC LIMIT ?3",
        )?;
        let records = stmt
            .query_map(params![entity_type, entity_id, limit], |row| {
                let detail_json: Option<String> = row.get(5)?;
                Ok(AuditRecord {
                    id: row.get(0)?,
                    actor_id: row.get(1)?,
                    action: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    detail: detail_json.and_then(|s| serde_json::from_str(&s).ok()),
                    created_at: row.get(6)?,
                })
            })?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(records)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
