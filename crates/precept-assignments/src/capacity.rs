//! The capacity ledger.
//!
//! There is no stored counter: the ledger is the count of active rows in
//! the assignments table, taken inside the caller's write transaction.
//! That makes it impossible for the ledger to drift from the data it
//! guards, and `active_count` doubles as the reconciliation recount.

use precept_core::ids::PreceptorId;
use rusqlite::Connection;
use tracing::debug;

use crate::errors::AssignmentError;

/// Hard limit on simultaneously supervised students per preceptor.
pub const MAX_ACTIVE_PER_PRECEPTOR: u32 = 5;

/// Capacity checks over the active-assignment count.
pub struct CapacityLedger;

impl CapacityLedger {
    /// Claim one slot under the preceptor's capacity limit.
    ///
    /// Must be called on a connection that already holds the database write
    /// lock (a `BEGIN IMMEDIATE` transaction). The caller inserts the
    /// assignment row in the same transaction, so the count seen here
    /// cannot change before the insert commits; two concurrent reserves
    /// for the last slot serialize on the write lock and the loser sees
    /// the winner's row.
    pub fn try_reserve(
        conn: &Connection,
        preceptor_id: &PreceptorId,
    ) -> Result<(), AssignmentError> {
        let count = Self::active_count(conn, preceptor_id)?;
        if count >= MAX_ACTIVE_PER_PRECEPTOR {
            debug!(%preceptor_id, count, "capacity check failed");
            return Err(AssignmentError::CapacityExceeded {
                preceptor_id: preceptor_id.clone(),
                limit: MAX_ACTIVE_PER_PRECEPTOR,
            });
        }
        Ok(())
    }

    /// Recount the preceptor's active assignments.
    pub fn active_count(
        conn: &Connection,
        preceptor_id: &PreceptorId,
    ) -> Result<u32, AssignmentError> {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE preceptor_id = ?1 AND status = 'active'",
            rusqlite::params![preceptor_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Free slots remaining under the limit.
    pub fn remaining(
        conn: &Connection,
        preceptor_id: &PreceptorId,
    ) -> Result<u32, AssignmentError> {
        let count = Self::active_count(conn, preceptor_id)?;
        Ok(MAX_ACTIVE_PER_PRECEPTOR.saturating_sub(count))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
