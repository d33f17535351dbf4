//! Data-access layer. One repository per entity family.
//!
//! All methods take a `&Connection` and are stateless. Callers that need
//! atomicity across repository calls open the transaction themselves;
//! `rusqlite::Transaction` derefs to `Connection`, so every method works
//! inside or outside one.

pub mod assignments;
pub mod audit;
pub mod entries;
pub mod institutions;
pub mod profiles;
pub mod terms;

use chrono::NaiveDate;

pub use assignments::AssignmentRepo;
pub use audit::{AppendAudit, AuditRepo};
pub use entries::EntryRepo;
pub use institutions::InstitutionRepo;
pub use profiles::ProfileRepo;
pub use terms::TermRepo;

/// Current UTC timestamp as an ISO-8601 string.
pub(crate) fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Format a date for storage.
pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a stored date. Rows are only ever written through [`date_to_sql`],
/// so a parse failure means external tampering; it reads as the epoch date
/// rather than failing the whole scan.
pub(crate) fn date_from_sql(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}
