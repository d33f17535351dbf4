//! Error type for store operations.

use thiserror::Error;

/// Errors surfaced by the persistence layer.
///
/// Infrastructure failures (`Sqlite`, `Pool`) are kept distinct from the
/// engines' domain errors so callers can retry them with backoff without
/// ever retrying a domain rejection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool exhausted or unavailable.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON (de)serialization of a stored column failed.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A schema migration failed to apply.
    #[error("migration error: {message}")]
    Migration {
        /// Which migration failed and why.
        message: String,
    },
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_errors_convert() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert!(err.to_string().starts_with("sqlite error"));
    }

    #[test]
    fn migration_error_names_the_migration() {
        let err = StoreError::Migration {
            message: "v001 failed: syntax error".into(),
        };
        assert_eq!(err.to_string(), "migration error: v001 failed: syntax error");
    }
}
