//! # precept-store
//!
//! SQLite persistence for the precept workspace:
//!
//! - **Connection pool**: `r2d2` over `rusqlite`, with WAL mode, foreign
//!   keys, and a busy timeout set per-connection by a pragma customizer.
//! - **Migrations**: versioned SQL embedded at compile time, tracked in a
//!   `schema_version` table, idempotent to re-run.
//! - **Repositories**: one stateless data-access struct per entity family
//!   (profiles, institutions, assignments, entries, terms/locks, audit).
//!
//! Repositories translate between Rust types and SQL and nothing more.
//! Invariant enforcement (capacity, state transitions, lock gating) lives
//! in the engine crates, which open the transactions.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod types;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{Result, StoreError};
