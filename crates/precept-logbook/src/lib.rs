//! # precept-logbook
//!
//! The clinical-entry side of the system:
//!
//! - [`lifecycle::EntryLifecycleManager`] owns the entry state machine
//!   (draft → pending → approved/rejected, with resubmission) and is the
//!   only writer of entry status.
//! - [`locks::TermLockRegistry`] owns per-(student, term) logbook locks,
//!   which freeze every entry dated inside the term regardless of its own
//!   status. The lifecycle manager consults it before any create or edit.
//!
//! Mutations run in single transactions and emit change events after
//! commit, matching the assignment engine's discipline.

#![deny(unsafe_code)]

pub mod errors;
pub mod lifecycle;
pub mod locks;

pub use errors::LogbookError;
pub use lifecycle::{CreateDisposition, EntryLifecycleManager, SubmitOutcome};
pub use locks::{LockOutcome, TermLockRegistry};
