//! # precept-core
//!
//! Shared domain vocabulary for the precept workspace: branded ID newtypes,
//! status enums with their SQL string mappings, and the [`events::DomainEvent`]
//! enum fanned out to dashboards after every successful mutation.
//!
//! This crate does no I/O. Persistence lives in `precept-store`, business
//! rules in the engine crates.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod types;

pub use events::{DomainEvent, EntityKind};
pub use ids::{AssignmentId, EntryId, InstitutionId, PreceptorId, StudentId};
pub use types::{AssignmentStatus, EntryStatus, ReviewDecision, Role};
