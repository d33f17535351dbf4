//! # precept-assignments
//!
//! The assignment engine: creates and ends supervisory relationships
//! between students and preceptors under three invariants checked
//! atomically with the write:
//!
//! - a preceptor never holds more than
//!   [`capacity::MAX_ACTIVE_PER_PRECEPTOR`] active assignments;
//! - a student never holds more than one active assignment;
//! - student and preceptor must belong to the same institution at
//!   assignment time.
//!
//! Each mutation runs in a single `BEGIN IMMEDIATE` transaction and emits a
//! change event after commit.

#![deny(unsafe_code)]

pub mod capacity;
pub mod engine;
pub mod errors;

pub use capacity::{CapacityLedger, MAX_ACTIVE_PER_PRECEPTOR};
pub use engine::AssignmentEngine;
pub use errors::AssignmentError;
