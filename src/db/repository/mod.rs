//! Repository layer: entity-scoped database operations.
//!
//! Free functions over `&Connection`, one sub-module per table family.
//! All public functions are re-exported here.

mod medicine;
mod patient;
mod prescription;
mod user;

pub use medicine::*;
pub use patient::*;
pub use prescription::*;
pub use user::*;

use rusqlite::ErrorCode;

/// True when `err` is a SQLite UNIQUE / CHECK / NOT NULL / FK violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
