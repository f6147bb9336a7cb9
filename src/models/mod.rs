pub mod enums;
pub mod medicine;
pub mod patient;
pub mod prescription;
pub mod stats;
pub mod user;

pub use enums::*;
pub use medicine::*;
pub use patient::*;
pub use prescription::*;
pub use stats::*;
pub use user::*;

use thiserror::Error;

/// A submitted record failed a required-field or range check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Trim-aware "is this required text present" check shared by input records.
pub(crate) fn require_text(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError(format!("{field} is required")));
    }
    Ok(())
}
