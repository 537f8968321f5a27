//! Domain model for colonies, cats and their dated records.
//!
//! # Responsibility
//! - Define canonical data structures used by repositories and services.
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - Every write path calls the entity's `validate()` before persistence.
//! - Slugs are derived from names and never edited directly.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cat;
pub mod colony;
pub mod lifecycle;
pub mod permission;
pub mod records;
pub mod slug;
pub mod user;

/// Field-level validation failures for domain entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trimming.
    EmptyField(&'static str),
    /// Text field exceeds its storage limit.
    TooLong { field: &'static str, max: usize },
    /// Name produces an empty slug (for example only punctuation).
    EmptySlug(String),
    /// Numeric field is outside its accepted range.
    OutOfRange(&'static str),
    /// A closing date precedes its opening date.
    DateOrder {
        start_field: &'static str,
        end_field: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::TooLong { field, max } => {
                write!(f, "`{field}` must be at most {max} characters")
            }
            Self::EmptySlug(name) => write!(f, "name `{name}` does not produce a usable slug"),
            Self::OutOfRange(field) => write!(f, "`{field}` is out of range"),
            Self::DateOrder {
                start_field,
                end_field,
            } => write!(f, "`{end_field}` must not be earlier than `{start_field}`"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn limit_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
