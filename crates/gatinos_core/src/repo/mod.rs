//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts, one trait per concern.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce the entity's `validate()` before persistence.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.
//! - Multi-row writes run inside one immediate transaction.

use crate::db::{date_from_db, DbError};
use crate::model::user::Author;
use crate::model::ValidationError;
use chrono::NaiveDate;
use rusqlite::{Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod activity_repo;
pub mod capture_repo;
pub mod cat_repo;
pub mod colony_repo;
pub mod presence_repo;
pub mod record_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, key: String },
    /// Unique key already taken.
    Conflict { entity: &'static str, key: String },
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn conflict(entity: &'static str, key: impl ToString) -> Self {
        Self::Conflict {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict { entity, key } => write!(f, "{entity} already exists: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// SQLite-backed store. Each repository trait is implemented for it in its
/// own module, so services can bound on exactly the contracts they use.
#[derive(Clone, Copy)]
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Wraps a migrated connection (see [`crate::db::open_db`]).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }
}

/// Maps a UNIQUE constraint failure to `Conflict`; passes anything else on.
pub(crate) fn map_unique(
    err: rusqlite::Error,
    entity: &'static str,
    key: impl ToString,
) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::conflict(entity, key)
        }
        _ => RepoError::from(err),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_date(value: &str, column: &'static str) -> RepoResult<NaiveDate> {
    date_from_db(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub(crate) fn parse_opt_date(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<NaiveDate>> {
    value
        .map(|text| parse_date(&text, column))
        .transpose()
}

/// Reads the `author_id`/`author_name` pair shared by user-bound tables.
pub(crate) fn parse_author(row: &Row<'_>) -> RepoResult<Author> {
    Ok(Author {
        user_id: row.get("author_id")?,
        name: row.get("author_name")?,
    })
}
