//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the colony registry.
//! - Apply schema migrations in deterministic order.
//! - Provide the date codec shared by every repository.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Calendar dates are persisted as ISO `YYYY-MM-DD` text.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Formats a date the way it is stored in every `*_on`/`*_date` column.
pub fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a stored date column value. Returns `None` for malformed text.
pub fn date_from_db(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::{date_from_db, date_to_db};
    use chrono::NaiveDate;

    #[test]
    fn dates_use_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date");
        assert_eq!(date_to_db(date), "2024-06-02");
        assert_eq!(date_from_db("2024-06-02"), Some(date));
        assert_eq!(date_from_db("02/06/2024"), None);
    }
}
