//! Colony (colonia) domain model.
//!
//! # Invariants
//! - `slug` is derived from `name` at creation and stays stable afterwards.
//! - `active_period_days` is strictly positive.

use crate::model::{limit_text, require_text, ValidationError};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Storage row id of a colony.
pub type ColonyId = i64;

/// Default window in which a cat counts as active without new activity.
pub const DEFAULT_ACTIVE_PERIOD_DAYS: u32 = 120;

const NAME_MAX_CHARS: usize = 200;

/// Managed outdoor cat colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colony {
    pub id: ColonyId,
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Days of inactivity after which a cat no longer counts as active.
    pub active_period_days: u32,
}

impl Colony {
    /// Start of the active window ending at `today`.
    pub fn active_since(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(i64::from(self.active_period_days))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_colony_fields(&self.name, self.active_period_days)
    }
}

/// Input for creating a colony.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewColony {
    pub name: String,
    pub description: String,
    /// Explicit slug; derived from `name` when `None`.
    pub slug: Option<String>,
    /// Falls back to the configured default when `None`.
    pub active_period_days: Option<u32>,
}

impl NewColony {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Editable colony fields. `None` leaves a field unchanged; the slug is
/// never edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColonyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active_period_days: Option<u32>,
}

pub(crate) fn validate_colony_fields(
    name: &str,
    active_period_days: u32,
) -> Result<(), ValidationError> {
    require_text("name", name)?;
    limit_text("name", name, NAME_MAX_CHARS)?;
    if active_period_days == 0 {
        return Err(ValidationError::OutOfRange("active_period_days"));
    }
    Ok(())
}
