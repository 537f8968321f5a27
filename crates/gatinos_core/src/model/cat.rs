//! Cat (gato) domain model.
//!
//! # Responsibility
//! - Define the tracked individual and its identity/presentation fields.
//! - Keep life-cycle bookkeeping (`state`, `is_dead`, `died_on`) in one place.
//!
//! # Invariants
//! - `slug` is always `slugify(name)`.
//! - `is_dead == true` iff `state == CatState::Dead`.
//! - `died_on` is set only when `is_dead`.

use crate::model::colony::ColonyId;
use crate::model::lifecycle::CatState;
use crate::model::records::PhotoId;
use crate::model::{limit_text, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage row id of a cat.
pub type CatId = i64;

const NAME_MAX_CHARS: usize = 200;
const COLOR_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "H")]
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "H",
        }
    }

    /// Accepts the stored code (`M`/`H`) or an English word.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "m" | "male" | "macho" => Some(Self::Male),
            "h" | "f" | "female" | "hembra" => Some(Self::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cat {
    pub id: CatId,
    pub slug: String,
    pub name: String,
    pub color: String,
    pub description: String,
    pub colony_id: ColonyId,
    pub portrait_photo_id: Option<PhotoId>,
    pub sex: Sex,
    pub sterilized_on: Option<NaiveDate>,
    /// Hidden from showcase photo selections.
    pub is_ugly: bool,
    /// Belongs to a neighbour rather than the colony itself.
    pub is_neighbour: bool,
    pub neighbour_name: String,
    /// Intake date; always counts as activity.
    pub registered_on: NaiveDate,
    pub is_dead: bool,
    pub died_on: Option<NaiveDate>,
    pub state: CatState,
}

impl Cat {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_cat_fields(&self.name, &self.color)?;
        if self.is_dead != (self.state == CatState::Dead) {
            return Err(ValidationError::OutOfRange("is_dead"));
        }
        if !self.is_dead && self.died_on.is_some() {
            return Err(ValidationError::OutOfRange("died_on"));
        }
        if let Some(died_on) = self.died_on {
            if died_on < self.registered_on {
                return Err(ValidationError::DateOrder {
                    start_field: "registered_on",
                    end_field: "died_on",
                });
            }
        }
        Ok(())
    }

    /// URL of the portrait image, or `placeholder` when no portrait is set.
    pub fn photo_url(&self, placeholder: &str) -> String {
        match self.portrait_photo_id {
            Some(id) => format!("/fotos/{id}"),
            None => placeholder.to_string(),
        }
    }
}

/// Input for registering a cat in a colony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCat {
    pub name: String,
    pub sex: Sex,
    pub color: String,
    pub description: String,
    pub is_neighbour: bool,
    pub neighbour_name: String,
}

impl NewCat {
    pub fn new(name: impl Into<String>, sex: Sex) -> Self {
        Self {
            name: name.into(),
            sex,
            color: String::new(),
            description: String::new(),
            is_neighbour: false,
            neighbour_name: String::new(),
        }
    }
}

/// Partial update of editable cat fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatUpdate {
    pub name: Option<String>,
    pub sex: Option<Sex>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub is_ugly: Option<bool>,
    pub is_neighbour: Option<bool>,
    pub neighbour_name: Option<String>,
    pub sterilized_on: Option<Option<NaiveDate>>,
    pub portrait_photo_id: Option<Option<PhotoId>>,
}

pub(crate) fn validate_cat_fields(name: &str, color: &str) -> Result<(), ValidationError> {
    require_text("name", name)?;
    limit_text("name", name, NAME_MAX_CHARS)?;
    limit_text("color", color, COLOR_MAX_CHARS)?;
    Ok(())
}
