//! Dated records attached to colonies and cats.
//!
//! Every record here contributes to activity: photos, reports, captures,
//! vaccinations, illnesses and sightings. Feeding assignments are the
//! exception; they are duty planning, not evidence of presence.

use crate::model::cat::CatId;
use crate::model::colony::ColonyId;
use crate::model::user::{Author, UserId};
use crate::model::{limit_text, require_text, ValidationError};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Photos are keyed by a random UUID instead of a row id.
pub type PhotoId = Uuid;
pub type ReportId = i64;
pub type CaptureId = i64;
pub type VaccinationId = i64;
pub type IllnessId = i64;
pub type SightingId = i64;
pub type FeedingAssignmentId = i64;

const REPORT_TITLE_MAX_CHARS: usize = 250;
const DIAGNOSIS_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub colony_id: ColonyId,
    pub file_path: String,
    pub description: String,
    pub taken_on: NaiveDate,
    pub is_ugly: bool,
    pub cat_ids: Vec<CatId>,
    pub author: Author,
}

impl Photo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("file_path", &self.file_path)
    }

    /// A photo is ugly when flagged itself or when it shows an ugly cat.
    pub fn is_ugly_with(&self, ugly_cats: &[CatId]) -> bool {
        self.is_ugly || self.cat_ids.iter().any(|id| ugly_cats.contains(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub colony_id: ColonyId,
    pub date: NaiveDate,
    pub title: String,
    pub body: Option<String>,
    pub cat_ids: Vec<CatId>,
    pub author: Author,
}

impl Report {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_report_title(&self.title)
    }
}

pub(crate) fn validate_report_title(title: &str) -> Result<(), ValidationError> {
    require_text("title", title)?;
    limit_text("title", title, REPORT_TITLE_MAX_CHARS)
}

/// Capture record; open until `released_on` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub id: CaptureId,
    pub cat_id: CatId,
    pub captured_on: NaiveDate,
    pub released_on: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    /// The cat was sterilized during this capture.
    pub sterilized: bool,
    pub notes: String,
    pub author: Author,
}

impl Capture {
    pub fn is_open(&self) -> bool {
        self.released_on.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(weight) = self.weight_kg {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ValidationError::OutOfRange("weight_kg"));
            }
        }
        if let Some(released_on) = self.released_on {
            if released_on < self.captured_on {
                return Err(ValidationError::DateOrder {
                    start_field: "captured_on",
                    end_field: "released_on",
                });
            }
        }
        Ok(())
    }
}

/// Editable capture fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaptureUpdate {
    pub weight_kg: Option<Option<f64>>,
    pub sterilized: Option<bool>,
    pub notes: Option<String>,
}

/// Vaccination given during a capture. Dated by the capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccination {
    pub id: VaccinationId,
    pub capture_id: CaptureId,
    pub cat_id: CatId,
    /// Catalog choice name (uppercase).
    pub kind: String,
    pub effect_days: u32,
    pub date: NaiveDate,
    pub author: Author,
}

impl Vaccination {
    /// Last day the vaccination is considered effective.
    pub fn valid_until(&self) -> NaiveDate {
        self.date + Duration::days(i64::from(self.effect_days))
    }

    pub fn is_effective_on(&self, day: NaiveDate) -> bool {
        day >= self.date && day <= self.valid_until()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illness {
    pub id: IllnessId,
    pub cat_id: CatId,
    pub diagnosis: String,
    pub diagnosed_on: NaiveDate,
    pub cured_on: Option<NaiveDate>,
    pub notes: String,
    pub author: Author,
}

impl Illness {
    pub fn is_cured(&self) -> bool {
        self.cured_on.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_diagnosis(&self.diagnosis)?;
        if let Some(cured_on) = self.cured_on {
            if cured_on < self.diagnosed_on {
                return Err(ValidationError::DateOrder {
                    start_field: "diagnosed_on",
                    end_field: "cured_on",
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_diagnosis(diagnosis: &str) -> Result<(), ValidationError> {
    require_text("diagnosis", diagnosis)?;
    limit_text("diagnosis", diagnosis, DIAGNOSIS_MAX_CHARS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    pub id: SightingId,
    pub date: NaiveDate,
    pub cat_id: CatId,
    pub colony_id: ColonyId,
    pub author: Author,
}

/// One user on feeding duty for one colony and day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingAssignment {
    pub id: FeedingAssignmentId,
    pub date: NaiveDate,
    pub user_id: UserId,
    pub username: String,
    pub colony_id: ColonyId,
}

#[cfg(test)]
mod tests {
    use super::{Capture, Illness, Vaccination};
    use crate::model::user::Author;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn capture_rejects_negative_weight_and_early_release() {
        let mut capture = Capture {
            id: 1,
            cat_id: 1,
            captured_on: day(2024, 3, 1),
            released_on: None,
            weight_kg: Some(-1.0),
            sterilized: false,
            notes: String::new(),
            author: Author::system(),
        };
        assert!(capture.validate().is_err());
        capture.weight_kg = Some(3.4);
        capture.released_on = Some(day(2024, 2, 28));
        assert!(capture.validate().is_err());
        capture.released_on = Some(day(2024, 3, 2));
        assert!(capture.validate().is_ok());
        assert!(!capture.is_open());
    }

    #[test]
    fn vaccination_validity_window() {
        let vaccination = Vaccination {
            id: 1,
            capture_id: 1,
            cat_id: 1,
            kind: "RABIA".to_string(),
            effect_days: 365,
            date: day(2024, 1, 1),
            author: Author::system(),
        };
        assert_eq!(vaccination.valid_until(), day(2024, 12, 31));
        assert!(vaccination.is_effective_on(day(2024, 6, 1)));
        assert!(!vaccination.is_effective_on(day(2025, 1, 1)));
    }

    #[test]
    fn illness_is_cured_only_with_cure_date() {
        let mut illness = Illness {
            id: 1,
            cat_id: 1,
            diagnosis: "sarna".to_string(),
            diagnosed_on: day(2024, 4, 1),
            cured_on: None,
            notes: String::new(),
            author: Author::system(),
        };
        assert!(!illness.is_cured());
        illness.cured_on = Some(day(2024, 4, 20));
        assert!(illness.is_cured());
        assert!(illness.validate().is_ok());
    }
}
