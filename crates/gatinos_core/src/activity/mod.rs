//! Dated activity events and their aggregation.
//!
//! # Responsibility
//! - Name the kinds of dated evidence that a cat or colony is alive.
//! - Bucket events into the contribution-style grid in [`map`].
//!
//! # Invariants
//! - Every event has exactly one calendar date.
//! - `DateRange` bounds are inclusive on both ends.

use crate::model::cat::CatId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod map;

pub use map::{ActivityGrid, ActivityMap, Locale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Report,
    Photo,
    /// Registration of the cat in its colony.
    Intake,
    Sighting,
    Capture,
    Vaccination,
    Illness,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Photo => "photo",
            Self::Intake => "intake",
            Self::Sighting => "sighting",
            Self::Capture => "capture",
            Self::Vaccination => "vaccination",
            Self::Illness => "illness",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "report" => Some(Self::Report),
            "photo" => Some(Self::Photo),
            "intake" => Some(Self::Intake),
            "sighting" => Some(Self::Sighting),
            "capture" => Some(Self::Capture),
            "vaccination" => Some(Self::Vaccination),
            "illness" => Some(Self::Illness),
            _ => None,
        }
    }
}

/// One dated event.
///
/// `cat_id` is set for single-cat events (intake, sighting, capture,
/// vaccination, illness). Reports and photos reach cats through their tag
/// lists, so collection queries expand them into one event per tagged cat
/// when asked for cat-level events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub kind: EventKind,
    pub date: NaiveDate,
    pub cat_id: Option<CatId>,
    /// Row id (or photo UUID) of the underlying record.
    pub record_id: String,
}

/// Inclusive date filter. `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(min: NaiveDate, max: NaiveDate) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn since(min: NaiveDate) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min.map_or(true, |min| date >= min) && self.max.map_or(true, |max| date <= max)
    }
}

/// Latest event date, if any.
pub fn last_activity(events: &[ActivityEvent]) -> Option<NaiveDate> {
    events.iter().map(|event| event.date).max()
}

#[cfg(test)]
mod tests {
    use super::{last_activity, ActivityEvent, DateRange, EventKind};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = DateRange::between(day(2), day(4));
        assert!(!range.contains(day(1)));
        assert!(range.contains(day(2)));
        assert!(range.contains(day(4)));
        assert!(!range.contains(day(5)));
        assert!(DateRange::all().contains(day(1)));
        assert!(DateRange::since(day(3)).contains(day(31)));
    }

    #[test]
    fn last_activity_picks_latest_date() {
        let events = [day(3), day(9), day(1)]
            .into_iter()
            .map(|date| ActivityEvent {
                kind: EventKind::Sighting,
                date,
                cat_id: Some(1),
                record_id: "1".to_string(),
            })
            .collect::<Vec<_>>();
        assert_eq!(last_activity(&events), Some(day(9)));
        assert_eq!(last_activity(&[]), None);
    }

    #[test]
    fn kind_codes_roundtrip() {
        for kind in [
            EventKind::Report,
            EventKind::Photo,
            EventKind::Intake,
            EventKind::Sighting,
            EventKind::Capture,
            EventKind::Vaccination,
            EventKind::Illness,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
    }
}
