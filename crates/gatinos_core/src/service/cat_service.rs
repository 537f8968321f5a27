//! Cat use-cases: registration, edits and derived read models.
//!
//! # Invariants
//! - A cat's slug is re-derived whenever its name changes.
//! - New cats start `Free`, alive, registered today.
//! - A portrait must be a photo that tags the cat.

use crate::activity::{last_activity, ActivityEvent, ActivityGrid, ActivityMap, DateRange, Locale};
use crate::clock::Clock;
use crate::model::cat::{validate_cat_fields, Cat, CatUpdate, NewCat};
use crate::model::lifecycle::CatState;
use crate::model::records::{Capture, Illness, Vaccination};
use crate::model::slug::require_slug;
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::capture_repo::CaptureRepository;
use crate::repo::cat_repo::CatRepository;
use crate::repo::colony_repo::ColonyRepository;
use crate::repo::record_repo::{IllnessRepository, RecordRepository};
use crate::service::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use serde::Serialize;

/// Everything the detail view of one cat shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatProfile {
    pub cat: Cat,
    pub colony_slug: String,
    pub state_color: &'static str,
    pub photo_url: String,
    pub open_capture: Option<Capture>,
    pub is_captured: bool,
    pub weight_kg: Option<f64>,
    pub last_activity: NaiveDate,
    pub captures: Vec<Capture>,
    pub vaccinations: Vec<Vaccination>,
    pub illnesses: Vec<Illness>,
}

/// Cat service over repository implementations.
pub struct CatService<S, K> {
    store: S,
    clock: K,
}

impl<S, K> CatService<S, K>
where
    S: CatRepository
        + ColonyRepository
        + CaptureRepository
        + RecordRepository
        + IllnessRepository
        + ActivityRepository,
    K: Clock,
{
    pub fn new(store: S, clock: K) -> Self {
        Self { store, clock }
    }

    /// Registers a cat in the colony identified by `colony_slug`.
    pub fn create_cat(&self, colony_slug: &str, input: NewCat) -> ServiceResult<Cat> {
        let colony = self
            .store
            .get_colony_by_slug(colony_slug)?
            .ok_or_else(|| ServiceError::not_found("colony", colony_slug))?;
        let name = input.name.trim().to_string();
        validate_cat_fields(&name, &input.color)?;

        let mut cat = Cat {
            id: 0,
            slug: require_slug(&name)?,
            name,
            color: input.color,
            description: input.description,
            colony_id: colony.id,
            portrait_photo_id: None,
            sex: input.sex,
            sterilized_on: None,
            is_ugly: false,
            is_neighbour: input.is_neighbour,
            neighbour_name: input.neighbour_name,
            registered_on: self.clock.today(),
            is_dead: false,
            died_on: None,
            state: CatState::Free,
        };
        cat.id = self.store.create_cat(&cat)?;
        Ok(cat)
    }

    pub fn get_cat(&self, slug: &str) -> ServiceResult<Cat> {
        self.store
            .get_cat_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("cat", slug))
    }

    /// Cats in `state` across all colonies.
    pub fn list_in_state(&self, state: CatState) -> ServiceResult<Vec<Cat>> {
        Ok(self.store.list_cats_in_states(&[state])?)
    }

    pub fn update_cat(&self, slug: &str, update: CatUpdate) -> ServiceResult<Cat> {
        let mut cat = self.get_cat(slug)?;
        if let Some(name) = update.name {
            cat.name = name.trim().to_string();
            cat.slug = require_slug(&cat.name)?;
        }
        if let Some(sex) = update.sex {
            cat.sex = sex;
        }
        if let Some(color) = update.color {
            cat.color = color;
        }
        if let Some(description) = update.description {
            cat.description = description;
        }
        if let Some(is_ugly) = update.is_ugly {
            cat.is_ugly = is_ugly;
        }
        if let Some(is_neighbour) = update.is_neighbour {
            cat.is_neighbour = is_neighbour;
        }
        if let Some(neighbour_name) = update.neighbour_name {
            cat.neighbour_name = neighbour_name;
        }
        if let Some(sterilized_on) = update.sterilized_on {
            cat.sterilized_on = sterilized_on;
        }
        if let Some(portrait) = update.portrait_photo_id {
            if let Some(photo_id) = portrait {
                let photo = self
                    .store
                    .get_photo(photo_id)?
                    .ok_or_else(|| ServiceError::not_found("photo", photo_id))?;
                if !photo.cat_ids.contains(&cat.id) {
                    return Err(ServiceError::rule(format!(
                        "photo {photo_id} does not show cat `{}`",
                        cat.slug
                    )));
                }
            }
            cat.portrait_photo_id = portrait;
        }

        self.store.update_cat(&cat)?;
        Ok(cat)
    }

    pub fn delete_cat(&self, slug: &str) -> ServiceResult<()> {
        let cat = self.get_cat(slug)?;
        self.store.delete_cat(cat.id)?;
        Ok(())
    }

    pub fn last_open_capture(&self, slug: &str) -> ServiceResult<Option<Capture>> {
        let cat = self.get_cat(slug)?;
        Ok(self.store.last_open_capture(cat.id)?)
    }

    pub fn is_captured(&self, slug: &str) -> ServiceResult<bool> {
        Ok(self.last_open_capture(slug)?.is_some())
    }

    /// Weight from the most recent capture that recorded one.
    pub fn weight(&self, slug: &str) -> ServiceResult<Option<f64>> {
        let cat = self.get_cat(slug)?;
        Ok(self.store.latest_weight(cat.id)?)
    }

    /// Captures, newest first.
    pub fn captures(&self, slug: &str) -> ServiceResult<Vec<Capture>> {
        let cat = self.get_cat(slug)?;
        Ok(self.store.list_cat_captures(cat.id)?)
    }

    /// Vaccinations, newest first.
    pub fn vaccinations(&self, slug: &str) -> ServiceResult<Vec<Vaccination>> {
        let cat = self.get_cat(slug)?;
        Ok(self.store.list_cat_vaccinations(cat.id)?)
    }

    pub fn profile(&self, slug: &str, placeholder_photo_url: &str) -> ServiceResult<CatProfile> {
        let cat = self.get_cat(slug)?;
        let colony = self
            .store
            .get_colony(cat.colony_id)?
            .ok_or_else(|| ServiceError::not_found("colony", cat.colony_id))?;
        let open_capture = self.store.last_open_capture(cat.id)?;
        let events = self.store.cat_events(&cat, DateRange::all())?;

        Ok(CatProfile {
            colony_slug: colony.slug,
            state_color: cat.state.color(),
            photo_url: cat.photo_url(placeholder_photo_url),
            is_captured: open_capture.is_some(),
            open_capture,
            weight_kg: self.store.latest_weight(cat.id)?,
            last_activity: last_activity(&events).unwrap_or(cat.registered_on),
            captures: self.store.list_cat_captures(cat.id)?,
            vaccinations: self.store.list_cat_vaccinations(cat.id)?,
            illnesses: self.store.list_cat_illnesses(cat.id)?,
            cat,
        })
    }

    /// Cat events inside `range`; the intake is always included.
    pub fn events(&self, slug: &str, range: DateRange) -> ServiceResult<Vec<ActivityEvent>> {
        let cat = self.get_cat(slug)?;
        Ok(self.store.cat_events(&cat, range)?)
    }

    /// Date of the latest event of any kind.
    pub fn last_activity(&self, slug: &str) -> ServiceResult<NaiveDate> {
        let cat = self.get_cat(slug)?;
        let events = self.store.cat_events(&cat, DateRange::all())?;
        Ok(last_activity(&events).unwrap_or(cat.registered_on))
    }

    /// Heatmap of the cat's events over the year ending at `today`.
    pub fn activity_map(
        &self,
        slug: &str,
        today: NaiveDate,
        locale: Locale,
    ) -> ServiceResult<ActivityGrid> {
        let cat = self.get_cat(slug)?;
        let mut map = ActivityMap::new(today);
        let window = DateRange::between(map.base(), today);
        let events = self.store.cat_events(&cat, window)?;
        // The intake comes back even when it predates the window.
        map.load_dates(
            events
                .iter()
                .map(|event| event.date)
                .filter(|date| window.contains(*date)),
        );
        Ok(map.to_grid(locale))
    }
}
