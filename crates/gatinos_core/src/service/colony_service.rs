//! Colony use-cases: CRUD plus presence queries over colony events.
//!
//! # Invariants
//! - A colony's slug is fixed at creation.
//! - "Active" always means referenced by a colony event inside the window;
//!   dead cats are never active.

use crate::activity::{ActivityEvent, ActivityGrid, ActivityMap, DateRange, Locale};
use crate::clock::Clock;
use crate::model::cat::Cat;
use crate::model::colony::{
    validate_colony_fields, Colony, ColonyUpdate, NewColony, DEFAULT_ACTIVE_PERIOD_DAYS,
};
use crate::model::slug::require_slug;
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::cat_repo::CatRepository;
use crate::repo::colony_repo::ColonyRepository;
use crate::repo::presence_repo::PresenceRepository;
use crate::service::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Active cats of a colony split by whether they were sighted on a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SightingSheet {
    pub date: NaiveDate,
    pub seen: Vec<Cat>,
    pub not_seen: Vec<Cat>,
}

/// Colony service over repository implementations.
pub struct ColonyService<S, K> {
    store: S,
    clock: K,
    default_active_period_days: u32,
}

impl<S, K> ColonyService<S, K>
where
    S: ColonyRepository + CatRepository + ActivityRepository + PresenceRepository,
    K: Clock,
{
    pub fn new(store: S, clock: K) -> Self {
        Self {
            store,
            clock,
            default_active_period_days: DEFAULT_ACTIVE_PERIOD_DAYS,
        }
    }

    /// Active period given to colonies created without one.
    pub fn with_default_active_period(mut self, days: u32) -> Self {
        self.default_active_period_days = days;
        self
    }

    pub fn create_colony(&self, input: NewColony) -> ServiceResult<Colony> {
        let slug = match input.slug.as_deref() {
            Some(explicit) => require_slug(explicit)?,
            None => require_slug(&input.name)?,
        };
        let mut colony = Colony {
            id: 0,
            slug,
            name: input.name.trim().to_string(),
            description: input.description,
            active_period_days: input
                .active_period_days
                .unwrap_or(self.default_active_period_days),
        };
        colony.id = self.store.create_colony(&colony)?;
        Ok(colony)
    }

    pub fn get_colony(&self, slug: &str) -> ServiceResult<Colony> {
        self.store
            .get_colony_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("colony", slug))
    }

    /// All colonies ordered by name.
    pub fn list_colonies(&self) -> ServiceResult<Vec<Colony>> {
        Ok(self.store.list_colonies()?)
    }

    pub fn update_colony(&self, slug: &str, update: ColonyUpdate) -> ServiceResult<Colony> {
        let mut colony = self.get_colony(slug)?;
        if let Some(name) = update.name {
            colony.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            colony.description = description;
        }
        if let Some(days) = update.active_period_days {
            colony.active_period_days = days;
        }
        validate_colony_fields(&colony.name, colony.active_period_days)?;
        self.store.update_colony(&colony)?;
        Ok(colony)
    }

    /// Deletes the colony with all of its cats and records.
    pub fn delete_colony(&self, slug: &str) -> ServiceResult<()> {
        let colony = self.get_colony(slug)?;
        self.store.delete_colony(colony.id)?;
        Ok(())
    }

    /// Cats of the colony ordered by name.
    pub fn list_cats(&self, slug: &str, include_neighbours: bool) -> ServiceResult<Vec<Cat>> {
        let colony = self.get_colony(slug)?;
        Ok(self.store.list_colony_cats(colony.id, include_neighbours)?)
    }

    /// Colony events inside `range`.
    pub fn events(&self, slug: &str, range: DateRange) -> ServiceResult<Vec<ActivityEvent>> {
        let colony = self.get_colony(slug)?;
        Ok(self.store.colony_events(colony.id, range)?)
    }

    /// Non-dead cats referenced by colony events in `range`. An open lower
    /// bound defaults to the start of the colony's active period.
    pub fn active_cats(&self, slug: &str, range: DateRange) -> ServiceResult<Vec<Cat>> {
        let colony = self.get_colony(slug)?;
        self.active_cats_of(&colony, range)
    }

    /// Non-dead cats that are not active in the default window.
    pub fn missing_cats(&self, slug: &str) -> ServiceResult<Vec<Cat>> {
        let colony = self.get_colony(slug)?;
        let active: BTreeSet<_> = self
            .active_cats_of(&colony, DateRange::all())?
            .into_iter()
            .map(|cat| cat.id)
            .collect();
        Ok(self
            .store
            .list_colony_cats(colony.id, true)?
            .into_iter()
            .filter(|cat| !cat.is_dead && !active.contains(&cat.id))
            .collect())
    }

    pub fn dead_cats(&self, slug: &str) -> ServiceResult<Vec<Cat>> {
        let colony = self.get_colony(slug)?;
        Ok(self
            .store
            .list_colony_cats(colony.id, true)?
            .into_iter()
            .filter(|cat| cat.is_dead)
            .collect())
    }

    /// Active cats split into sighted / not sighted on `date`, each ordered
    /// by name.
    pub fn sightings_on(&self, slug: &str, date: NaiveDate) -> ServiceResult<SightingSheet> {
        let colony = self.get_colony(slug)?;
        let sighted: BTreeSet<_> = self
            .store
            .colony_sightings_on(colony.id, date)?
            .into_iter()
            .map(|sighting| sighting.cat_id)
            .collect();
        let (seen, not_seen) = self
            .active_cats_of(&colony, DateRange::all())?
            .into_iter()
            .partition(|cat| sighted.contains(&cat.id));
        Ok(SightingSheet {
            date,
            seen,
            not_seen,
        })
    }

    /// Heatmap of colony events over the year ending at `today`.
    pub fn activity_map(
        &self,
        slug: &str,
        today: NaiveDate,
        locale: Locale,
    ) -> ServiceResult<ActivityGrid> {
        let colony = self.get_colony(slug)?;
        let mut map = ActivityMap::new(today);
        let events = self
            .store
            .colony_events(colony.id, DateRange::between(map.base(), today))?;
        map.load_dates(events.iter().map(|event| event.date));
        Ok(map.to_grid(locale))
    }

    fn active_cats_of(&self, colony: &Colony, range: DateRange) -> ServiceResult<Vec<Cat>> {
        let range = DateRange {
            min: range
                .min
                .or_else(|| Some(colony.active_since(self.clock.today()))),
            max: range.max,
        };
        Ok(self.store.active_colony_cats(colony.id, range)?)
    }
}
