//! Sighting and feeding-duty toggles.
//!
//! # Invariants
//! - Sighting toggles are gated by `sight_cat` on the cat.
//! - Feeding toggles are gated by `feed_colony` plus colony membership.
//! - Both toggles use the date they are given, not today.

use crate::model::cat::Cat;
use crate::model::colony::Colony;
use crate::model::permission::{Permission, PermissionPolicy};
use crate::model::records::{FeedingAssignment, Sighting};
use crate::model::user::{Author, User};
use crate::repo::cat_repo::CatRepository;
use crate::repo::colony_repo::ColonyRepository;
use crate::repo::presence_repo::{FeedingToggle, PresenceRepository};
use crate::repo::user_repo::AccessRepository;
use crate::service::{is_allowed_in_colony, is_allowed_on_cat, ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::info;

/// Presence service over repository and policy implementations.
pub struct PresenceService<S, P> {
    store: S,
    policy: P,
}

impl<S, P> PresenceService<S, P>
where
    S: CatRepository + ColonyRepository + PresenceRepository + AccessRepository,
    P: PermissionPolicy,
{
    pub fn new(store: S, policy: P) -> Self {
        Self { store, policy }
    }

    /// Flips whether `cat_slug` was sighted on `date`. Returns `true` when
    /// the cat is sighted afterwards.
    pub fn toggle_sighting(
        &self,
        user: &User,
        cat_slug: &str,
        date: NaiveDate,
    ) -> ServiceResult<bool> {
        let cat = self.load_cat(cat_slug)?;
        if !is_allowed_on_cat(&self.store, &self.policy, user, Permission::SightCat, &cat)? {
            return Err(ServiceError::PermissionDenied {
                username: user.username.clone(),
                permission: Permission::SightCat,
                target: format!("cat `{}`", cat.slug),
            });
        }

        let sighted = self.store.toggle_sighting(&Sighting {
            id: 0,
            date,
            cat_id: cat.id,
            colony_id: cat.colony_id,
            author: Author::of(user),
        })?;
        info!(
            "event=sighting_toggle module=presence status=ok cat={} date={date} sighted={sighted} user_id={}",
            cat.slug, user.id
        );
        Ok(sighted)
    }

    /// Takes, drops or takes over feeding duty for `date`.
    pub fn toggle_feeding(
        &self,
        user: &User,
        colony_slug: &str,
        date: NaiveDate,
    ) -> ServiceResult<FeedingToggle> {
        let colony = self.load_colony(colony_slug)?;
        if !is_allowed_in_colony(
            &self.store,
            &self.policy,
            user,
            Permission::FeedColony,
            colony.id,
        )? {
            return Err(ServiceError::PermissionDenied {
                username: user.username.clone(),
                permission: Permission::FeedColony,
                target: format!("colony `{}`", colony.slug),
            });
        }

        let outcome = self.store.toggle_feeding(colony.id, date, user.id)?;
        info!(
            "event=feeding_toggle module=presence status=ok colony={} date={date} outcome={outcome:?} user_id={}",
            colony.slug, user.id
        );
        Ok(outcome)
    }

    /// Assignments in `[from, to]` ordered by date.
    pub fn feeding_schedule(
        &self,
        colony_slug: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<Vec<FeedingAssignment>> {
        if to < from {
            return Err(ServiceError::rule(format!(
                "schedule range ends ({to}) before it starts ({from})"
            )));
        }
        let colony = self.load_colony(colony_slug)?;
        Ok(self.store.feeding_schedule(colony.id, from, to)?)
    }

    /// Sightings of one cat on `date`.
    pub fn sightings_of(&self, cat_slug: &str, date: NaiveDate) -> ServiceResult<Vec<Sighting>> {
        let cat = self.load_cat(cat_slug)?;
        Ok(self.store.cat_sightings_on(cat.id, date)?)
    }

    fn load_cat(&self, slug: &str) -> ServiceResult<Cat> {
        self.store
            .get_cat_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("cat", slug))
    }

    fn load_colony(&self, slug: &str) -> ServiceResult<Colony> {
        self.store
            .get_colony_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("colony", slug))
    }
}
