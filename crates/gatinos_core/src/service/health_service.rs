//! Health records: capture details, vaccinations and illnesses.
//!
//! # Invariants
//! - Vaccinations attach to an open capture of a captured cat, and store the
//!   catalog effect as of the moment they are given.
//! - Diagnosis and cure dates are stamped with today.

use crate::clock::Clock;
use crate::model::cat::{Cat, CatId};
use crate::model::lifecycle::CatState;
use crate::model::permission::{Permission, PermissionPolicy};
use crate::model::records::{
    validate_diagnosis, Capture, CaptureId, CaptureUpdate, Illness, IllnessId, Vaccination,
};
use crate::model::user::{Author, User};
use crate::repo::capture_repo::CaptureRepository;
use crate::repo::cat_repo::CatRepository;
use crate::repo::record_repo::IllnessRepository;
use crate::repo::user_repo::AccessRepository;
use crate::service::{is_allowed_on_cat, ServiceError, ServiceResult};
use crate::vaccines::VaccineCatalog;
use log::info;

/// Health service over repository, policy and catalog.
pub struct HealthService<S, K, P> {
    store: S,
    clock: K,
    policy: P,
    catalog: VaccineCatalog,
}

impl<S, K, P> HealthService<S, K, P>
where
    S: CatRepository + CaptureRepository + IllnessRepository + AccessRepository,
    K: Clock,
    P: PermissionPolicy,
{
    pub fn new(store: S, clock: K, policy: P, catalog: VaccineCatalog) -> Self {
        Self {
            store,
            clock,
            policy,
            catalog,
        }
    }

    pub fn catalog(&self) -> &VaccineCatalog {
        &self.catalog
    }

    pub fn get_capture(&self, id: CaptureId) -> ServiceResult<Capture> {
        self.store
            .get_capture(id)?
            .ok_or_else(|| ServiceError::not_found("capture", id))
    }

    /// Edits weight, notes and the sterilized flag of a capture.
    pub fn update_capture(&self, id: CaptureId, update: CaptureUpdate) -> ServiceResult<Capture> {
        let mut capture = self.get_capture(id)?;
        if let Some(weight_kg) = update.weight_kg {
            capture.weight_kg = weight_kg;
        }
        if let Some(sterilized) = update.sterilized {
            capture.sterilized = sterilized;
        }
        if let Some(notes) = update.notes {
            capture.notes = notes;
        }
        self.store.update_capture(&capture)?;
        Ok(capture)
    }

    /// Records a vaccination of catalog kind `choice` during capture
    /// `capture_id`.
    pub fn vaccinate(
        &self,
        user: &User,
        capture_id: CaptureId,
        choice: &str,
    ) -> ServiceResult<Vaccination> {
        let capture = self.get_capture(capture_id)?;
        let cat = self.load_cat_by_id(capture.cat_id)?;

        if !is_allowed_on_cat(&self.store, &self.policy, user, Permission::VaccinateCat, &cat)? {
            return Err(ServiceError::PermissionDenied {
                username: user.username.clone(),
                permission: Permission::VaccinateCat,
                target: format!("cat `{}`", cat.slug),
            });
        }
        if !capture.is_open() {
            return Err(ServiceError::rule(format!(
                "capture {capture_id} of cat `{}` is already closed",
                cat.slug
            )));
        }
        if cat.state != CatState::Captured {
            return Err(ServiceError::rule(format!(
                "cat `{}` is not captured (state `{}`)",
                cat.slug, cat.state
            )));
        }

        let vaccine = self.catalog.get(choice)?;
        let mut vaccination = Vaccination {
            id: 0,
            capture_id,
            cat_id: cat.id,
            kind: vaccine.choice_name.clone(),
            effect_days: vaccine.effect_days,
            date: capture.captured_on,
            author: Author::of(user),
        };
        vaccination.id = self.store.add_vaccination(&vaccination)?;
        info!(
            "event=vaccinate module=health status=ok cat={} capture_id={capture_id} kind={}",
            cat.slug, vaccination.kind
        );
        Ok(vaccination)
    }

    /// Opens an illness record dated today.
    pub fn diagnose(
        &self,
        user: &User,
        cat_slug: &str,
        diagnosis: &str,
        notes: &str,
    ) -> ServiceResult<Illness> {
        let cat = self.load_cat(cat_slug)?;
        let diagnosis = diagnosis.trim().to_string();
        validate_diagnosis(&diagnosis)?;

        let mut illness = Illness {
            id: 0,
            cat_id: cat.id,
            diagnosis,
            diagnosed_on: self.clock.today(),
            cured_on: None,
            notes: notes.to_string(),
            author: Author::of(user),
        };
        illness.id = self.store.add_illness(&illness)?;
        Ok(illness)
    }

    /// Edits diagnosis text and notes.
    pub fn update_illness(
        &self,
        id: IllnessId,
        diagnosis: Option<String>,
        notes: Option<String>,
    ) -> ServiceResult<Illness> {
        let mut illness = self.get_illness(id)?;
        if let Some(diagnosis) = diagnosis {
            illness.diagnosis = diagnosis.trim().to_string();
        }
        if let Some(notes) = notes {
            illness.notes = notes;
        }
        self.store.update_illness(&illness)?;
        Ok(illness)
    }

    /// Marks the illness cured today.
    pub fn cure(&self, id: IllnessId) -> ServiceResult<Illness> {
        let mut illness = self.get_illness(id)?;
        if illness.is_cured() {
            return Err(ServiceError::rule(format!("illness {id} is already cured")));
        }
        illness.cured_on = Some(self.clock.today());
        self.store.update_illness(&illness)?;
        Ok(illness)
    }

    pub fn get_illness(&self, id: IllnessId) -> ServiceResult<Illness> {
        self.store
            .get_illness(id)?
            .ok_or_else(|| ServiceError::not_found("illness", id))
    }

    /// Illnesses of a cat, most recent diagnosis first.
    pub fn illnesses(&self, cat_slug: &str) -> ServiceResult<Vec<Illness>> {
        let cat = self.load_cat(cat_slug)?;
        Ok(self.store.list_cat_illnesses(cat.id)?)
    }

    /// Vaccinations of a cat still effective today.
    pub fn effective_vaccinations(&self, cat_slug: &str) -> ServiceResult<Vec<Vaccination>> {
        let cat = self.load_cat(cat_slug)?;
        let today = self.clock.today();
        Ok(self
            .store
            .list_cat_vaccinations(cat.id)?
            .into_iter()
            .filter(|vaccination| vaccination.is_effective_on(today))
            .collect())
    }

    fn load_cat(&self, slug: &str) -> ServiceResult<Cat> {
        self.store
            .get_cat_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("cat", slug))
    }

    fn load_cat_by_id(&self, id: CatId) -> ServiceResult<Cat> {
        self.store
            .get_cat(id)?
            .ok_or_else(|| ServiceError::not_found("cat", id))
    }
}
