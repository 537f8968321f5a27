//! Photo and report use-cases.
//!
//! # Invariants
//! - Every tagged or mentioned cat belongs to the record's colony.
//! - Records are stamped with the acting user as author.

use crate::clock::Clock;
use crate::model::cat::{Cat, CatId};
use crate::model::colony::Colony;
use crate::model::records::{validate_report_title, Photo, PhotoId, Report, ReportId};
use crate::model::user::{Author, User};
use crate::model::require_text;
use crate::repo::cat_repo::CatRepository;
use crate::repo::colony_repo::ColonyRepository;
use crate::repo::record_repo::RecordRepository;
use crate::service::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use uuid::Uuid;

/// Input for uploading a photo record. The file itself is stored elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPhoto {
    pub file_path: String,
    pub description: String,
    /// Defaults to today.
    pub taken_on: Option<NaiveDate>,
    pub is_ugly: bool,
    pub cat_slugs: Vec<String>,
}

/// Input for writing a report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewReport {
    pub title: String,
    pub body: Option<String>,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
    pub cat_slugs: Vec<String>,
}

/// Editable report fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportUpdate {
    pub title: Option<String>,
    pub body: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub cat_slugs: Option<Vec<String>>,
}

/// Record service over repository implementations.
pub struct RecordService<S, K> {
    store: S,
    clock: K,
}

impl<S, K> RecordService<S, K>
where
    S: RecordRepository + CatRepository + ColonyRepository,
    K: Clock,
{
    pub fn new(store: S, clock: K) -> Self {
        Self { store, clock }
    }

    pub fn add_photo(&self, user: &User, colony_slug: &str, input: NewPhoto) -> ServiceResult<Photo> {
        let colony = self.load_colony(colony_slug)?;
        require_text("file_path", &input.file_path)?;
        let cat_ids = self.resolve_colony_cats(&colony, &input.cat_slugs)?;

        let photo = Photo {
            id: Uuid::new_v4(),
            colony_id: colony.id,
            file_path: input.file_path,
            description: input.description,
            taken_on: input.taken_on.unwrap_or_else(|| self.clock.today()),
            is_ugly: input.is_ugly,
            cat_ids,
            author: Author::of(user),
        };
        self.store.add_photo(&photo)?;
        Ok(photo)
    }

    pub fn get_photo(&self, id: PhotoId) -> ServiceResult<Photo> {
        self.store
            .get_photo(id)?
            .ok_or_else(|| ServiceError::not_found("photo", id))
    }

    /// Adds one cat to the photo's tag list.
    pub fn tag_photo(&self, id: PhotoId, cat_slug: &str) -> ServiceResult<Photo> {
        let mut photo = self.get_photo(id)?;
        let cat = self.load_cat(cat_slug)?;
        if cat.colony_id != photo.colony_id {
            return Err(ServiceError::rule(format!(
                "cat `{}` does not belong to the photo's colony",
                cat.slug
            )));
        }
        if !photo.cat_ids.contains(&cat.id) {
            photo.cat_ids.push(cat.id);
            photo.cat_ids.sort_unstable();
            self.store.set_photo_cats(id, &photo.cat_ids)?;
        }
        Ok(photo)
    }

    /// Removes one cat from the photo's tag list.
    pub fn untag_photo(&self, id: PhotoId, cat_slug: &str) -> ServiceResult<Photo> {
        let mut photo = self.get_photo(id)?;
        let cat = self.load_cat(cat_slug)?;
        if photo.cat_ids.contains(&cat.id) {
            photo.cat_ids.retain(|tagged| *tagged != cat.id);
            self.store.set_photo_cats(id, &photo.cat_ids)?;
        }
        Ok(photo)
    }

    /// Photos of the colony, newest first.
    pub fn list_photos(&self, colony_slug: &str) -> ServiceResult<Vec<Photo>> {
        let colony = self.load_colony(colony_slug)?;
        Ok(self.store.list_colony_photos(colony.id)?)
    }

    /// Photos that are neither flagged ugly nor show an ugly cat.
    pub fn showcase_photos(&self, colony_slug: &str) -> ServiceResult<Vec<Photo>> {
        let colony = self.load_colony(colony_slug)?;
        let ugly: Vec<CatId> = self
            .store
            .list_colony_cats(colony.id, true)?
            .into_iter()
            .filter(|cat| cat.is_ugly)
            .map(|cat| cat.id)
            .collect();
        Ok(self
            .store
            .list_colony_photos(colony.id)?
            .into_iter()
            .filter(|photo| !photo.is_ugly_with(&ugly))
            .collect())
    }

    pub fn delete_photo(&self, id: PhotoId) -> ServiceResult<()> {
        Ok(self.store.delete_photo(id)?)
    }

    pub fn add_report(
        &self,
        user: &User,
        colony_slug: &str,
        input: NewReport,
    ) -> ServiceResult<Report> {
        let colony = self.load_colony(colony_slug)?;
        let title = input.title.trim().to_string();
        validate_report_title(&title)?;
        let cat_ids = self.resolve_colony_cats(&colony, &input.cat_slugs)?;

        let mut report = Report {
            id: 0,
            colony_id: colony.id,
            date: input.date.unwrap_or_else(|| self.clock.today()),
            title,
            body: input.body.filter(|body| !body.trim().is_empty()),
            cat_ids,
            author: Author::of(user),
        };
        report.id = self.store.add_report(&report)?;
        Ok(report)
    }

    pub fn get_report(&self, id: ReportId) -> ServiceResult<Report> {
        self.store
            .get_report(id)?
            .ok_or_else(|| ServiceError::not_found("report", id))
    }

    pub fn update_report(&self, id: ReportId, update: ReportUpdate) -> ServiceResult<Report> {
        let mut report = self.get_report(id)?;
        if let Some(title) = update.title {
            report.title = title.trim().to_string();
        }
        if let Some(body) = update.body {
            report.body = body.filter(|text| !text.trim().is_empty());
        }
        if let Some(date) = update.date {
            report.date = date;
        }
        if let Some(cat_slugs) = update.cat_slugs {
            let colony = self
                .store
                .get_colony(report.colony_id)?
                .ok_or_else(|| ServiceError::not_found("colony", report.colony_id))?;
            report.cat_ids = self.resolve_colony_cats(&colony, &cat_slugs)?;
        }
        self.store.update_report(&report)?;
        Ok(report)
    }

    /// Reports of the colony, newest first.
    pub fn list_reports(&self, colony_slug: &str) -> ServiceResult<Vec<Report>> {
        let colony = self.load_colony(colony_slug)?;
        Ok(self.store.list_colony_reports(colony.id)?)
    }

    pub fn delete_report(&self, id: ReportId) -> ServiceResult<()> {
        Ok(self.store.delete_report(id)?)
    }

    fn load_colony(&self, slug: &str) -> ServiceResult<Colony> {
        self.store
            .get_colony_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("colony", slug))
    }

    fn load_cat(&self, slug: &str) -> ServiceResult<Cat> {
        self.store
            .get_cat_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("cat", slug))
    }

    fn resolve_colony_cats(&self, colony: &Colony, slugs: &[String]) -> ServiceResult<Vec<CatId>> {
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let cat = self.load_cat(slug)?;
            if cat.colony_id != colony.id {
                return Err(ServiceError::rule(format!(
                    "cat `{}` does not belong to colony `{}`",
                    cat.slug, colony.slug
                )));
            }
            ids.push(cat.id);
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
