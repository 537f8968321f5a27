//! Photo, report and illness persistence.
//!
//! # Responsibility
//! - Store colony-level records (photos, reports) with their cat tag lists.
//! - Store per-cat illness records.
//!
//! # Invariants
//! - A record row and its tag rows are written in one transaction.
//! - Tag lists are returned sorted by cat id.

use crate::db::date_to_db;
use crate::model::cat::CatId;
use crate::model::colony::ColonyId;
use crate::model::records::{Illness, IllnessId, Photo, PhotoId, Report, ReportId};
use crate::repo::{
    bool_to_int, int_to_bool, parse_author, parse_date, parse_opt_date, RepoError, RepoResult,
    SqliteStore,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use uuid::Uuid;

const PHOTO_SELECT_SQL: &str = "SELECT
    id,
    colony_id,
    file_path,
    description,
    taken_on,
    is_ugly,
    author_id,
    author_name
FROM photos";

const REPORT_SELECT_SQL: &str = "SELECT
    id,
    colony_id,
    report_date,
    title,
    body,
    author_id,
    author_name
FROM reports";

const ILLNESS_SELECT_SQL: &str = "SELECT
    id,
    cat_id,
    diagnosis,
    diagnosed_on,
    cured_on,
    notes,
    author_id,
    author_name
FROM illnesses";

/// Repository interface for photos and reports.
pub trait RecordRepository {
    fn add_photo(&self, photo: &Photo) -> RepoResult<PhotoId>;
    fn get_photo(&self, id: PhotoId) -> RepoResult<Option<Photo>>;
    /// Photos of one colony, newest first.
    fn list_colony_photos(&self, colony_id: ColonyId) -> RepoResult<Vec<Photo>>;
    /// Replaces the tag list of a photo.
    fn set_photo_cats(&self, id: PhotoId, cat_ids: &[CatId]) -> RepoResult<()>;
    fn delete_photo(&self, id: PhotoId) -> RepoResult<()>;

    /// Inserts `report` (its `id` is ignored) and returns the new row id.
    fn add_report(&self, report: &Report) -> RepoResult<ReportId>;
    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>>;
    /// Rewrites date, title, body and mentioned cats.
    fn update_report(&self, report: &Report) -> RepoResult<()>;
    /// Reports of one colony, newest first.
    fn list_colony_reports(&self, colony_id: ColonyId) -> RepoResult<Vec<Report>>;
    fn delete_report(&self, id: ReportId) -> RepoResult<()>;
}

/// Repository interface for illness records.
pub trait IllnessRepository {
    /// Inserts `illness` (its `id` is ignored) and returns the new row id.
    fn add_illness(&self, illness: &Illness) -> RepoResult<IllnessId>;
    fn get_illness(&self, id: IllnessId) -> RepoResult<Option<Illness>>;
    /// Rewrites diagnosis, notes and the cure date.
    fn update_illness(&self, illness: &Illness) -> RepoResult<()>;
    /// Illnesses of one cat, most recent diagnosis first.
    fn list_cat_illnesses(&self, cat_id: CatId) -> RepoResult<Vec<Illness>>;
}

impl RecordRepository for SqliteStore<'_> {
    fn add_photo(&self, photo: &Photo) -> RepoResult<PhotoId> {
        photo.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id_text = photo.id.to_string();
        tx.execute(
            "INSERT INTO photos (
                id,
                colony_id,
                file_path,
                description,
                taken_on,
                is_ugly,
                author_id,
                author_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id_text.as_str(),
                photo.colony_id,
                photo.file_path.as_str(),
                photo.description.as_str(),
                date_to_db(photo.taken_on),
                bool_to_int(photo.is_ugly),
                photo.author.user_id,
                photo.author.name.as_str(),
            ],
        )?;
        insert_links(&tx, "photo_cats", "photo_id", &id_text, &photo.cat_ids)?;
        tx.commit()?;
        Ok(photo.id)
    }

    fn get_photo(&self, id: PhotoId) -> RepoResult<Option<Photo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PHOTO_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id.to_string()], |row| Ok(parse_photo_row(self.conn, row)))
            .optional()?;
        row.transpose()
    }

    fn list_colony_photos(&self, colony_id: ColonyId) -> RepoResult<Vec<Photo>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PHOTO_SELECT_SQL}
             WHERE colony_id = ?1
             ORDER BY taken_on DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([colony_id])?;
        let mut photos = Vec::new();
        while let Some(row) = rows.next()? {
            photos.push(parse_photo_row(self.conn, row)?);
        }
        Ok(photos)
    }

    fn set_photo_cats(&self, id: PhotoId, cat_ids: &[CatId]) -> RepoResult<()> {
        let id_text = id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM photos WHERE id = ?1);",
            [id_text.as_str()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::not_found("photo", id));
        }
        tx.execute(
            "DELETE FROM photo_cats WHERE photo_id = ?1;",
            [id_text.as_str()],
        )?;
        insert_links(&tx, "photo_cats", "photo_id", &id_text, cat_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_photo(&self, id: PhotoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM photos WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("photo", id));
        }
        Ok(())
    }

    fn add_report(&self, report: &Report) -> RepoResult<ReportId> {
        report.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO reports (colony_id, report_date, title, body, author_id, author_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                report.colony_id,
                date_to_db(report.date),
                report.title.as_str(),
                report.body.as_deref(),
                report.author.user_id,
                report.author.name.as_str(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        insert_links(&tx, "report_cats", "report_id", &id, &report.cat_ids)?;
        tx.commit()?;
        Ok(id)
    }

    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REPORT_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_report_row(self.conn, row)))
            .optional()?;
        row.transpose()
    }

    fn update_report(&self, report: &Report) -> RepoResult<()> {
        report.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE reports
             SET
                report_date = ?1,
                title = ?2,
                body = ?3
             WHERE id = ?4;",
            params![
                date_to_db(report.date),
                report.title.as_str(),
                report.body.as_deref(),
                report.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("report", report.id));
        }
        tx.execute("DELETE FROM report_cats WHERE report_id = ?1;", [report.id])?;
        insert_links(&tx, "report_cats", "report_id", &report.id, &report.cat_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn list_colony_reports(&self, colony_id: ColonyId) -> RepoResult<Vec<Report>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REPORT_SELECT_SQL}
             WHERE colony_id = ?1
             ORDER BY report_date DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([colony_id])?;
        let mut reports = Vec::new();
        while let Some(row) = rows.next()? {
            reports.push(parse_report_row(self.conn, row)?);
        }
        Ok(reports)
    }

    fn delete_report(&self, id: ReportId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reports WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("report", id));
        }
        Ok(())
    }
}

impl IllnessRepository for SqliteStore<'_> {
    fn add_illness(&self, illness: &Illness) -> RepoResult<IllnessId> {
        illness.validate()?;

        self.conn.execute(
            "INSERT INTO illnesses (
                cat_id,
                diagnosis,
                diagnosed_on,
                cured_on,
                notes,
                author_id,
                author_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                illness.cat_id,
                illness.diagnosis.as_str(),
                date_to_db(illness.diagnosed_on),
                illness.cured_on.map(date_to_db),
                illness.notes.as_str(),
                illness.author.user_id,
                illness.author.name.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_illness(&self, id: IllnessId) -> RepoResult<Option<Illness>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ILLNESS_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_illness_row(row)))
            .optional()?;
        row.transpose()
    }

    fn update_illness(&self, illness: &Illness) -> RepoResult<()> {
        illness.validate()?;

        let changed = self.conn.execute(
            "UPDATE illnesses
             SET
                diagnosis = ?1,
                cured_on = ?2,
                notes = ?3
             WHERE id = ?4;",
            params![
                illness.diagnosis.as_str(),
                illness.cured_on.map(date_to_db),
                illness.notes.as_str(),
                illness.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("illness", illness.id));
        }
        Ok(())
    }

    fn list_cat_illnesses(&self, cat_id: CatId) -> RepoResult<Vec<Illness>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ILLNESS_SELECT_SQL}
             WHERE cat_id = ?1
             ORDER BY diagnosed_on DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([cat_id])?;
        let mut illnesses = Vec::new();
        while let Some(row) = rows.next()? {
            illnesses.push(parse_illness_row(row)?);
        }
        Ok(illnesses)
    }
}

fn insert_links(
    tx: &Transaction<'_>,
    table: &'static str,
    owner_column: &'static str,
    owner: &dyn rusqlite::ToSql,
    cat_ids: &[CatId],
) -> RepoResult<()> {
    let unique: BTreeSet<CatId> = cat_ids.iter().copied().collect();
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} ({owner_column}, cat_id) VALUES (?1, ?2);"
    ))?;
    for cat_id in unique {
        stmt.execute(params![owner, cat_id])?;
    }
    Ok(())
}

fn load_links(
    conn: &Connection,
    table: &'static str,
    owner_column: &'static str,
    owner: &dyn rusqlite::ToSql,
) -> RepoResult<Vec<CatId>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT cat_id FROM {table} WHERE {owner_column} = ?1 ORDER BY cat_id ASC;"
    ))?;
    let ids = stmt
        .query_map([owner], |row| row.get::<_, CatId>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn parse_photo_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Photo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in photos.id")))?;
    let taken_on: String = row.get("taken_on")?;
    let photo = Photo {
        id,
        colony_id: row.get("colony_id")?,
        file_path: row.get("file_path")?,
        description: row.get("description")?,
        taken_on: parse_date(&taken_on, "photos.taken_on")?,
        is_ugly: int_to_bool(row.get("is_ugly")?, "photos.is_ugly")?,
        cat_ids: load_links(conn, "photo_cats", "photo_id", &id_text)?,
        author: parse_author(row)?,
    };
    photo.validate()?;
    Ok(photo)
}

fn parse_report_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Report> {
    let id: ReportId = row.get("id")?;
    let date: String = row.get("report_date")?;
    let report = Report {
        id,
        colony_id: row.get("colony_id")?,
        date: parse_date(&date, "reports.report_date")?,
        title: row.get("title")?,
        body: row.get("body")?,
        cat_ids: load_links(conn, "report_cats", "report_id", &id)?,
        author: parse_author(row)?,
    };
    report.validate()?;
    Ok(report)
}

fn parse_illness_row(row: &Row<'_>) -> RepoResult<Illness> {
    let diagnosed_on: String = row.get("diagnosed_on")?;
    let illness = Illness {
        id: row.get("id")?,
        cat_id: row.get("cat_id")?,
        diagnosis: row.get("diagnosis")?,
        diagnosed_on: parse_date(&diagnosed_on, "illnesses.diagnosed_on")?,
        cured_on: parse_opt_date(row.get("cured_on")?, "illnesses.cured_on")?,
        notes: row.get("notes")?,
        author: parse_author(row)?,
    };
    illness.validate()?;
    Ok(illness)
}
