//! Capture and vaccination persistence.
//!
//! # Invariants
//! - Captures are opened and closed only through life-cycle transitions;
//!   this repository edits the remaining fields.
//! - A vaccination takes its date and cat from its capture.

use crate::db::date_to_db;
use crate::model::cat::CatId;
use crate::model::records::{Capture, CaptureId, Vaccination, VaccinationId};
use crate::repo::{
    bool_to_int, int_to_bool, parse_author, parse_date, parse_opt_date, RepoError, RepoResult,
    SqliteStore,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const CAPTURE_SELECT_SQL: &str = "SELECT
    id,
    cat_id,
    captured_on,
    released_on,
    weight_kg,
    sterilized,
    notes,
    author_id,
    author_name
FROM captures";

const VACCINATION_SELECT_SQL: &str = "SELECT
    v.id,
    v.capture_id,
    c.cat_id,
    v.kind,
    v.effect_days,
    c.captured_on,
    v.author_id,
    v.author_name
FROM vaccinations v
INNER JOIN captures c ON c.id = v.capture_id";

/// Repository interface for capture records and their vaccinations.
pub trait CaptureRepository {
    fn get_capture(&self, id: CaptureId) -> RepoResult<Option<Capture>>;
    /// Captures of one cat, newest first.
    fn list_cat_captures(&self, cat_id: CatId) -> RepoResult<Vec<Capture>>;
    /// Most recent capture without a release date.
    fn last_open_capture(&self, cat_id: CatId) -> RepoResult<Option<Capture>>;
    /// Weight from the most recent capture that recorded one.
    fn latest_weight(&self, cat_id: CatId) -> RepoResult<Option<f64>>;
    /// Rewrites weight, notes and the sterilized flag. A sterilizing capture
    /// also stamps the cat's `sterilized_on` with the capture date when unset.
    fn update_capture(&self, capture: &Capture) -> RepoResult<()>;
    /// Inserts `vaccination` (its `id`, `cat_id` and `date` are taken from
    /// the capture row) and returns the new row id.
    fn add_vaccination(&self, vaccination: &Vaccination) -> RepoResult<VaccinationId>;
    /// Vaccinations of one cat, newest first.
    fn list_cat_vaccinations(&self, cat_id: CatId) -> RepoResult<Vec<Vaccination>>;
}

impl CaptureRepository for SqliteStore<'_> {
    fn get_capture(&self, id: CaptureId) -> RepoResult<Option<Capture>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CAPTURE_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_capture_row(row)))
            .optional()?;
        row.transpose()
    }

    fn list_cat_captures(&self, cat_id: CatId) -> RepoResult<Vec<Capture>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAPTURE_SELECT_SQL}
             WHERE cat_id = ?1
             ORDER BY captured_on DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([cat_id])?;
        let mut captures = Vec::new();
        while let Some(row) = rows.next()? {
            captures.push(parse_capture_row(row)?);
        }
        Ok(captures)
    }

    fn last_open_capture(&self, cat_id: CatId) -> RepoResult<Option<Capture>> {
        load_open_capture(self.conn, cat_id)
    }

    fn latest_weight(&self, cat_id: CatId) -> RepoResult<Option<f64>> {
        let weight = self
            .conn
            .query_row(
                "SELECT weight_kg
                 FROM captures
                 WHERE cat_id = ?1
                   AND weight_kg IS NOT NULL
                 ORDER BY captured_on DESC, id DESC
                 LIMIT 1;",
                [cat_id],
                |row| row.get::<_, f64>(0),
            )
            .optional()?;
        Ok(weight)
    }

    fn update_capture(&self, capture: &Capture) -> RepoResult<()> {
        capture.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE captures
             SET
                weight_kg = ?1,
                sterilized = ?2,
                notes = ?3
             WHERE id = ?4;",
            params![
                capture.weight_kg,
                bool_to_int(capture.sterilized),
                capture.notes.as_str(),
                capture.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("capture", capture.id));
        }

        if capture.sterilized {
            tx.execute(
                "UPDATE cats
                 SET sterilized_on = ?1
                 WHERE id = ?2
                   AND sterilized_on IS NULL;",
                params![date_to_db(capture.captured_on), capture.cat_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn add_vaccination(&self, vaccination: &Vaccination) -> RepoResult<VaccinationId> {
        if self.get_capture(vaccination.capture_id)?.is_none() {
            return Err(RepoError::not_found("capture", vaccination.capture_id));
        }
        self.conn.execute(
            "INSERT INTO vaccinations (capture_id, kind, effect_days, author_id, author_name)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                vaccination.capture_id,
                vaccination.kind.as_str(),
                i64::from(vaccination.effect_days),
                vaccination.author.user_id,
                vaccination.author.name.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_cat_vaccinations(&self, cat_id: CatId) -> RepoResult<Vec<Vaccination>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VACCINATION_SELECT_SQL}
             WHERE c.cat_id = ?1
             ORDER BY c.captured_on DESC, v.id DESC;"
        ))?;
        let mut rows = stmt.query([cat_id])?;
        let mut vaccinations = Vec::new();
        while let Some(row) = rows.next()? {
            vaccinations.push(parse_vaccination_row(row)?);
        }
        Ok(vaccinations)
    }
}

/// Latest open capture of `cat_id`; usable inside a transaction.
pub(crate) fn load_open_capture(conn: &Connection, cat_id: CatId) -> RepoResult<Option<Capture>> {
    let mut stmt = conn.prepare(&format!(
        "{CAPTURE_SELECT_SQL}
         WHERE cat_id = ?1
           AND released_on IS NULL
         ORDER BY captured_on DESC, id DESC
         LIMIT 1;"
    ))?;
    let row = stmt
        .query_row([cat_id], |row| Ok(parse_capture_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_capture_row(row: &Row<'_>) -> RepoResult<Capture> {
    let captured_on: String = row.get("captured_on")?;
    let capture = Capture {
        id: row.get("id")?,
        cat_id: row.get("cat_id")?,
        captured_on: parse_date(&captured_on, "captures.captured_on")?,
        released_on: parse_opt_date(row.get("released_on")?, "captures.released_on")?,
        weight_kg: row.get("weight_kg")?,
        sterilized: int_to_bool(row.get("sterilized")?, "captures.sterilized")?,
        notes: row.get("notes")?,
        author: parse_author(row)?,
    };
    capture.validate()?;
    Ok(capture)
}

fn parse_vaccination_row(row: &Row<'_>) -> RepoResult<Vaccination> {
    let effect: i64 = row.get("effect_days")?;
    let effect_days = u32::try_from(effect).map_err(|_| {
        RepoError::InvalidData(format!("invalid effect `{effect}` in vaccinations.effect_days"))
    })?;
    let date: String = row.get("captured_on")?;
    Ok(Vaccination {
        id: row.get("id")?,
        capture_id: row.get("capture_id")?,
        cat_id: row.get("cat_id")?,
        kind: row.get("kind")?,
        effect_days,
        date: parse_date(&date, "captures.captured_on")?,
        author: parse_author(row)?,
    })
}
