//! Cat repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `cats`.
//! - Persist life-cycle transitions together with their capture side
//!   effects in one transaction.
//!
//! # Invariants
//! - State writes are guarded by the expected previous state, so a
//!   concurrent change surfaces as `Conflict` instead of being overwritten.
//! - At most one open capture exists per cat.

use crate::db::date_to_db;
use crate::model::cat::{Cat, CatId, Sex};
use crate::model::colony::ColonyId;
use crate::model::lifecycle::CatState;
use crate::model::records::{Capture, CaptureId};
use crate::model::user::Author;
use crate::repo::capture_repo::load_open_capture;
use crate::repo::{
    bool_to_int, int_to_bool, map_unique, parse_date, parse_opt_date, RepoError, RepoResult,
    SqliteStore,
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

pub(crate) const CAT_SELECT_SQL: &str = "SELECT
    cats.id,
    cats.slug,
    cats.name,
    cats.color,
    cats.description,
    cats.colony_id,
    cats.portrait_photo_id,
    cats.sex,
    cats.sterilized_on,
    cats.is_ugly,
    cats.is_neighbour,
    cats.neighbour_name,
    cats.registered_on,
    cats.is_dead,
    cats.died_on,
    cats.state
FROM cats";

/// Capture bookkeeping that accompanies a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEffect {
    None,
    /// Insert a capture dated `on`. Fails when one is already open.
    Open { on: NaiveDate, author: Author },
    /// Close the most recent open capture with `on`. Fails when none is open.
    Close { on: NaiveDate },
}

/// Sweep move of one cat between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub cat_id: CatId,
    pub from: CatState,
    pub to: CatState,
}

/// Repository interface for cat CRUD and life-cycle persistence.
pub trait CatRepository {
    /// Inserts `cat` (its `id` is ignored) and returns the new row id.
    fn create_cat(&self, cat: &Cat) -> RepoResult<CatId>;
    fn get_cat(&self, id: CatId) -> RepoResult<Option<Cat>>;
    fn get_cat_by_slug(&self, slug: &str) -> RepoResult<Option<Cat>>;
    /// Cats of one colony ordered by name.
    fn list_colony_cats(&self, colony_id: ColonyId, include_neighbours: bool)
        -> RepoResult<Vec<Cat>>;
    /// Cats in any of `states`, across colonies, ordered by id.
    fn list_cats_in_states(&self, states: &[CatState]) -> RepoResult<Vec<Cat>>;
    /// Rewrites editable fields. State fields are only written by
    /// [`CatRepository::commit_transition`].
    fn update_cat(&self, cat: &Cat) -> RepoResult<()>;
    fn delete_cat(&self, id: CatId) -> RepoResult<()>;
    /// Persists `cat.state`, `is_dead` and `died_on` if the stored state is
    /// still `expected`, and applies `capture` in the same transaction.
    /// Returns the id of the capture opened or closed.
    fn commit_transition(
        &self,
        cat: &Cat,
        expected: CatState,
        capture: &CaptureEffect,
    ) -> RepoResult<Option<CaptureId>>;
    /// Applies every change in one transaction; all or nothing.
    fn apply_state_changes(&self, changes: &[StateChange]) -> RepoResult<()>;
}

impl CatRepository for SqliteStore<'_> {
    fn create_cat(&self, cat: &Cat) -> RepoResult<CatId> {
        cat.validate()?;

        self.conn
            .execute(
                "INSERT INTO cats (
                    slug,
                    name,
                    color,
                    description,
                    colony_id,
                    portrait_photo_id,
                    sex,
                    sterilized_on,
                    is_ugly,
                    is_neighbour,
                    neighbour_name,
                    registered_on,
                    is_dead,
                    died_on,
                    state
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
                params![
                    cat.slug.as_str(),
                    cat.name.as_str(),
                    cat.color.as_str(),
                    cat.description.as_str(),
                    cat.colony_id,
                    cat.portrait_photo_id.map(|id| id.to_string()),
                    cat.sex.as_str(),
                    cat.sterilized_on.map(date_to_db),
                    bool_to_int(cat.is_ugly),
                    bool_to_int(cat.is_neighbour),
                    cat.neighbour_name.as_str(),
                    date_to_db(cat.registered_on),
                    bool_to_int(cat.is_dead),
                    cat.died_on.map(date_to_db),
                    cat.state.as_str(),
                ],
            )
            .map_err(|err| map_unique(err, "cat", &cat.slug))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_cat(&self, id: CatId) -> RepoResult<Option<Cat>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CAT_SELECT_SQL} WHERE cats.id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_cat_row(row)))
            .optional()?;
        row.transpose()
    }

    fn get_cat_by_slug(&self, slug: &str) -> RepoResult<Option<Cat>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CAT_SELECT_SQL} WHERE cats.slug = ?1;"))?;
        let row = stmt
            .query_row([slug], |row| Ok(parse_cat_row(row)))
            .optional()?;
        row.transpose()
    }

    fn list_colony_cats(
        &self,
        colony_id: ColonyId,
        include_neighbours: bool,
    ) -> RepoResult<Vec<Cat>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAT_SELECT_SQL}
             WHERE cats.colony_id = ?1
               AND (?2 = 1 OR cats.is_neighbour = 0)
             ORDER BY cats.name ASC;"
        ))?;
        let mut rows = stmt.query(params![colony_id, bool_to_int(include_neighbours)])?;
        let mut cats = Vec::new();
        while let Some(row) = rows.next()? {
            cats.push(parse_cat_row(row)?);
        }
        Ok(cats)
    }

    fn list_cats_in_states(&self, states: &[CatState]) -> RepoResult<Vec<Cat>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; states.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "{CAT_SELECT_SQL} WHERE cats.state IN ({placeholders}) ORDER BY cats.id ASC;"
        ))?;
        let codes: Vec<&str> = states.iter().map(|state| state.as_str()).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(codes))?;
        let mut cats = Vec::new();
        while let Some(row) = rows.next()? {
            cats.push(parse_cat_row(row)?);
        }
        Ok(cats)
    }

    fn update_cat(&self, cat: &Cat) -> RepoResult<()> {
        cat.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE cats
                 SET
                    slug = ?1,
                    name = ?2,
                    color = ?3,
                    description = ?4,
                    portrait_photo_id = ?5,
                    sex = ?6,
                    sterilized_on = ?7,
                    is_ugly = ?8,
                    is_neighbour = ?9,
                    neighbour_name = ?10
                 WHERE id = ?11;",
                params![
                    cat.slug.as_str(),
                    cat.name.as_str(),
                    cat.color.as_str(),
                    cat.description.as_str(),
                    cat.portrait_photo_id.map(|id| id.to_string()),
                    cat.sex.as_str(),
                    cat.sterilized_on.map(date_to_db),
                    bool_to_int(cat.is_ugly),
                    bool_to_int(cat.is_neighbour),
                    cat.neighbour_name.as_str(),
                    cat.id,
                ],
            )
            .map_err(|err| map_unique(err, "cat", &cat.slug))?;

        if changed == 0 {
            return Err(RepoError::not_found("cat", cat.id));
        }
        Ok(())
    }

    fn delete_cat(&self, id: CatId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM cats WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("cat", id));
        }
        Ok(())
    }

    fn commit_transition(
        &self,
        cat: &Cat,
        expected: CatState,
        capture: &CaptureEffect,
    ) -> RepoResult<Option<CaptureId>> {
        cat.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE cats
             SET
                state = ?1,
                is_dead = ?2,
                died_on = ?3
             WHERE id = ?4
               AND state = ?5;",
            params![
                cat.state.as_str(),
                bool_to_int(cat.is_dead),
                cat.died_on.map(date_to_db),
                cat.id,
                expected.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::conflict("cat state", &cat.slug));
        }

        let capture_id = match capture {
            CaptureEffect::None => None,
            CaptureEffect::Open { on, author } => Some(open_capture_in_tx(&tx, cat.id, *on, author)?),
            CaptureEffect::Close { on } => Some(close_capture_in_tx(&tx, cat.id, *on)?),
        };

        tx.commit()?;
        Ok(capture_id)
    }

    fn apply_state_changes(&self, changes: &[StateChange]) -> RepoResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for change in changes {
            if change.to == CatState::Dead || change.from == CatState::Dead {
                return Err(RepoError::InvalidData(format!(
                    "state change of cat {} touches the dead state",
                    change.cat_id
                )));
            }
            let changed = tx.execute(
                "UPDATE cats SET state = ?1 WHERE id = ?2 AND state = ?3;",
                params![change.to.as_str(), change.cat_id, change.from.as_str()],
            )?;
            if changed == 0 {
                return Err(RepoError::conflict("cat state", change.cat_id));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn open_capture_in_tx(
    tx: &Transaction<'_>,
    cat_id: CatId,
    on: NaiveDate,
    author: &Author,
) -> RepoResult<CaptureId> {
    if load_open_capture(tx, cat_id)?.is_some() {
        return Err(RepoError::conflict("open capture", cat_id));
    }
    tx.execute(
        "INSERT INTO captures (cat_id, captured_on, author_id, author_name)
         VALUES (?1, ?2, ?3, ?4);",
        params![cat_id, date_to_db(on), author.user_id, author.name.as_str()],
    )?;
    Ok(tx.last_insert_rowid())
}

fn close_capture_in_tx(tx: &Transaction<'_>, cat_id: CatId, on: NaiveDate) -> RepoResult<CaptureId> {
    let open: Capture =
        load_open_capture(tx, cat_id)?.ok_or_else(|| RepoError::not_found("open capture", cat_id))?;
    let closed = Capture {
        released_on: Some(on),
        ..open
    };
    closed.validate()?;
    tx.execute(
        "UPDATE captures SET released_on = ?1 WHERE id = ?2;",
        params![date_to_db(on), closed.id],
    )?;
    Ok(closed.id)
}

pub(crate) fn parse_cat_row(row: &Row<'_>) -> RepoResult<Cat> {
    let sex_text: String = row.get("sex")?;
    let sex = Sex::parse(&sex_text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid sex `{sex_text}` in cats.sex")))?;

    let state_text: String = row.get("state")?;
    let state = CatState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid state `{state_text}` in cats.state"))
    })?;

    let portrait_photo_id = match row.get::<_, Option<String>>("portrait_photo_id")? {
        Some(text) => Some(Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid `{text}` in cats.portrait_photo_id"))
        })?),
        None => None,
    };

    let registered_on: String = row.get("registered_on")?;
    let cat = Cat {
        id: row.get("id")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        color: row.get("color")?,
        description: row.get("description")?,
        colony_id: row.get("colony_id")?,
        portrait_photo_id,
        sex,
        sterilized_on: parse_opt_date(row.get("sterilized_on")?, "cats.sterilized_on")?,
        is_ugly: int_to_bool(row.get("is_ugly")?, "cats.is_ugly")?,
        is_neighbour: int_to_bool(row.get("is_neighbour")?, "cats.is_neighbour")?,
        neighbour_name: row.get("neighbour_name")?,
        registered_on: parse_date(&registered_on, "cats.registered_on")?,
        is_dead: int_to_bool(row.get("is_dead")?, "cats.is_dead")?,
        died_on: parse_opt_date(row.get("died_on")?, "cats.died_on")?,
        state,
    };
    cat.validate()?;
    Ok(cat)
}
