//! Sighting and feeding-duty persistence.
//!
//! # Invariants
//! - Toggles read and write inside one immediate transaction, so two
//!   toggles on the same day never interleave.
//! - The "first" feeding assignment of a day is the one with the lowest id.

use crate::db::date_to_db;
use crate::model::cat::CatId;
use crate::model::colony::ColonyId;
use crate::model::records::{FeedingAssignment, Sighting};
use crate::model::user::UserId;
use crate::repo::{parse_author, parse_date, RepoResult, SqliteStore};
use chrono::NaiveDate;
use rusqlite::{params, Row, Transaction, TransactionBehavior};
use serde::Serialize;

const SIGHTING_SELECT_SQL: &str = "SELECT
    id,
    sighted_on,
    cat_id,
    colony_id,
    author_id,
    author_name
FROM sightings";

const FEEDING_SELECT_SQL: &str = "SELECT
    f.id,
    f.feeding_date,
    f.user_id,
    u.username,
    f.colony_id
FROM feeding_assignments f
INNER JOIN users u ON u.id = f.user_id";

/// Result of toggling feeding duty for one colony and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedingToggle {
    Assigned,
    Unassigned,
    Reassigned { previous_user_id: UserId },
}

/// Repository interface for presence records.
pub trait PresenceRepository {
    /// Deletes every sighting of `sighting.cat_id` on `sighting.date` when
    /// any exists, otherwise inserts `sighting`. Returns whether the cat is
    /// sighted on that date afterwards.
    fn toggle_sighting(&self, sighting: &Sighting) -> RepoResult<bool>;
    fn cat_sightings_on(&self, cat_id: CatId, date: NaiveDate) -> RepoResult<Vec<Sighting>>;
    fn colony_sightings_on(&self, colony_id: ColonyId, date: NaiveDate)
        -> RepoResult<Vec<Sighting>>;

    fn toggle_feeding(
        &self,
        colony_id: ColonyId,
        date: NaiveDate,
        user_id: UserId,
    ) -> RepoResult<FeedingToggle>;
    /// Assignments of one day, first assignment first.
    fn feeding_on(&self, colony_id: ColonyId, date: NaiveDate) -> RepoResult<Vec<FeedingAssignment>>;
    /// Assignments in `[from, to]` ordered by date.
    fn feeding_schedule(
        &self,
        colony_id: ColonyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<FeedingAssignment>>;
}

impl PresenceRepository for SqliteStore<'_> {
    fn toggle_sighting(&self, sighting: &Sighting) -> RepoResult<bool> {
        let date = date_to_db(sighting.date);
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removed = tx.execute(
            "DELETE FROM sightings WHERE cat_id = ?1 AND sighted_on = ?2;",
            params![sighting.cat_id, date.as_str()],
        )?;
        let sighted = if removed > 0 {
            false
        } else {
            tx.execute(
                "INSERT INTO sightings (sighted_on, cat_id, colony_id, author_id, author_name)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    date.as_str(),
                    sighting.cat_id,
                    sighting.colony_id,
                    sighting.author.user_id,
                    sighting.author.name.as_str(),
                ],
            )?;
            true
        };
        tx.commit()?;
        Ok(sighted)
    }

    fn cat_sightings_on(&self, cat_id: CatId, date: NaiveDate) -> RepoResult<Vec<Sighting>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SIGHTING_SELECT_SQL}
             WHERE cat_id = ?1
               AND sighted_on = ?2
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query(params![cat_id, date_to_db(date)])?;
        let mut sightings = Vec::new();
        while let Some(row) = rows.next()? {
            sightings.push(parse_sighting_row(row)?);
        }
        Ok(sightings)
    }

    fn colony_sightings_on(
        &self,
        colony_id: ColonyId,
        date: NaiveDate,
    ) -> RepoResult<Vec<Sighting>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SIGHTING_SELECT_SQL}
             WHERE colony_id = ?1
               AND sighted_on = ?2
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query(params![colony_id, date_to_db(date)])?;
        let mut sightings = Vec::new();
        while let Some(row) = rows.next()? {
            sightings.push(parse_sighting_row(row)?);
        }
        Ok(sightings)
    }

    fn toggle_feeding(
        &self,
        colony_id: ColonyId,
        date: NaiveDate,
        user_id: UserId,
    ) -> RepoResult<FeedingToggle> {
        let date = date_to_db(date);
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let first: Option<(i64, UserId)> = {
            let mut stmt = tx.prepare(
                "SELECT id, user_id
                 FROM feeding_assignments
                 WHERE colony_id = ?1
                   AND feeding_date = ?2
                 ORDER BY id ASC
                 LIMIT 1;",
            )?;
            let mut rows = stmt.query(params![colony_id, date.as_str()])?;
            let first = match rows.next()? {
                Some(row) => Some((row.get(0)?, row.get(1)?)),
                None => None,
            };
            first
        };

        let outcome = match first {
            None => {
                tx.execute(
                    "INSERT INTO feeding_assignments (feeding_date, user_id, colony_id)
                     VALUES (?1, ?2, ?3);",
                    params![date.as_str(), user_id, colony_id],
                )?;
                FeedingToggle::Assigned
            }
            Some((_, assigned)) if assigned == user_id => {
                tx.execute(
                    "DELETE FROM feeding_assignments WHERE colony_id = ?1 AND feeding_date = ?2;",
                    params![colony_id, date.as_str()],
                )?;
                FeedingToggle::Unassigned
            }
            Some((id, previous_user_id)) => {
                tx.execute(
                    "UPDATE feeding_assignments SET user_id = ?1 WHERE id = ?2;",
                    params![user_id, id],
                )?;
                FeedingToggle::Reassigned { previous_user_id }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn feeding_on(&self, colony_id: ColonyId, date: NaiveDate) -> RepoResult<Vec<FeedingAssignment>> {
        self.feeding_schedule(colony_id, date, date)
    }

    fn feeding_schedule(
        &self,
        colony_id: ColonyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<FeedingAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FEEDING_SELECT_SQL}
             WHERE f.colony_id = ?1
               AND f.feeding_date >= ?2
               AND f.feeding_date <= ?3
             ORDER BY f.feeding_date ASC, f.id ASC;"
        ))?;
        let mut rows = stmt.query(params![colony_id, date_to_db(from), date_to_db(to)])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_feeding_row(row)?);
        }
        Ok(assignments)
    }
}

fn parse_sighting_row(row: &Row<'_>) -> RepoResult<Sighting> {
    let date: String = row.get("sighted_on")?;
    Ok(Sighting {
        id: row.get("id")?,
        date: parse_date(&date, "sightings.sighted_on")?,
        cat_id: row.get("cat_id")?,
        colony_id: row.get("colony_id")?,
        author: parse_author(row)?,
    })
}

fn parse_feeding_row(row: &Row<'_>) -> RepoResult<FeedingAssignment> {
    let date: String = row.get("feeding_date")?;
    Ok(FeedingAssignment {
        id: row.get("id")?,
        date: parse_date(&date, "feeding_assignments.feeding_date")?,
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        colony_id: row.get("colony_id")?,
    })
}
