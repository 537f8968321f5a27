//! Colony repository contract and SQLite implementation.
//!
//! # Invariants
//! - Slugs are unique; a duplicate surfaces as `RepoError::Conflict`.
//! - Updates never touch the slug.
//! - Deleting a colony cascades to its cats and every dated record.

use crate::model::colony::{Colony, ColonyId};
use crate::repo::{map_unique, RepoError, RepoResult, SqliteStore};
use rusqlite::{params, OptionalExtension, Row};

const COLONY_SELECT_SQL: &str = "SELECT
    id,
    slug,
    name,
    description,
    active_period_days
FROM colonies";

/// Repository interface for colony CRUD operations.
pub trait ColonyRepository {
    /// Inserts `colony` (its `id` is ignored) and returns the new row id.
    fn create_colony(&self, colony: &Colony) -> RepoResult<ColonyId>;
    fn get_colony(&self, id: ColonyId) -> RepoResult<Option<Colony>>;
    fn get_colony_by_slug(&self, slug: &str) -> RepoResult<Option<Colony>>;
    /// All colonies ordered by name.
    fn list_colonies(&self) -> RepoResult<Vec<Colony>>;
    fn update_colony(&self, colony: &Colony) -> RepoResult<()>;
    fn delete_colony(&self, id: ColonyId) -> RepoResult<()>;
}

impl ColonyRepository for SqliteStore<'_> {
    fn create_colony(&self, colony: &Colony) -> RepoResult<ColonyId> {
        colony.validate()?;

        self.conn
            .execute(
                "INSERT INTO colonies (slug, name, description, active_period_days)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    colony.slug.as_str(),
                    colony.name.as_str(),
                    colony.description.as_str(),
                    i64::from(colony.active_period_days),
                ],
            )
            .map_err(|err| map_unique(err, "colony", &colony.slug))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_colony(&self, id: ColonyId) -> RepoResult<Option<Colony>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COLONY_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_colony_row(row)))
            .optional()?;
        row.transpose()
    }

    fn get_colony_by_slug(&self, slug: &str) -> RepoResult<Option<Colony>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COLONY_SELECT_SQL} WHERE slug = ?1;"))?;
        let row = stmt
            .query_row([slug], |row| Ok(parse_colony_row(row)))
            .optional()?;
        row.transpose()
    }

    fn list_colonies(&self) -> RepoResult<Vec<Colony>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COLONY_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut colonies = Vec::new();
        while let Some(row) = rows.next()? {
            colonies.push(parse_colony_row(row)?);
        }
        Ok(colonies)
    }

    fn update_colony(&self, colony: &Colony) -> RepoResult<()> {
        colony.validate()?;

        let changed = self.conn.execute(
            "UPDATE colonies
             SET
                name = ?1,
                description = ?2,
                active_period_days = ?3
             WHERE id = ?4;",
            params![
                colony.name.as_str(),
                colony.description.as_str(),
                i64::from(colony.active_period_days),
                colony.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("colony", colony.id));
        }
        Ok(())
    }

    fn delete_colony(&self, id: ColonyId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM colonies WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("colony", id));
        }
        Ok(())
    }
}

fn parse_colony_row(row: &Row<'_>) -> RepoResult<Colony> {
    let period: i64 = row.get("active_period_days")?;
    let active_period_days = u32::try_from(period).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid active period `{period}` in colonies.active_period_days"
        ))
    })?;

    let colony = Colony {
        id: row.get("id")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        description: row.get("description")?,
        active_period_days,
    };
    colony.validate()?;
    Ok(colony)
}
