//! Dated-event collection over every record table.
//!
//! # Responsibility
//! - Gather the events that show a cat (or a colony) is alive.
//! - Resolve which cats a colony's events in a window point at.
//!
//! # Invariants
//! - Cat event lists always contain the intake event, whatever the range.
//! - Events come back sorted by date, then kind, then record id.
//! - Vaccinations are dated by their capture.

use crate::activity::{ActivityEvent, DateRange, EventKind};
use crate::db::date_to_db;
use crate::model::cat::Cat;
use crate::model::colony::ColonyId;
use crate::repo::cat_repo::{parse_cat_row, CAT_SELECT_SQL};
use crate::repo::{parse_date, RepoError, RepoResult, SqliteStore};
use rusqlite::{params, Row};

const CAT_EVENTS_SQL: &str = "
    SELECT 'report' AS kind, r.report_date AS event_date, rc.cat_id AS cat_id,
           CAST(r.id AS TEXT) AS record_id
    FROM reports r
    INNER JOIN report_cats rc ON rc.report_id = r.id
    WHERE rc.cat_id = ?1
    UNION ALL
    SELECT 'photo', p.taken_on, pc.cat_id, p.id
    FROM photos p
    INNER JOIN photo_cats pc ON pc.photo_id = p.id
    WHERE pc.cat_id = ?1
    UNION ALL
    SELECT 'sighting', s.sighted_on, s.cat_id, CAST(s.id AS TEXT)
    FROM sightings s
    WHERE s.cat_id = ?1
    UNION ALL
    SELECT 'capture', c.captured_on, c.cat_id, CAST(c.id AS TEXT)
    FROM captures c
    WHERE c.cat_id = ?1
    UNION ALL
    SELECT 'vaccination', c.captured_on, c.cat_id, CAST(v.id AS TEXT)
    FROM vaccinations v
    INNER JOIN captures c ON c.id = v.capture_id
    WHERE c.cat_id = ?1
    UNION ALL
    SELECT 'illness', i.diagnosed_on, i.cat_id, CAST(i.id AS TEXT)
    FROM illnesses i
    WHERE i.cat_id = ?1";

const COLONY_EVENTS_SQL: &str = "
    SELECT 'report' AS kind, r.report_date AS event_date, NULL AS cat_id,
           CAST(r.id AS TEXT) AS record_id
    FROM reports r
    WHERE r.colony_id = ?1
    UNION ALL
    SELECT 'photo', p.taken_on, NULL, p.id
    FROM photos p
    WHERE p.colony_id = ?1
    UNION ALL
    SELECT 'sighting', s.sighted_on, s.cat_id, CAST(s.id AS TEXT)
    FROM sightings s
    WHERE s.colony_id = ?1
    UNION ALL
    SELECT 'intake', k.registered_on, k.id, CAST(k.id AS TEXT)
    FROM cats k
    WHERE k.colony_id = ?1";

/// Colony events expanded to one row per referenced cat.
const COLONY_CAT_REFS_SQL: &str = "
    SELECT rc.cat_id AS cat_id, r.report_date AS event_date
    FROM reports r
    INNER JOIN report_cats rc ON rc.report_id = r.id
    WHERE r.colony_id = ?1
    UNION ALL
    SELECT pc.cat_id, p.taken_on
    FROM photos p
    INNER JOIN photo_cats pc ON pc.photo_id = p.id
    WHERE p.colony_id = ?1
    UNION ALL
    SELECT s.cat_id, s.sighted_on
    FROM sightings s
    WHERE s.colony_id = ?1
    UNION ALL
    SELECT k.id, k.registered_on
    FROM cats k
    WHERE k.colony_id = ?1";

const RANGE_FILTER_SQL: &str = "(?2 IS NULL OR event_date >= ?2) AND (?3 IS NULL OR event_date <= ?3)";

/// Repository interface for activity queries.
pub trait ActivityRepository {
    /// Events of one cat within `range`, plus its intake.
    fn cat_events(&self, cat: &Cat, range: DateRange) -> RepoResult<Vec<ActivityEvent>>;
    /// Events recorded in one colony within `range`. Reports and photos
    /// carry no `cat_id`; sightings and intakes carry their cat.
    fn colony_events(&self, colony_id: ColonyId, range: DateRange)
        -> RepoResult<Vec<ActivityEvent>>;
    /// Non-dead cats of the colony referenced by a colony event in `range`,
    /// ordered by name.
    fn active_colony_cats(&self, colony_id: ColonyId, range: DateRange) -> RepoResult<Vec<Cat>>;
}

impl ActivityRepository for SqliteStore<'_> {
    fn cat_events(&self, cat: &Cat, range: DateRange) -> RepoResult<Vec<ActivityEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT kind, event_date, cat_id, record_id
             FROM ({CAT_EVENTS_SQL})
             WHERE {RANGE_FILTER_SQL};"
        ))?;
        let (min, max) = range_params(range);
        let mut rows = stmt.query(params![cat.id, min, max])?;
        let mut events = vec![ActivityEvent {
            kind: EventKind::Intake,
            date: cat.registered_on,
            cat_id: Some(cat.id),
            record_id: cat.id.to_string(),
        }];
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        sort_events(&mut events);
        Ok(events)
    }

    fn colony_events(
        &self,
        colony_id: ColonyId,
        range: DateRange,
    ) -> RepoResult<Vec<ActivityEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT kind, event_date, cat_id, record_id
             FROM ({COLONY_EVENTS_SQL})
             WHERE {RANGE_FILTER_SQL};"
        ))?;
        let (min, max) = range_params(range);
        let mut rows = stmt.query(params![colony_id, min, max])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        sort_events(&mut events);
        Ok(events)
    }

    fn active_colony_cats(&self, colony_id: ColonyId, range: DateRange) -> RepoResult<Vec<Cat>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAT_SELECT_SQL}
             WHERE cats.colony_id = ?1
               AND cats.is_dead = 0
               AND cats.id IN (
                    SELECT cat_id
                    FROM ({COLONY_CAT_REFS_SQL})
                    WHERE {RANGE_FILTER_SQL}
               )
             ORDER BY cats.name ASC;"
        ))?;
        let (min, max) = range_params(range);
        let mut rows = stmt.query(params![colony_id, min, max])?;
        let mut cats = Vec::new();
        while let Some(row) = rows.next()? {
            cats.push(parse_cat_row(row)?);
        }
        Ok(cats)
    }
}

fn range_params(range: DateRange) -> (Option<String>, Option<String>) {
    (range.min.map(date_to_db), range.max.map(date_to_db))
}

fn sort_events(events: &mut [ActivityEvent]) {
    events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.kind.cmp(&b.kind))
            .then_with(|| a.record_id.cmp(&b.record_id))
    });
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<ActivityEvent> {
    let kind_text: String = row.get("kind")?;
    let kind = EventKind::parse(&kind_text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid event kind `{kind_text}`")))?;
    let date: String = row.get("event_date")?;
    Ok(ActivityEvent {
        kind,
        date: parse_date(&date, "event_date")?,
        cat_id: row.get("cat_id")?,
        record_id: row.get("record_id")?,
    })
}
