//! Contribution-style activity grid.
//!
//! The grid has one row per weekday (Monday first) and one column per week.
//! Column 0 starts on the Monday on or before `today - 365 days`; the last
//! column is the week containing `today`. That is 53 columns, or 54 when the
//! window starts on a Sunday.

use crate::activity::ActivityEvent;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// Length of the trailing window, in days.
pub const WINDOW_DAYS: i64 = 365;
/// Per-day count at which a cell reaches the top intensity level.
pub const LEVEL_CEILING: u32 = 5;
/// Highest value returned by [`ActivityMap::level`].
pub const MAX_LEVEL: u8 = 4;

const DAYS_PER_WEEK: usize = 7;

/// Label language for month ticks and weekday rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    English,
    #[default]
    Spanish,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::English),
            "es" | "spanish" | "espanol" => Some(Self::Spanish),
            _ => None,
        }
    }

    fn months(self) -> [&'static str; 12] {
        match self {
            Self::English => [
                "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
            ],
            Self::Spanish => [
                "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
            ],
        }
    }

    /// Row labels; only every other weekday is named.
    pub fn weekday_labels(self) -> [&'static str; DAYS_PER_WEEK] {
        match self {
            Self::English => ["mon", "", "wed", "", "fri", "", "sun"],
            Self::Spanish => ["lun", "", "mie", "", "vie", "", "dom"],
        }
    }

    /// Short month name for a 1-based month number.
    pub fn month(self, month: u32) -> &'static str {
        let index = month.clamp(1, 12) as usize - 1;
        self.months()[index]
    }
}

/// Event counts per day over a trailing year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityMap {
    today: NaiveDate,
    base: NaiveDate,
    weeks: usize,
    /// `data[weekday][week]`, weekday 0 is Monday.
    data: Vec<Vec<u32>>,
    out_of_range: u32,
}

impl ActivityMap {
    /// Empty grid for the year ending at `today`.
    pub fn new(today: NaiveDate) -> Self {
        let base = window_base(today);
        let weeks = ((today - base).num_days() as usize) / DAYS_PER_WEEK + 1;
        Self {
            today,
            base,
            weeks,
            data: vec![vec![0; weeks]; DAYS_PER_WEEK],
            out_of_range: 0,
        }
    }

    /// Builds a grid and loads every event date.
    pub fn from_events(today: NaiveDate, events: &[ActivityEvent]) -> Self {
        let mut map = Self::new(today);
        map.load_dates(events.iter().map(|event| event.date));
        map
    }

    pub fn load_dates(&mut self, dates: impl IntoIterator<Item = NaiveDate>) {
        for date in dates {
            self.record(date);
        }
    }

    /// Counts one event. Returns `false` (and counts it as out of range)
    /// when `date` falls outside `[base, today]`.
    pub fn record(&mut self, date: NaiveDate) -> bool {
        match self.cell(date) {
            Some((weekday, week)) => {
                self.data[weekday][week] += 1;
                true
            }
            None => {
                self.out_of_range += 1;
                false
            }
        }
    }

    /// Clears counts, keeping the window.
    pub fn reset(&mut self) {
        for row in &mut self.data {
            row.iter_mut().for_each(|cell| *cell = 0);
        }
        self.out_of_range = 0;
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Monday of column 0.
    pub fn base(&self) -> NaiveDate {
        self.base
    }

    pub fn weeks(&self) -> usize {
        self.weeks
    }

    pub fn data(&self) -> &[Vec<u32>] {
        &self.data
    }

    pub fn count(&self, date: NaiveDate) -> u32 {
        self.cell(date)
            .map_or(0, |(weekday, week)| self.data[weekday][week])
    }

    pub fn total(&self) -> u32 {
        self.data.iter().flatten().sum()
    }

    pub fn max_count(&self) -> u32 {
        self.data.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn out_of_range(&self) -> u32 {
        self.out_of_range
    }

    /// Heat level of a cell: 0 for no events, else 1..=4 scaled against
    /// [`LEVEL_CEILING`] events per day.
    pub fn level(count: u32) -> u8 {
        if count == 0 {
            return 0;
        }
        let capped = count.min(LEVEL_CEILING);
        let scaled = (capped * u32::from(MAX_LEVEL) + LEVEL_CEILING - 1) / LEVEL_CEILING;
        scaled.clamp(1, u32::from(MAX_LEVEL)) as u8
    }

    /// One label per week column: the month whose first day falls in that
    /// column, or an empty string.
    pub fn month_ticks(&self, locale: Locale) -> Vec<&'static str> {
        (0..self.weeks)
            .map(|week| {
                (0..DAYS_PER_WEEK)
                    .map(|weekday| self.date_at(weekday, week))
                    .find(|date| date.day() == 1)
                    .map_or("", |date| locale.month(date.month()))
            })
            .collect()
    }

    /// Calendar date of a cell.
    pub fn date_at(&self, weekday: usize, week: usize) -> NaiveDate {
        self.base + Duration::days((week * DAYS_PER_WEEK + weekday) as i64)
    }

    /// Serializable snapshot for renderers.
    pub fn to_grid(&self, locale: Locale) -> ActivityGrid {
        ActivityGrid {
            reference_date: self.today,
            base_date: self.base,
            weeks: self.weeks,
            data: self.data.clone(),
            month_ticks: self
                .month_ticks(locale)
                .into_iter()
                .map(str::to_string)
                .collect(),
            weekday_labels: locale
                .weekday_labels()
                .into_iter()
                .map(str::to_string)
                .collect(),
            total: self.total(),
            max_count: self.max_count(),
            out_of_range: self.out_of_range,
        }
    }

    fn cell(&self, date: NaiveDate) -> Option<(usize, usize)> {
        if date < self.base || date > self.today {
            return None;
        }
        let offset = (date - self.base).num_days() as usize;
        let weekday = date.weekday().num_days_from_monday() as usize;
        Some((weekday, offset / DAYS_PER_WEEK))
    }
}

/// Renderer-facing view of an [`ActivityMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityGrid {
    pub reference_date: NaiveDate,
    pub base_date: NaiveDate,
    pub weeks: usize,
    pub data: Vec<Vec<u32>>,
    pub month_ticks: Vec<String>,
    pub weekday_labels: Vec<String>,
    pub total: u32,
    pub max_count: u32,
    pub out_of_range: u32,
}

fn window_base(today: NaiveDate) -> NaiveDate {
    let year_ago = today - Duration::days(WINDOW_DAYS);
    year_ago - Duration::days(i64::from(year_ago.weekday().num_days_from_monday()))
}
