//! Plain-text rendering of service results.

use chrono::{Duration, NaiveDate};
use gatinos_core::model::records::{Capture, Illness, Photo, Report, Vaccination};
use gatinos_core::repo::presence_repo::FeedingToggle;
use gatinos_core::{
    ActivityGrid, ActivityMap, Cat, CatProfile, Colony, SightingSheet, SweepReport, Transition,
    User,
};

const LABEL_WIDTH: usize = 4;
const LEVEL_GLYPHS: [char; 5] = ['.', '░', '▒', '▓', '█'];

pub fn lines<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items.iter().map(render).collect::<Vec<_>>().join("\n")
}

pub fn colony(colony: &Colony) -> String {
    format!(
        "{:<20} {}  active={}d",
        colony.slug, colony.name, colony.active_period_days
    )
}

pub fn cat(cat: &Cat) -> String {
    let neighbour = if cat.is_neighbour { " (neighbour)" } else { "" };
    format!(
        "{:<20} {:<10} {} {}{neighbour}",
        cat.slug,
        cat.state.as_str(),
        cat.sex.as_str(),
        cat.name
    )
}

pub fn profile(profile: &CatProfile) -> String {
    let cat = &profile.cat;
    let mut out = vec![
        format!("{} ({})", cat.name, cat.slug),
        format!("colony:        {}", profile.colony_slug),
        format!("state:         {} [{}]", cat.state, profile.state_color),
        format!("registered:    {}", cat.registered_on),
        format!("last activity: {}", profile.last_activity),
        format!("photo:         {}", profile.photo_url),
    ];
    if let Some(weight) = profile.weight_kg {
        out.push(format!("weight:        {weight:.2} kg"));
    }
    if let Some(sterilized_on) = cat.sterilized_on {
        out.push(format!("sterilized:    {sterilized_on}"));
    }
    if let Some(died_on) = cat.died_on {
        out.push(format!("died:          {died_on}"));
    }
    if let Some(open) = &profile.open_capture {
        out.push(format!("open capture:  #{} since {}", open.id, open.captured_on));
    }
    out.push(format!("captures:      {}", profile.captures.len()));
    for vaccination in &profile.vaccinations {
        out.push(format!("  vaccine  {}", self::vaccination(vaccination)));
    }
    for illness in &profile.illnesses {
        out.push(format!("  illness  {}", self::illness(illness)));
    }
    out.join("\n")
}

pub fn transition(transition: &Transition) -> String {
    let mut line = format!(
        "{}: {} -> {} ({})",
        transition.cat.slug, transition.from, transition.to, transition.action
    );
    if let Some(capture_id) = transition.capture_id {
        line.push_str(&format!(" capture #{capture_id}"));
    }
    line
}

pub fn sweep(report: &SweepReport) -> String {
    format!(
        "examined {} cat(s)\nmissing:   {}\nforgotten: {}",
        report.examined,
        join_or_dash(&report.missing),
        join_or_dash(&report.forgotten)
    )
}

pub fn sighting_sheet(sheet: &SightingSheet) -> String {
    let names = |cats: &[Cat]| {
        let slugs: Vec<String> = cats.iter().map(|cat| cat.slug.clone()).collect();
        join_or_dash(&slugs)
    };
    format!(
        "{}\nseen:     {}\nnot seen: {}",
        sheet.date,
        names(&sheet.seen),
        names(&sheet.not_seen)
    )
}

pub fn feeding_toggle(outcome: &FeedingToggle, date: NaiveDate) -> String {
    match outcome {
        FeedingToggle::Assigned => format!("on feeding duty for {date}"),
        FeedingToggle::Unassigned => format!("off feeding duty for {date}"),
        FeedingToggle::Reassigned { previous_user_id } => {
            format!("took over feeding duty for {date} from user {previous_user_id}")
        }
    }
}

pub fn photo(photo: &Photo) -> String {
    let ugly = if photo.is_ugly { " [ugly]" } else { "" };
    format!(
        "{} {} {} cats={:?}{ugly}",
        photo.id, photo.taken_on, photo.file_path, photo.cat_ids
    )
}

pub fn report(report: &Report) -> String {
    format!(
        "#{} {} {} ({})",
        report.id, report.date, report.title, report.author.name
    )
}

pub fn capture(capture: &Capture) -> String {
    let released = capture
        .released_on
        .map_or_else(|| "open".to_string(), |date| date.to_string());
    let weight = capture
        .weight_kg
        .map_or_else(|| "-".to_string(), |kg| format!("{kg:.2} kg"));
    format!(
        "#{} cat={} {} .. {} weight={weight} sterilized={}",
        capture.id, capture.cat_id, capture.captured_on, released, capture.sterilized
    )
}

pub fn illness(illness: &Illness) -> String {
    let status = match illness.cured_on {
        Some(date) => format!("cured {date}"),
        None => "ongoing".to_string(),
    };
    format!(
        "#{} {} {} ({status})",
        illness.id, illness.diagnosed_on, illness.diagnosis
    )
}

pub fn vaccination(vaccination: &Vaccination) -> String {
    format!(
        "{} {} valid until {}",
        vaccination.date,
        vaccination.kind,
        vaccination.valid_until()
    )
}

pub fn user(user: &User) -> String {
    let role = if user.is_superuser { " [superuser]" } else { "" };
    format!("{:<16} {}{role}", user.username, user.display_name())
}

/// Contribution-style grid: one column per week, one row per weekday.
pub fn heatmap(grid: &ActivityGrid) -> String {
    let mut out = Vec::with_capacity(grid.data.len() + 2);

    let mut ticks = vec![' '; grid.weeks];
    let mut next_free = 0;
    for (week, label) in grid.month_ticks.iter().enumerate() {
        if label.is_empty() || week < next_free {
            continue;
        }
        for (offset, ch) in label.chars().enumerate() {
            if let Some(slot) = ticks.get_mut(week + offset) {
                *slot = ch;
            }
        }
        next_free = week + label.chars().count() + 1;
    }
    out.push(format!(
        "{:width$}{}",
        "",
        ticks.into_iter().collect::<String>(),
        width = LABEL_WIDTH
    ));

    for (weekday, row) in grid.data.iter().enumerate() {
        let label = grid.weekday_labels.get(weekday).map_or("", String::as_str);
        let cells: String = row
            .iter()
            .enumerate()
            .map(|(week, count)| {
                let date = grid.base_date + Duration::days((week * 7 + weekday) as i64);
                if date > grid.reference_date {
                    ' '
                } else {
                    LEVEL_GLYPHS[usize::from(ActivityMap::level(*count))]
                }
            })
            .collect();
        out.push(format!("{label:<width$}{cells}", width = LABEL_WIDTH));
    }

    out.push(format!(
        "{} event(s) from {} to {}, busiest day {}",
        grid.total, grid.base_date, grid.reference_date, grid.max_count
    ));
    out.join("\n")
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(" ")
    }
}
