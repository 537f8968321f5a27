use chrono::NaiveDate;
use gatinos_core::{
    open_db_in_memory, AccessService, CatService, ColonyService, DateRange, EventKind, FixedClock,
    GrantPolicy, Locale, NewCat, NewColony, NewPhoto, NewReport, NewUser, PresenceService,
    RecordService, Sex, SqliteStore, User,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Colony `la-plaza` with cats `misi` and `tom` registered on 2024-01-10,
/// one report and one photo on 2024-06-03 mentioning `misi`, a sighting of
/// `misi` on 2024-06-12, and one report long before the window.
fn seed(store: SqliteStore<'_>) -> User {
    let clock = FixedClock(day(2024, 1, 10));
    ColonyService::new(store, clock)
        .create_colony(NewColony::new("La Plaza"))
        .unwrap();
    let cats = CatService::new(store, clock);
    cats.create_cat("la-plaza", NewCat::new("Misi", Sex::Female))
        .unwrap();
    cats.create_cat("la-plaza", NewCat::new("Tom", Sex::Male))
        .unwrap();

    let admin = AccessService::new(store)
        .create_user(NewUser {
            username: "admin".to_string(),
            is_superuser: true,
            ..NewUser::default()
        })
        .unwrap();

    let records = RecordService::new(store, clock);
    records
        .add_report(
            &admin,
            "la-plaza",
            NewReport {
                title: "Feeding round".to_string(),
                date: Some(day(2024, 6, 3)),
                cat_slugs: vec!["misi".to_string()],
                ..NewReport::default()
            },
        )
        .unwrap();
    records
        .add_report(
            &admin,
            "la-plaza",
            NewReport {
                title: "Old visit".to_string(),
                date: Some(day(2023, 1, 1)),
                ..NewReport::default()
            },
        )
        .unwrap();
    records
        .add_photo(
            &admin,
            "la-plaza",
            NewPhoto {
                file_path: "photos/misi.jpg".to_string(),
                taken_on: Some(day(2024, 6, 3)),
                cat_slugs: vec!["misi".to_string()],
                ..NewPhoto::default()
            },
        )
        .unwrap();
    PresenceService::new(store, GrantPolicy)
        .toggle_sighting(&admin, "misi", day(2024, 6, 12))
        .unwrap();
    admin
}

#[test]
fn colony_map_counts_every_event_in_the_window() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);

    let today = day(2024, 6, 12);
    let grid = ColonyService::new(store, FixedClock(today))
        .activity_map("la-plaza", today, Locale::Spanish)
        .unwrap();

    assert_eq!(grid.base_date, day(2023, 6, 12));
    assert_eq!(grid.weeks, 53);
    assert_eq!(grid.data.len(), 7);
    assert!(grid.data.iter().all(|row| row.len() == 53));

    // Two intakes, one report, one photo and one sighting.
    assert_eq!(grid.total, 5);
    assert_eq!(grid.out_of_range, 0);
    assert_eq!(grid.data[2][30], 2);
    assert_eq!(grid.data[0][51], 2);
    assert_eq!(grid.data[2][52], 1);
    assert_eq!(grid.max_count, 2);
    assert_eq!(grid.weekday_labels[0], "lun");
}

#[test]
fn cat_map_only_counts_that_cat() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);

    let today = day(2024, 6, 12);
    let cats = CatService::new(store, FixedClock(today));

    let misi = cats
        .activity_map("misi", today, Locale::English)
        .unwrap();
    // Intake, report, photo and sighting.
    assert_eq!(misi.total, 4);
    assert_eq!(misi.data[0][51], 2);

    let tom = cats.activity_map("tom", today, Locale::English).unwrap();
    assert_eq!(tom.total, 1);
    assert_eq!(tom.data[2][30], 1);
}

#[test]
fn cat_events_always_include_intake() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);

    let cats = CatService::new(store, FixedClock(day(2024, 6, 12)));
    let events = cats
        .events("misi", DateRange::since(day(2024, 6, 1)))
        .unwrap();
    let kinds: Vec<EventKind> = events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Intake,
            EventKind::Report,
            EventKind::Photo,
            EventKind::Sighting
        ]
    );
    assert_eq!(cats.last_activity("misi").unwrap(), day(2024, 6, 12));
    assert_eq!(cats.last_activity("tom").unwrap(), day(2024, 1, 10));
}

#[test]
fn map_for_a_monday_gets_an_extra_week() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);

    let today = day(2024, 6, 10);
    let grid = ColonyService::new(store, FixedClock(today))
        .activity_map("la-plaza", today, Locale::Spanish)
        .unwrap();
    assert_eq!(grid.weeks, 54);
    assert_eq!(grid.month_ticks.len(), 54);
    // The 2024-06-12 sighting is after the reference date.
    assert_eq!(grid.total, 4);
}

#[test]
fn intake_before_the_window_is_left_out_of_the_cat_map() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);

    let today = day(2025, 3, 1);
    let tom = CatService::new(store, FixedClock(today))
        .activity_map("tom", today, Locale::English)
        .unwrap();
    assert!(tom.base_date > day(2024, 1, 10));
    assert_eq!(tom.total, 0);
    assert_eq!(tom.out_of_range, 0);

    let colony = ColonyService::new(store, FixedClock(today))
        .activity_map("la-plaza", today, Locale::English)
        .unwrap();
    assert_eq!(colony.out_of_range, tom.out_of_range);
}
