use chrono::NaiveDate;
use gatinos_core::{
    open_db_in_memory, AccessService, CatService, CatState, CatUpdate, ColonyService, FixedClock,
    NewCat, NewColony, NewPhoto, NewReport, NewUser, RecordService, ReportUpdate, ServiceError,
    Sex, SqliteStore, User,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Colonies `la-plaza` and `el-parque`, cat `misi` in the plaza and cat
/// `tom` in the park.
fn seed(store: SqliteStore<'_>) -> User {
    let clock = FixedClock(day(2024, 1, 10));
    let colonies = ColonyService::new(store, clock);
    colonies.create_colony(NewColony::new("La Plaza")).unwrap();
    colonies.create_colony(NewColony::new("El Parque")).unwrap();
    let cats = CatService::new(store, clock);
    cats.create_cat("la-plaza", NewCat::new("Misi", Sex::Female))
        .unwrap();
    cats.create_cat("el-parque", NewCat::new("Tom", Sex::Male))
        .unwrap();
    AccessService::new(store)
        .create_user(NewUser {
            username: "pepa".to_string(),
            ..NewUser::default()
        })
        .unwrap()
}

#[test]
fn new_cat_starts_free_and_registered_today() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);

    let cat = CatService::new(store, FixedClock(day(2024, 1, 10)))
        .get_cat("misi")
        .unwrap();
    assert_eq!(cat.state, CatState::Free);
    assert_eq!(cat.registered_on, day(2024, 1, 10));
    assert!(!cat.is_dead);
    assert_eq!(cat.sex, Sex::Female);
}

#[test]
fn rename_reslugs_the_cat() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);
    let cats = CatService::new(store, FixedClock(day(2024, 2, 1)));

    let renamed = cats
        .update_cat(
            "misi",
            CatUpdate {
                name: Some("Misi Peluda".to_string()),
                color: Some("tricolor".to_string()),
                ..CatUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.slug, "misi-peluda");
    assert_eq!(cats.get_cat("misi-peluda").unwrap().color, "tricolor");
    assert!(matches!(
        cats.get_cat("misi"),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn neighbour_cats_are_listed_only_on_request() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);
    let mut input = NewCat::new("Bigotes", Sex::Male);
    input.is_neighbour = true;
    input.neighbour_name = "Portal 3".to_string();
    CatService::new(store, FixedClock(day(2024, 1, 12)))
        .create_cat("la-plaza", input)
        .unwrap();

    let colonies = ColonyService::new(store, FixedClock(day(2024, 1, 12)));
    let own: Vec<String> = colonies
        .list_cats("la-plaza", false)
        .unwrap()
        .into_iter()
        .map(|cat| cat.slug)
        .collect();
    assert_eq!(own, vec!["misi".to_string()]);
    assert_eq!(colonies.list_cats("la-plaza", true).unwrap().len(), 2);
}

#[test]
fn photos_tag_only_cats_of_their_colony() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let pepa = seed(store);
    let records = RecordService::new(store, FixedClock(day(2024, 2, 1)));

    let err = records
        .add_photo(
            &pepa,
            "la-plaza",
            NewPhoto {
                file_path: "photos/tom.jpg".to_string(),
                cat_slugs: vec!["tom".to_string()],
                ..NewPhoto::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rule(_)));

    let photo = records
        .add_photo(
            &pepa,
            "la-plaza",
            NewPhoto {
                file_path: "photos/misi.jpg".to_string(),
                ..NewPhoto::default()
            },
        )
        .unwrap();
    assert_eq!(photo.taken_on, day(2024, 2, 1));
    assert!(photo.cat_ids.is_empty());

    let tagged = records.tag_photo(photo.id, "misi").unwrap();
    assert_eq!(tagged.cat_ids.len(), 1);
    assert_eq!(records.get_photo(photo.id).unwrap().cat_ids, tagged.cat_ids);
    assert!(matches!(
        records.tag_photo(photo.id, "tom"),
        Err(ServiceError::Rule(_))
    ));

    let untagged = records.untag_photo(photo.id, "misi").unwrap();
    assert!(untagged.cat_ids.is_empty());
}

#[test]
fn portrait_must_show_the_cat() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let pepa = seed(store);
    let records = RecordService::new(store, FixedClock(day(2024, 2, 1)));
    let cats = CatService::new(store, FixedClock(day(2024, 2, 1)));

    let group_shot = records
        .add_photo(
            &pepa,
            "la-plaza",
            NewPhoto {
                file_path: "photos/group.jpg".to_string(),
                ..NewPhoto::default()
            },
        )
        .unwrap();
    let err = cats
        .update_cat(
            "misi",
            CatUpdate {
                portrait_photo_id: Some(Some(group_shot.id)),
                ..CatUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rule(_)));

    records.tag_photo(group_shot.id, "misi").unwrap();
    let cat = cats
        .update_cat(
            "misi",
            CatUpdate {
                portrait_photo_id: Some(Some(group_shot.id)),
                ..CatUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(cat.photo_url("/static/cat.png"), format!("/fotos/{}", group_shot.id));

    records.delete_photo(group_shot.id).unwrap();
    assert_eq!(cats.get_cat("misi").unwrap().portrait_photo_id, None);
}

#[test]
fn showcase_hides_ugly_photos_and_photos_of_ugly_cats() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let pepa = seed(store);
    let records = RecordService::new(store, FixedClock(day(2024, 2, 1)));
    let cats = CatService::new(store, FixedClock(day(2024, 2, 1)));
    cats.create_cat("la-plaza", NewCat::new("Sarna", Sex::Male))
        .unwrap();
    cats.update_cat(
        "sarna",
        CatUpdate {
            is_ugly: Some(true),
            ..CatUpdate::default()
        },
    )
    .unwrap();

    for (file, ugly, cat) in [
        ("a.jpg", false, "misi"),
        ("b.jpg", true, "misi"),
        ("c.jpg", false, "sarna"),
    ] {
        records
            .add_photo(
                &pepa,
                "la-plaza",
                NewPhoto {
                    file_path: file.to_string(),
                    is_ugly: ugly,
                    cat_slugs: vec![cat.to_string()],
                    ..NewPhoto::default()
                },
            )
            .unwrap();
    }

    assert_eq!(records.list_photos("la-plaza").unwrap().len(), 3);
    let showcase: Vec<String> = records
        .showcase_photos("la-plaza")
        .unwrap()
        .into_iter()
        .map(|photo| photo.file_path)
        .collect();
    assert_eq!(showcase, vec!["a.jpg".to_string()]);
}

#[test]
fn reports_are_listed_newest_first_and_editable() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let pepa = seed(store);
    let records = RecordService::new(store, FixedClock(day(2024, 2, 1)));

    let older = records
        .add_report(
            &pepa,
            "la-plaza",
            NewReport {
                title: "Vet visit".to_string(),
                date: Some(day(2024, 1, 20)),
                cat_slugs: vec!["misi".to_string()],
                ..NewReport::default()
            },
        )
        .unwrap();
    let newer = records
        .add_report(
            &pepa,
            "la-plaza",
            NewReport {
                title: "Feeding".to_string(),
                body: Some("   ".to_string()),
                ..NewReport::default()
            },
        )
        .unwrap();
    assert_eq!(newer.date, day(2024, 2, 1));
    assert_eq!(newer.body, None);

    let titles: Vec<String> = records
        .list_reports("la-plaza")
        .unwrap()
        .into_iter()
        .map(|report| report.title)
        .collect();
    assert_eq!(titles, vec!["Feeding".to_string(), "Vet visit".to_string()]);

    let updated = records
        .update_report(
            older.id,
            ReportUpdate {
                body: Some(Some("All fine".to_string())),
                cat_slugs: Some(Vec::new()),
                ..ReportUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.body.as_deref(), Some("All fine"));
    assert!(records.get_report(older.id).unwrap().cat_ids.is_empty());

    records.delete_report(newer.id).unwrap();
    assert_eq!(records.list_reports("la-plaza").unwrap().len(), 1);
}
