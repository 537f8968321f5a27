use chrono::NaiveDate;
use gatinos_core::{
    open_db_in_memory, CatService, ColonyService, ColonyUpdate, FixedClock, NewCat, NewColony,
    RepoError, ServiceError, Sex, SqliteStore, ValidationError,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn colonies(store: SqliteStore<'_>) -> ColonyService<SqliteStore<'_>, FixedClock> {
    ColonyService::new(store, FixedClock(day(2024, 1, 10)))
}

#[test]
fn create_derives_slug_and_default_period() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let service = colonies(store);

    let colony = service
        .create_colony(NewColony::new("Jardín de la Estación"))
        .unwrap();
    assert_eq!(colony.slug, "jardin-de-la-estacion");
    assert_eq!(colony.active_period_days, 120);

    let loaded = service.get_colony("jardin-de-la-estacion").unwrap();
    assert_eq!(loaded, colony);
}

#[test]
fn configured_default_period_and_explicit_slug_apply() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let service = colonies(store).with_default_active_period(60);

    let colony = service
        .create_colony(NewColony {
            slug: Some("plaza".to_string()),
            ..NewColony::new("La Plaza Mayor")
        })
        .unwrap();
    assert_eq!(colony.slug, "plaza");
    assert_eq!(colony.active_period_days, 60);
}

#[test]
fn duplicate_slug_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let service = colonies(store);

    service.create_colony(NewColony::new("La Plaza")).unwrap();
    let err = service
        .create_colony(NewColony::new("la plaza"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Conflict {
            entity: "colony",
            ..
        })
    ));
}

#[test]
fn update_keeps_slug_and_validates_period() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let service = colonies(store);
    service.create_colony(NewColony::new("La Plaza")).unwrap();

    let updated = service
        .update_colony(
            "la-plaza",
            ColonyUpdate {
                name: Some("Plaza Nueva".to_string()),
                active_period_days: Some(30),
                ..ColonyUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.slug, "la-plaza");
    assert_eq!(updated.name, "Plaza Nueva");
    assert_eq!(updated.active_period_days, 30);

    let err = service
        .update_colony(
            "la-plaza",
            ColonyUpdate {
                active_period_days: Some(0),
                ..ColonyUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn list_orders_by_name_and_delete_cascades_to_cats() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let service = colonies(store);
    service.create_colony(NewColony::new("Zoco")).unwrap();
    service.create_colony(NewColony::new("Alameda")).unwrap();
    CatService::new(store, FixedClock(day(2024, 1, 10)))
        .create_cat("zoco", NewCat::new("Misi", Sex::Female))
        .unwrap();

    let names: Vec<String> = service
        .list_colonies()
        .unwrap()
        .into_iter()
        .map(|colony| colony.name)
        .collect();
    assert_eq!(names, vec!["Alameda".to_string(), "Zoco".to_string()]);

    service.delete_colony("zoco").unwrap();
    let err = CatService::new(store, FixedClock(day(2024, 1, 10)))
        .get_cat("misi")
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "cat", .. }));

    let err = service.get_colony("zoco").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "colony", .. }));
}

#[test]
fn unsluggable_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);

    let err = colonies(store)
        .create_colony(NewColony::new("???"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::EmptySlug(_))
    ));
}
