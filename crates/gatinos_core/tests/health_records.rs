use chrono::NaiveDate;
use gatinos_core::config::LifecycleConfig;
use gatinos_core::model::records::CaptureUpdate;
use gatinos_core::{
    open_db_in_memory, AccessService, CatAction, CatService, CatalogError, ColonyService,
    FixedClock, GrantPolicy, HealthService, LifecycleService, NewCat, NewColony, NewUser,
    ServiceError, Sex, SqliteStore, User, VaccineCatalog,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn health(
    store: SqliteStore<'_>,
    today: NaiveDate,
) -> HealthService<SqliteStore<'_>, FixedClock, GrantPolicy> {
    HealthService::new(
        store,
        FixedClock(today),
        GrantPolicy,
        VaccineCatalog::builtin().unwrap(),
    )
}

fn act(store: SqliteStore<'_>, user: &User, action: CatAction, today: NaiveDate) -> Option<i64> {
    LifecycleService::new(
        store,
        FixedClock(today),
        GrantPolicy,
        &LifecycleConfig::default(),
    )
    .perform(user, "misi", action)
    .unwrap()
    .capture_id
}

/// Colony `la-plaza` with cat `misi` and a superuser.
fn seed(store: SqliteStore<'_>) -> User {
    let clock = FixedClock(day(2024, 1, 10));
    ColonyService::new(store, clock)
        .create_colony(NewColony::new("La Plaza"))
        .unwrap();
    CatService::new(store, clock)
        .create_cat("la-plaza", NewCat::new("Misi", Sex::Female))
        .unwrap();
    AccessService::new(store)
        .create_user(NewUser {
            username: "vet".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Vidal".to_string(),
            is_superuser: true,
        })
        .unwrap()
}

#[test]
fn sterilizing_capture_stamps_the_cat_and_records_weight() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let vet = seed(store);
    let capture_id = act(store, &vet, CatAction::Capture, day(2024, 3, 1)).unwrap();

    let capture = health(store, day(2024, 3, 2))
        .update_capture(
            capture_id,
            CaptureUpdate {
                weight_kg: Some(Some(3.2)),
                sterilized: Some(true),
                notes: Some("healthy".to_string()),
            },
        )
        .unwrap();
    assert!(capture.sterilized);

    let cats = CatService::new(store, FixedClock(day(2024, 3, 2)));
    let cat = cats.get_cat("misi").unwrap();
    assert_eq!(cat.sterilized_on, Some(day(2024, 3, 1)));
    assert_eq!(cats.weight("misi").unwrap(), Some(3.2));
}

#[test]
fn vaccination_needs_an_open_capture_and_stores_catalog_effect() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let vet = seed(store);
    let capture_id = act(store, &vet, CatAction::Capture, day(2024, 3, 1)).unwrap();
    let service = health(store, day(2024, 3, 1));

    let rabies = service.vaccinate(&vet, capture_id, "rabia").unwrap();
    assert_eq!(rabies.kind, "RABIA");
    assert_eq!(rabies.effect_days, 365);
    assert_eq!(rabies.date, day(2024, 3, 1));
    assert_eq!(rabies.author.name, "Ana Vidal");
    service
        .vaccinate(&vet, capture_id, "DESPARASITACION")
        .unwrap();

    let err = service
        .vaccinate(&vet, capture_id, "moquillo")
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Catalog(CatalogError::UnknownVaccine(_))
    ));

    act(store, &vet, CatAction::Release, day(2024, 3, 3));
    let err = service.vaccinate(&vet, capture_id, "rabia").unwrap_err();
    assert!(matches!(err, ServiceError::Rule(_)));

    let effective: Vec<String> = health(store, day(2024, 6, 10))
        .effective_vaccinations("misi")
        .unwrap()
        .into_iter()
        .map(|vaccination| vaccination.kind)
        .collect();
    assert_eq!(effective, vec!["RABIA".to_string()]);
}

#[test]
fn illness_is_diagnosed_and_cured_once() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let vet = seed(store);

    let illness = health(store, day(2024, 4, 1))
        .diagnose(&vet, "misi", "  conjuntivitis ", "ojo izquierdo")
        .unwrap();
    assert_eq!(illness.diagnosis, "conjuntivitis");
    assert_eq!(illness.diagnosed_on, day(2024, 4, 1));
    assert!(!illness.is_cured());

    let cured = health(store, day(2024, 4, 15)).cure(illness.id).unwrap();
    assert_eq!(cured.cured_on, Some(day(2024, 4, 15)));

    let err = health(store, day(2024, 4, 16))
        .cure(illness.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rule(_)));

    let err = health(store, day(2024, 4, 16))
        .diagnose(&vet, "misi", "   ", "")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn profile_gathers_health_history() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let vet = seed(store);
    let capture_id = act(store, &vet, CatAction::Capture, day(2024, 3, 1)).unwrap();
    health(store, day(2024, 3, 1))
        .vaccinate(&vet, capture_id, "trivalente")
        .unwrap();
    health(store, day(2024, 3, 2))
        .diagnose(&vet, "misi", "otitis", "")
        .unwrap();

    let profile = CatService::new(store, FixedClock(day(2024, 3, 2)))
        .profile("misi", "/static/cat.png")
        .unwrap();
    assert_eq!(profile.colony_slug, "la-plaza");
    assert!(profile.is_captured);
    assert_eq!(profile.open_capture.as_ref().map(|c| c.id), Some(capture_id));
    assert_eq!(profile.state_color, "orange");
    assert_eq!(profile.photo_url, "/static/cat.png");
    assert_eq!(profile.captures.len(), 1);
    assert_eq!(profile.vaccinations.len(), 1);
    assert_eq!(profile.illnesses.len(), 1);
    assert_eq!(profile.last_activity, day(2024, 3, 2));
}
