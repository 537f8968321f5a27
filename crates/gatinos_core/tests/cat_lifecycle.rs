use chrono::NaiveDate;
use gatinos_core::config::LifecycleConfig;
use gatinos_core::repo::capture_repo::CaptureRepository;
use gatinos_core::repo::user_repo::AccessRepository;
use gatinos_core::{
    open_db_in_memory, AccessService, CatAction, CatService, CatState, ColonyService, FixedClock,
    GrantPolicy, LifecycleError, LifecycleService, NewCat, NewColony, NewUser, Permission, Sex,
    SqliteStore, User,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn lifecycle(
    store: SqliteStore<'_>,
    today: NaiveDate,
) -> LifecycleService<SqliteStore<'_>, FixedClock, GrantPolicy> {
    LifecycleService::new(
        store,
        FixedClock(today),
        GrantPolicy,
        &LifecycleConfig::default(),
    )
}

/// Colony `la-plaza` with cat `misi`, a superuser and a plain volunteer.
fn seed(store: SqliteStore<'_>) -> (User, User) {
    let clock = FixedClock(day(2024, 1, 10));
    ColonyService::new(store, clock)
        .create_colony(NewColony::new("La Plaza"))
        .unwrap();
    CatService::new(store, clock)
        .create_cat("la-plaza", NewCat::new("Misi", Sex::Female))
        .unwrap();

    let access = AccessService::new(store);
    let admin = access
        .create_user(NewUser {
            username: "admin".to_string(),
            is_superuser: true,
            ..NewUser::default()
        })
        .unwrap();
    let pepa = access
        .create_user(NewUser {
            username: "pepa".to_string(),
            first_name: "Pepa".to_string(),
            ..NewUser::default()
        })
        .unwrap();
    (admin, pepa)
}

#[test]
fn capture_then_release_opens_and_closes_one_capture() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (admin, _) = seed(store);

    let captured = lifecycle(store, day(2024, 3, 1))
        .perform(&admin, "misi", CatAction::Capture)
        .unwrap();
    assert_eq!(captured.from, CatState::Free);
    assert_eq!(captured.to, CatState::Captured);
    let capture_id = captured.capture_id.unwrap();

    let open = store.last_open_capture(captured.cat.id).unwrap().unwrap();
    assert_eq!(open.id, capture_id);
    assert_eq!(open.captured_on, day(2024, 3, 1));
    assert_eq!(open.author.user_id, Some(admin.id));

    let released = lifecycle(store, day(2024, 3, 5))
        .perform(&admin, "misi", CatAction::Release)
        .unwrap();
    assert_eq!(released.to, CatState::Free);
    assert_eq!(released.capture_id, Some(capture_id));

    let closed = store.get_capture(capture_id).unwrap().unwrap();
    assert_eq!(closed.released_on, Some(day(2024, 3, 5)));
    assert!(store.last_open_capture(captured.cat.id).unwrap().is_none());
}

#[test]
fn illegal_action_is_rejected_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (admin, _) = seed(store);
    let service = lifecycle(store, day(2024, 3, 1));

    let err = service
        .perform(&admin, "misi", CatAction::Release)
        .unwrap_err();
    match err {
        LifecycleError::InvalidTransition(err) => {
            assert_eq!(err.from, CatState::Free);
            assert_eq!(err.action, CatAction::Release);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .perform(&admin, "misi", CatAction::Forget)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));

    let cat = CatService::new(store, FixedClock(day(2024, 3, 1)))
        .get_cat("misi")
        .unwrap();
    assert_eq!(cat.state, CatState::Free);
}

#[test]
fn volunteer_needs_permission_and_membership() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (_, pepa) = seed(store);
    let service = lifecycle(store, day(2024, 3, 1));

    let err = service.perform(&pepa, "misi", CatAction::Mark).unwrap_err();
    match err {
        LifecycleError::PermissionDenied {
            username,
            permission,
            cat,
        } => {
            assert_eq!(username, "pepa");
            assert_eq!(permission, Permission::MarkCat);
            assert_eq!(cat, "misi");
        }
        other => panic!("unexpected error: {other}"),
    }

    store.grant_permission(pepa.id, Permission::MarkCat).unwrap();
    assert!(matches!(
        service.perform(&pepa, "misi", CatAction::Mark),
        Err(LifecycleError::PermissionDenied { .. })
    ));

    AccessService::new(store).join("pepa", "la-plaza").unwrap();
    let marked = service.perform(&pepa, "misi", CatAction::Mark).unwrap();
    assert_eq!(marked.to, CatState::Marked);
    assert_eq!(
        service.available_actions(&pepa, "misi").unwrap(),
        vec![CatAction::Unmark]
    );
}

#[test]
fn die_and_resurrect_stamp_and_clear_death() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (admin, _) = seed(store);

    let dead = lifecycle(store, day(2024, 4, 2))
        .perform(&admin, "misi", CatAction::Die)
        .unwrap();
    assert_eq!(dead.to, CatState::Dead);
    assert!(dead.cat.is_dead);
    assert_eq!(dead.cat.died_on, Some(day(2024, 4, 2)));

    let err = lifecycle(store, day(2024, 4, 3))
        .perform(&admin, "misi", CatAction::Die)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));

    let alive = lifecycle(store, day(2024, 4, 3))
        .perform(&admin, "misi", CatAction::Resurrect)
        .unwrap();
    assert_eq!(alive.to, CatState::Free);

    let stored = CatService::new(store, FixedClock(day(2024, 4, 3)))
        .get_cat("misi")
        .unwrap();
    assert!(!stored.is_dead);
    assert_eq!(stored.died_on, None);
    assert_eq!(stored.state, CatState::Free);
}

#[test]
fn dying_in_captivity_closes_the_capture_so_the_cat_can_be_caught_again() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (admin, _) = seed(store);

    let first = lifecycle(store, day(2024, 3, 1))
        .perform(&admin, "misi", CatAction::Capture)
        .unwrap();
    let first_id = first.capture_id.unwrap();
    let dead = lifecycle(store, day(2024, 3, 2))
        .perform(&admin, "misi", CatAction::Die)
        .unwrap();
    assert_eq!(dead.from, CatState::Captured);
    assert!(store.last_open_capture(dead.cat.id).unwrap().is_none());
    assert_eq!(
        store.get_capture(first_id).unwrap().unwrap().released_on,
        Some(day(2024, 3, 2))
    );

    lifecycle(store, day(2024, 3, 3))
        .perform(&admin, "misi", CatAction::Resurrect)
        .unwrap();
    let cats = CatService::new(store, FixedClock(day(2024, 3, 3)));
    assert!(!cats.is_captured("misi").unwrap());

    let second = lifecycle(store, day(2024, 4, 1))
        .perform(&admin, "misi", CatAction::Capture)
        .unwrap();
    let second_id = second.capture_id.unwrap();
    assert_ne!(second_id, first_id);

    let captures = store.list_cat_captures(dead.cat.id).unwrap();
    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0].id, second_id);
    assert_eq!(captures[0].released_on, None);
    assert_eq!(captures[1].released_on, Some(day(2024, 3, 2)));
}

#[test]
fn capture_bookkeeping_must_match_the_state() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (admin, _) = seed(store);
    let cat_id = CatService::new(store, FixedClock(day(2024, 3, 1)))
        .get_cat("misi")
        .unwrap()
        .id;

    // Left behind by an import: a free cat with an open capture.
    conn.execute(
        "INSERT INTO captures (cat_id, captured_on) VALUES (?1, '2024-02-01');",
        [cat_id],
    )
    .unwrap();
    let err = lifecycle(store, day(2024, 3, 1))
        .perform(&admin, "misi", CatAction::Capture)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::CaptureAlreadyOpen(slug) if slug == "misi"));
    assert_eq!(store.list_cat_captures(cat_id).unwrap().len(), 1);

    conn.execute("DELETE FROM captures WHERE cat_id = ?1;", [cat_id])
        .unwrap();
    conn.execute("UPDATE cats SET state = 'captured' WHERE id = ?1;", [cat_id])
        .unwrap();
    let err = lifecycle(store, day(2024, 3, 1))
        .perform(&admin, "misi", CatAction::Release)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NoOpenCapture(slug) if slug == "misi"));
    let cat = CatService::new(store, FixedClock(day(2024, 3, 1)))
        .get_cat("misi")
        .unwrap();
    assert_eq!(cat.state, CatState::Captured);
}

#[test]
fn missing_cat_reappears_and_unknown_cat_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (admin, _) = seed(store);
    let service = lifecycle(store, day(2024, 5, 1));

    service.perform(&admin, "misi", CatAction::Disappear).unwrap();
    service.perform(&admin, "misi", CatAction::Forget).unwrap();
    let back = service
        .perform(&admin, "misi", CatAction::Reappear)
        .unwrap();
    assert_eq!(back.from, CatState::Forgotten);
    assert_eq!(back.to, CatState::Free);

    let err = service
        .perform(&admin, "garfield", CatAction::Mark)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::CatNotFound(slug) if slug == "garfield"));
}

#[test]
fn grants_reach_users_through_groups() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let (_, pepa) = seed(store);
    let access = AccessService::new(store);

    let mut groups = std::collections::BTreeMap::new();
    groups.insert(
        "capturers".to_string(),
        vec!["capture_cat".to_string(), "release_cat".to_string()],
    );
    access.sync_groups(&groups).unwrap();
    access.add_to_group("pepa", "capturers").unwrap();
    access.join("pepa", "la-plaza").unwrap();

    let grants = store.user_grants(pepa.id).unwrap();
    assert!(grants.permissions.contains(&Permission::CaptureCat));
    assert!(!grants.permissions.contains(&Permission::KillCat));

    let captured = lifecycle(store, day(2024, 6, 1))
        .perform(&pepa, "misi", CatAction::Capture)
        .unwrap();
    assert_eq!(captured.to, CatState::Captured);
}
