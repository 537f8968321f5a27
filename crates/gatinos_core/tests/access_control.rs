use gatinos_core::model::permission::PermissionError;
use gatinos_core::{
    open_db_in_memory, AccessService, ColonyService, Config, FixedClock, NewColony, NewUser,
    Permission, RepoError, ServiceError, SqliteStore,
};
use std::collections::BTreeMap;

fn seed(store: SqliteStore<'_>) {
    let clock = FixedClock(chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    ColonyService::new(store, clock)
        .create_colony(NewColony::new("La Plaza"))
        .unwrap();
    AccessService::new(store)
        .create_user(NewUser {
            username: "pepa".to_string(),
            first_name: "Pepa".to_string(),
            last_name: "Ruiz".to_string(),
            is_superuser: false,
        })
        .unwrap();
}

#[test]
fn usernames_are_unique_and_required() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);
    let access = AccessService::new(store);

    let err = access
        .create_user(NewUser {
            username: "pepa".to_string(),
            ..NewUser::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Conflict { entity: "user", .. })
    ));

    let err = access.create_user(NewUser::default()).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert_eq!(access.get_user("pepa").unwrap().display_name(), "Pepa Ruiz");
    assert!(matches!(
        access.get_user("nadie"),
        Err(ServiceError::NotFound { entity: "user", .. })
    ));
}

#[test]
fn direct_grants_and_memberships_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);
    let access = AccessService::new(store);

    assert_eq!(access.grant("pepa", "sight_cat").unwrap(), Permission::SightCat);
    access.join("pepa", "la-plaza").unwrap();
    let grants = access.grants("pepa").unwrap();
    assert!(grants.permissions.contains(&Permission::SightCat));
    assert_eq!(grants.colonies.len(), 1);

    assert!(access.revoke("pepa", "sight_cat").unwrap());
    assert!(!access.revoke("pepa", "sight_cat").unwrap());
    assert!(access.leave("pepa", "la-plaza").unwrap());
    assert!(!access.leave("pepa", "la-plaza").unwrap());
    let grants = access.grants("pepa").unwrap();
    assert!(grants.permissions.is_empty());
    assert!(grants.colonies.is_empty());
}

#[test]
fn unknown_permission_code_is_rejected_before_lookup() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);

    let err = AccessService::new(store)
        .grant("nadie", "adopt_cat")
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidPermission(PermissionError::UnsupportedPermission(_))
    ));
}

#[test]
fn group_sync_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);
    let access = AccessService::new(store);

    let mut groups = BTreeMap::new();
    groups.insert("feeders".to_string(), vec!["feed_colony".to_string()]);
    groups.insert("broken".to_string(), vec!["fly_cat".to_string()]);
    assert!(access.sync_groups(&groups).is_err());
    assert_eq!(access.group_permissions("feeders").unwrap(), None);

    groups.remove("broken");
    assert_eq!(access.sync_groups(&groups).unwrap(), 1);
    assert_eq!(
        access.group_permissions("feeders").unwrap(),
        Some(vec![Permission::FeedColony])
    );
}

#[test]
fn config_groups_rewrite_existing_permissions() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    seed(store);
    let access = AccessService::new(store);

    let first = Config::from_toml_str(
        "[groups]\nvoluntarios = [\"sight_cat\", \"feed_colony\"]\n",
    )
    .unwrap();
    access.sync_groups_from_config(&first).unwrap();
    access.add_to_group("pepa", "voluntarios").unwrap();
    assert!(access
        .grants("pepa")
        .unwrap()
        .permissions
        .contains(&Permission::FeedColony));

    let second = Config::from_toml_str("[groups]\nvoluntarios = [\"sight_cat\"]\n").unwrap();
    access.sync_groups_from_config(&second).unwrap();
    let permissions = access.grants("pepa").unwrap().permissions;
    assert!(permissions.contains(&Permission::SightCat));
    assert!(!permissions.contains(&Permission::FeedColony));

    assert!(matches!(
        access.add_to_group("pepa", "ghosts"),
        Err(ServiceError::NotFound { entity: "group", .. })
    ));
}
