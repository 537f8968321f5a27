//! Core domain logic for the Gatinos colony registry.
//! This crate is the single source of truth for business invariants.

pub mod activity;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod vaccines;

pub use activity::{ActivityEvent, ActivityGrid, ActivityMap, DateRange, EventKind, Locale};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::cat::{Cat, CatId, CatUpdate, NewCat, Sex};
pub use model::colony::{Colony, ColonyId, ColonyUpdate, NewColony};
pub use model::lifecycle::{CatAction, CatState, TransitionError};
pub use model::permission::{GrantPolicy, Permission, PermissionPolicy, UserGrants};
pub use model::user::{Author, User, UserId};
pub use model::ValidationError;
pub use repo::{RepoError, RepoResult, SqliteStore};
pub use rusqlite::Connection;
pub use service::access_service::{AccessService, NewUser};
pub use service::cat_service::{CatProfile, CatService};
pub use service::colony_service::{ColonyService, SightingSheet};
pub use service::health_service::HealthService;
pub use service::lifecycle_service::{
    LifecycleError, LifecycleResult, LifecycleService, SweepReport, Transition,
};
pub use service::presence_service::PresenceService;
pub use service::record_service::{NewPhoto, NewReport, RecordService, ReportUpdate};
pub use service::{ServiceError, ServiceResult};
pub use vaccines::{CatalogError, Vaccine, VaccineCatalog};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
