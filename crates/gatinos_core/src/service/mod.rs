//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Apply permission checks and domain rules that span several records.
//! - Keep callers (the CLI) decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Every "today" stamp comes from the injected [`crate::clock::Clock`].

use crate::config::ConfigError;
use crate::model::cat::Cat;
use crate::model::colony::ColonyId;
use crate::model::permission::{Permission, PermissionError, PermissionPolicy};
use crate::model::user::User;
use crate::model::ValidationError;
use crate::repo::user_repo::AccessRepository;
use crate::repo::{RepoError, RepoResult};
use crate::vaccines::CatalogError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod access_service;
pub mod cat_service;
pub mod colony_service;
pub mod health_service;
pub mod lifecycle_service;
pub mod presence_service;
pub mod record_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for CRUD and record use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Target entity does not exist.
    NotFound { entity: &'static str, key: String },
    /// Acting user lacks `permission` for `target`.
    PermissionDenied {
        username: String,
        permission: Permission,
        target: String,
    },
    /// Request conflicts with a domain rule, for example vaccinating a cat
    /// that is not captured.
    Rule(String),
    Validation(ValidationError),
    InvalidPermission(PermissionError),
    Catalog(CatalogError),
    Config(ConfigError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn rule(message: impl Into<String>) -> Self {
        Self::Rule(message.into())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::PermissionDenied {
                username,
                permission,
                target,
            } => write!(f, "user `{username}` lacks `{permission}` on {target}"),
            Self::Rule(message) => write!(f, "{message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidPermission(err) => write!(f, "{err}"),
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidPermission(err) => Some(err),
            Self::Catalog(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound { .. } | Self::PermissionDenied { .. } | Self::Rule(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PermissionError> for ServiceError {
    fn from(value: PermissionError) -> Self {
        Self::InvalidPermission(value)
    }
}

impl From<CatalogError> for ServiceError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<ConfigError> for ServiceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Resolves the user's grants and asks `policy` about one colony.
pub(crate) fn is_allowed_in_colony<S: AccessRepository, P: PermissionPolicy>(
    store: &S,
    policy: &P,
    user: &User,
    permission: Permission,
    colony_id: ColonyId,
) -> RepoResult<bool> {
    let grants = store.user_grants(user.id)?;
    Ok(policy.allows_in_colony(user, &grants, permission, colony_id))
}

/// Resolves the user's grants and asks `policy` about one cat.
pub(crate) fn is_allowed_on_cat<S: AccessRepository, P: PermissionPolicy>(
    store: &S,
    policy: &P,
    user: &User,
    permission: Permission,
    cat: &Cat,
) -> RepoResult<bool> {
    let grants = store.user_grants(user.id)?;
    Ok(policy.allows(user, &grants, permission, cat))
}
