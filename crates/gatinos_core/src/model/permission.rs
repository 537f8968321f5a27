//! Permission codes and the authorization seam for cat actions.

use crate::model::cat::Cat;
use crate::model::colony::ColonyId;
use crate::model::user::User;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    ViewColony,
    ChangeColony,
    ChangeCat,
    MarkCat,
    CaptureCat,
    ReleaseCat,
    DisappearCat,
    ForgetCat,
    ReappearCat,
    KillCat,
    ResurrectCat,
    VaccinateCat,
    SightCat,
    FeedColony,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Self::ViewColony,
        Self::ChangeColony,
        Self::ChangeCat,
        Self::MarkCat,
        Self::CaptureCat,
        Self::ReleaseCat,
        Self::DisappearCat,
        Self::ForgetCat,
        Self::ReappearCat,
        Self::KillCat,
        Self::ResurrectCat,
        Self::VaccinateCat,
        Self::SightCat,
        Self::FeedColony,
    ];

    /// Stable code used in storage and group configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewColony => "view_colony",
            Self::ChangeColony => "change_colony",
            Self::ChangeCat => "change_cat",
            Self::MarkCat => "mark_cat",
            Self::CaptureCat => "capture_cat",
            Self::ReleaseCat => "release_cat",
            Self::DisappearCat => "disappear_cat",
            Self::ForgetCat => "forget_cat",
            Self::ReappearCat => "reappear_cat",
            Self::KillCat => "kill_cat",
            Self::ResurrectCat => "resurrect_cat",
            Self::VaccinateCat => "vaccinate_cat",
            Self::SightCat => "sight_cat",
            Self::FeedColony => "feed_colony",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one permission code. Codes are matched exactly (lowercase).
pub fn parse_permission(value: &str) -> Result<Permission, PermissionError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(PermissionError::EmptyPermission);
    }

    Permission::ALL
        .into_iter()
        .find(|permission| permission.as_str() == normalized)
        .ok_or_else(|| PermissionError::UnsupportedPermission(normalized.to_string()))
}

/// Permission code parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    EmptyPermission,
    UnsupportedPermission(String),
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPermission => write!(f, "permission code must not be empty"),
            Self::UnsupportedPermission(value) => {
                write!(f, "permission code is unsupported: {value}")
            }
        }
    }
}

impl Error for PermissionError {}

/// Effective grants of one user: direct and group permissions merged,
/// plus the colonies the user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserGrants {
    pub permissions: BTreeSet<Permission>,
    pub colonies: BTreeSet<ColonyId>,
}

/// Object-level authorization for actions on one cat or colony.
pub trait PermissionPolicy {
    /// Whether `user` may exercise `permission` inside `colony_id`.
    fn allows_in_colony(
        &self,
        user: &User,
        grants: &UserGrants,
        permission: Permission,
        colony_id: ColonyId,
    ) -> bool;

    /// Whether `user` may exercise `permission` on `cat`.
    fn allows(&self, user: &User, grants: &UserGrants, permission: Permission, cat: &Cat) -> bool {
        self.allows_in_colony(user, grants, permission, cat.colony_id)
    }
}

/// Default policy: superusers pass, everyone else needs the grant and
/// membership of the colony involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantPolicy;

impl PermissionPolicy for GrantPolicy {
    fn allows_in_colony(
        &self,
        user: &User,
        grants: &UserGrants,
        permission: Permission,
        colony_id: ColonyId,
    ) -> bool {
        if user.is_superuser {
            return true;
        }
        grants.permissions.contains(&permission) && grants.colonies.contains(&colony_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_permission, GrantPolicy, Permission, PermissionError, PermissionPolicy, UserGrants,
    };
    use crate::model::user::User;

    fn user(is_superuser: bool) -> User {
        User {
            id: 7,
            username: "marta".to_string(),
            first_name: "Marta".to_string(),
            last_name: String::new(),
            is_superuser,
        }
    }

    #[test]
    fn parses_every_supported_code() {
        for permission in Permission::ALL {
            assert_eq!(
                parse_permission(permission.as_str()).expect("known code"),
                permission
            );
        }
    }

    #[test]
    fn rejects_empty_and_unknown_codes() {
        assert_eq!(
            parse_permission("  "),
            Err(PermissionError::EmptyPermission)
        );
        assert_eq!(
            parse_permission("Capture_Cat"),
            Err(PermissionError::UnsupportedPermission(
                "Capture_Cat".to_string()
            ))
        );
    }

    #[test]
    fn grant_policy_requires_permission_and_membership() {
        let policy = GrantPolicy;
        let mut grants = UserGrants::default();
        assert!(!policy.allows_in_colony(&user(false), &grants, Permission::CaptureCat, 1));

        grants.permissions.insert(Permission::CaptureCat);
        assert!(!policy.allows_in_colony(&user(false), &grants, Permission::CaptureCat, 1));

        grants.colonies.insert(1);
        assert!(policy.allows_in_colony(&user(false), &grants, Permission::CaptureCat, 1));
        assert!(!policy.allows_in_colony(&user(false), &grants, Permission::CaptureCat, 2));
        assert!(!policy.allows_in_colony(&user(false), &grants, Permission::KillCat, 1));
    }

    #[test]
    fn superuser_bypasses_grants() {
        let grants = UserGrants::default();
        assert!(GrantPolicy.allows_in_colony(&user(true), &grants, Permission::KillCat, 9));
    }
}
