//! User, grant and group administration.
//!
//! # Responsibility
//! - Resolve users and colonies by their public keys (username, slug).
//! - Parse permission codes before anything is written.
//!
//! # Invariants
//! - A group sync either applies every configured group or none.

use crate::config::Config;
use crate::model::colony::Colony;
use crate::model::permission::{parse_permission, Permission, UserGrants};
use crate::model::user::User;
use crate::repo::colony_repo::ColonyRepository;
use crate::repo::user_repo::AccessRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use std::collections::BTreeMap;

/// Input for registering a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
}

/// Access administration over repository implementations.
pub struct AccessService<S> {
    store: S,
}

impl<S> AccessService<S>
where
    S: AccessRepository + ColonyRepository,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create_user(&self, input: NewUser) -> ServiceResult<User> {
        let mut user = User {
            id: 0,
            username: input.username.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            is_superuser: input.is_superuser,
        };
        user.id = self.store.create_user(&user)?;
        info!(
            "event=user_create module=access status=ok user_id={} superuser={}",
            user.id, user.is_superuser
        );
        Ok(user)
    }

    pub fn get_user(&self, username: &str) -> ServiceResult<User> {
        self.store
            .get_user_by_username(username)?
            .ok_or_else(|| ServiceError::not_found("user", username))
    }

    /// All users ordered by username.
    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.store.list_users()?)
    }

    /// Grants one permission code directly to `username`.
    pub fn grant(&self, username: &str, code: &str) -> ServiceResult<Permission> {
        let permission = parse_permission(code)?;
        let user = self.get_user(username)?;
        self.store.grant_permission(user.id, permission)?;
        info!(
            "event=permission_grant module=access status=ok user_id={} permission={permission}",
            user.id
        );
        Ok(permission)
    }

    /// Removes a direct grant. Returns `false` when it was not granted.
    /// Group permissions are untouched.
    pub fn revoke(&self, username: &str, code: &str) -> ServiceResult<bool> {
        let permission = parse_permission(code)?;
        let user = self.get_user(username)?;
        Ok(self.store.revoke_permission(user.id, permission)?)
    }

    pub fn join(&self, username: &str, colony_slug: &str) -> ServiceResult<()> {
        let user = self.get_user(username)?;
        let colony = self.load_colony(colony_slug)?;
        self.store.join_colony(user.id, colony.id)?;
        Ok(())
    }

    /// Returns `false` when the user was not a member.
    pub fn leave(&self, username: &str, colony_slug: &str) -> ServiceResult<bool> {
        let user = self.get_user(username)?;
        let colony = self.load_colony(colony_slug)?;
        Ok(self.store.leave_colony(user.id, colony.id)?)
    }

    pub fn add_to_group(&self, username: &str, group: &str) -> ServiceResult<()> {
        let user = self.get_user(username)?;
        self.store.add_group_member(group.trim(), user.id)?;
        Ok(())
    }

    /// Permissions of a group, `None` when the group does not exist.
    pub fn group_permissions(&self, group: &str) -> ServiceResult<Option<Vec<Permission>>> {
        Ok(self.store.group_permissions(group.trim())?)
    }

    /// Creates or rewrites groups from raw permission codes.
    pub fn sync_groups(&self, groups: &BTreeMap<String, Vec<String>>) -> ServiceResult<usize> {
        let mut parsed = BTreeMap::new();
        for (group, codes) in groups {
            let permissions = codes
                .iter()
                .map(|code| parse_permission(code))
                .collect::<Result<Vec<_>, _>>()?;
            parsed.insert(group.trim().to_string(), permissions);
        }
        self.apply_groups(&parsed)
    }

    /// Applies the `[groups]` section of `config`.
    pub fn sync_groups_from_config(&self, config: &Config) -> ServiceResult<usize> {
        let parsed = config.group_permissions()?;
        self.apply_groups(&parsed)
    }

    /// Effective grants: direct plus group permissions, and memberships.
    pub fn grants(&self, username: &str) -> ServiceResult<UserGrants> {
        let user = self.get_user(username)?;
        Ok(self.store.user_grants(user.id)?)
    }

    fn apply_groups(&self, groups: &BTreeMap<String, Vec<Permission>>) -> ServiceResult<usize> {
        self.store.sync_groups(groups)?;
        info!(
            "event=groups_sync module=access status=ok groups={}",
            groups.len()
        );
        Ok(groups.len())
    }

    fn load_colony(&self, slug: &str) -> ServiceResult<Colony> {
        self.store
            .get_colony_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("colony", slug))
    }
}
