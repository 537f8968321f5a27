//! User, grant, membership and group persistence.
//!
//! # Invariants
//! - Permission codes are stored as their stable string code; an unknown
//!   stored code is reported as invalid data.
//! - Group sync replaces each group's permission set in one transaction.

use crate::model::colony::ColonyId;
use crate::model::permission::{parse_permission, Permission, UserGrants};
use crate::model::user::{User, UserId};
use crate::model::{limit_text, require_text};
use crate::repo::{bool_to_int, int_to_bool, map_unique, RepoError, RepoResult, SqliteStore};
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

const USERNAME_MAX_CHARS: usize = 150;

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    first_name,
    last_name,
    is_superuser
FROM users";

pub type GroupId = i64;

/// Repository interface for users and their grants.
pub trait AccessRepository {
    /// Inserts `user` (its `id` is ignored) and returns the new row id.
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// All users ordered by username.
    fn list_users(&self) -> RepoResult<Vec<User>>;

    /// Idempotent.
    fn grant_permission(&self, user_id: UserId, permission: Permission) -> RepoResult<()>;
    /// Returns whether a direct grant was removed.
    fn revoke_permission(&self, user_id: UserId, permission: Permission) -> RepoResult<bool>;
    /// Idempotent.
    fn join_colony(&self, user_id: UserId, colony_id: ColonyId) -> RepoResult<()>;
    /// Returns whether a membership was removed.
    fn leave_colony(&self, user_id: UserId, colony_id: ColonyId) -> RepoResult<bool>;
    /// Direct and group permissions merged, plus colony memberships.
    fn user_grants(&self, user_id: UserId) -> RepoResult<UserGrants>;

    /// Creates missing groups and sets each group's permissions to exactly
    /// the given list. Groups not named are left alone.
    fn sync_groups(&self, groups: &BTreeMap<String, Vec<Permission>>) -> RepoResult<()>;
    /// Idempotent. Fails with `NotFound` for an unknown group.
    fn add_group_member(&self, group: &str, user_id: UserId) -> RepoResult<()>;
    /// Permission codes of one group, sorted.
    fn group_permissions(&self, group: &str) -> RepoResult<Option<Vec<Permission>>>;
}

impl AccessRepository for SqliteStore<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        require_text("username", &user.username)?;
        limit_text("username", &user.username, USERNAME_MAX_CHARS)?;

        self.conn
            .execute(
                "INSERT INTO users (username, first_name, last_name, is_superuser)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    user.username.as_str(),
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                    bool_to_int(user.is_superuser),
                ],
            )
            .map_err(|err| map_unique(err, "user", &user.username))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_user_row(row)))
            .optional()?;
        row.transpose()
    }

    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE username = ?1;"))?;
        let row = stmt
            .query_row([username], |row| Ok(parse_user_row(row)))
            .optional()?;
        row.transpose()
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY username ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn grant_permission(&self, user_id: UserId, permission: Permission) -> RepoResult<()> {
        self.ensure_user(user_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO user_permissions (user_id, permission) VALUES (?1, ?2);",
            params![user_id, permission.as_str()],
        )?;
        Ok(())
    }

    fn revoke_permission(&self, user_id: UserId, permission: Permission) -> RepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM user_permissions WHERE user_id = ?1 AND permission = ?2;",
            params![user_id, permission.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn join_colony(&self, user_id: UserId, colony_id: ColonyId) -> RepoResult<()> {
        self.ensure_user(user_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO colony_members (colony_id, user_id) VALUES (?1, ?2);",
            params![colony_id, user_id],
        )?;
        Ok(())
    }

    fn leave_colony(&self, user_id: UserId, colony_id: ColonyId) -> RepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM colony_members WHERE colony_id = ?1 AND user_id = ?2;",
            params![colony_id, user_id],
        )?;
        Ok(removed > 0)
    }

    fn user_grants(&self, user_id: UserId) -> RepoResult<UserGrants> {
        let mut grants = UserGrants::default();

        let mut stmt = self.conn.prepare(
            "SELECT permission FROM user_permissions WHERE user_id = ?1
             UNION
             SELECT gp.permission
             FROM group_permissions gp
             INNER JOIN group_members gm ON gm.group_id = gp.group_id
             WHERE gm.user_id = ?1;",
        )?;
        let mut rows = stmt.query([user_id])?;
        while let Some(row) = rows.next()? {
            let code: String = row.get(0)?;
            grants.permissions.insert(parse_stored_permission(&code)?);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT colony_id FROM colony_members WHERE user_id = ?1;")?;
        let colonies = stmt
            .query_map([user_id], |row| row.get::<_, ColonyId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        grants.colonies.extend(colonies);

        Ok(grants)
    }

    fn sync_groups(&self, groups: &BTreeMap<String, Vec<Permission>>) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (name, permissions) in groups {
            require_text("group", name)?;
            tx.execute(
                "INSERT OR IGNORE INTO user_groups (name) VALUES (?1);",
                [name.as_str()],
            )?;
            let group_id: GroupId = tx.query_row(
                "SELECT id FROM user_groups WHERE name = ?1;",
                [name.as_str()],
                |row| row.get(0),
            )?;
            tx.execute(
                "DELETE FROM group_permissions WHERE group_id = ?1;",
                [group_id],
            )?;
            for permission in permissions {
                tx.execute(
                    "INSERT OR IGNORE INTO group_permissions (group_id, permission)
                     VALUES (?1, ?2);",
                    params![group_id, permission.as_str()],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn add_group_member(&self, group: &str, user_id: UserId) -> RepoResult<()> {
        self.ensure_user(user_id)?;
        let group_id: Option<GroupId> = self
            .conn
            .query_row(
                "SELECT id FROM user_groups WHERE name = ?1;",
                [group],
                |row| row.get(0),
            )
            .optional()?;
        let group_id = group_id.ok_or_else(|| RepoError::not_found("group", group))?;
        self.conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2);",
            params![group_id, user_id],
        )?;
        Ok(())
    }

    fn group_permissions(&self, group: &str) -> RepoResult<Option<Vec<Permission>>> {
        let group_id: Option<GroupId> = self
            .conn
            .query_row(
                "SELECT id FROM user_groups WHERE name = ?1;",
                [group],
                |row| row.get(0),
            )
            .optional()?;
        let Some(group_id) = group_id else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT permission FROM group_permissions WHERE group_id = ?1 ORDER BY permission;",
        )?;
        let codes = stmt
            .query_map([group_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut permissions = codes
            .iter()
            .map(|code| parse_stored_permission(code))
            .collect::<RepoResult<Vec<_>>>()?;
        permissions.sort();
        Ok(Some(permissions))
    }
}

impl SqliteStore<'_> {
    fn ensure_user(&self, user_id: UserId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            [user_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::not_found("user", user_id));
        }
        Ok(())
    }
}

fn parse_stored_permission(code: &str) -> RepoResult<Permission> {
    parse_permission(code)
        .map_err(|err| RepoError::InvalidData(format!("stored permission: {err}")))
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        is_superuser: int_to_bool(row.get("is_superuser")?, "users.is_superuser")?,
    })
}
