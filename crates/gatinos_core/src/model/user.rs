//! User identity as seen by the domain layer.

use serde::{Deserialize, Serialize};

/// Storage row id of a user.
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
}

impl User {
    /// Full name, falling back to the username when both parts are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Author stamp carried by user-bound records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// `None` once the user row is deleted.
    pub user_id: Option<UserId>,
    /// Display name cached at write time.
    pub name: String,
}

impl Author {
    pub fn of(user: &User) -> Self {
        Self {
            user_id: Some(user.id),
            name: user.display_name(),
        }
    }

    /// Stamp for records written by background jobs.
    pub fn system() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{Author, User};

    #[test]
    fn display_name_prefers_full_name() {
        let mut user = User {
            id: 1,
            username: "pepa".to_string(),
            first_name: " Pepa ".to_string(),
            last_name: "Ruiz".to_string(),
            is_superuser: false,
        };
        assert_eq!(user.display_name(), "Pepa Ruiz");
        assert_eq!(Author::of(&user).name, "Pepa Ruiz");

        user.first_name.clear();
        user.last_name.clear();
        assert_eq!(user.display_name(), "pepa");
    }
}
