use anyhow::Result;
use chrono::Utc;
use kindred_crypto::password;
use rusqlite::OptionalExtension;

use crate::changes::{ChangeSet, Persist};
use crate::models::{NewUser, USER_COLUMNS, UserRow};
use crate::Database;

impl Database {
    // -- Auth --

    /// Exact match; callers lowercase the username first.
    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                [username],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Hashes the password, stores the user and returns the stored row.
    pub fn register(&self, new_user: NewUser, password: &str) -> Result<UserRow> {
        let mut user = user_with_password(new_user, password);

        let mut changes = ChangeSet::new();
        let staged = changes.add(user.clone());
        let saved = self.save_all(changes)?;

        user.id = saved
            .id(staged)
            .ok_or_else(|| anyhow::anyhow!("registration of {} was not saved", user.username))?;
        Ok(user)
    }

    /// `None` when the username is unknown or the password does not match.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<UserRow>> {
        let Some(user) = self.get_user_by_username(username)? else {
            return Ok(None);
        };

        if !password::verify(password, &user.password_hash, &user.password_salt) {
            return Ok(None);
        }

        Ok(Some(user))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users u WHERE u.username = ?1", USER_COLUMNS);
            let row = conn
                .query_row(&sql, [username], |row| UserRow::from_row(row, 0))
                .optional()?;
            Ok(row)
        })
    }

    /// Inserts a batch of users sharing one password, in one transaction.
    /// Returns the stored rows in input order.
    pub fn register_many(&self, new_users: Vec<NewUser>, password: &str) -> Result<Vec<UserRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut stored = Vec::with_capacity(new_users.len());
            for new_user in new_users {
                let mut user = user_with_password(new_user, password);
                user.id = user.insert(&tx)?;
                stored.push(user);
            }
            tx.commit()?;
            Ok(stored)
        })
    }
}

fn user_with_password(new_user: NewUser, password: &str) -> UserRow {
    let digest = password::hash(password);
    let now = Utc::now();

    let known_as = if new_user.known_as.is_empty() {
        new_user.username.clone()
    } else {
        new_user.known_as
    };

    UserRow {
        id: 0,
        username: new_user.username,
        password_hash: digest.hash,
        password_salt: digest.salt,
        gender: new_user.gender,
        date_of_birth: new_user.date_of_birth,
        known_as,
        created: new_user.created.unwrap_or(now),
        last_active: new_user.last_active.unwrap_or(now),
        introduction: new_user.introduction,
        looking_for: new_user.looking_for,
        interests: new_user.interests,
        city: new_user.city,
        country: new_user.country,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> NewUser {
        NewUser {
            username: "ann".into(),
            gender: "female".into(),
            ..Default::default()
        }
    }

    #[test]
    fn register_then_login() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.user_exists("ann").unwrap());

        let user = db.register(ann(), "pass1").unwrap();
        assert!(user.id > 0);
        assert_eq!(user.known_as, "ann");
        assert!(db.user_exists("ann").unwrap());

        let logged_in = db.login("ann", "pass1").unwrap().expect("valid credentials");
        assert_eq!(logged_in.id, user.id);
        assert_eq!(logged_in.password_hash, user.password_hash);
    }

    #[test]
    fn login_rejects_bad_credentials() {
        let db = Database::open_in_memory().unwrap();
        db.register(ann(), "pass1").unwrap();

        assert!(db.login("ann", "wrong").unwrap().is_none());
        assert!(db.login("bob", "pass1").unwrap().is_none());
    }

    #[test]
    fn usernames_are_unique() {
        let db = Database::open_in_memory().unwrap();
        db.register(ann(), "pass1").unwrap();
        assert!(db.register(ann(), "pass2").is_err());
    }
}
