//! Staged writes. Handlers collect inserts, updates and removals in a
//! [`ChangeSet`] and commit them together with [`Database::save_all`].

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, params};

use crate::Database;
use crate::models::{LikeRow, MessageRow, PhotoRow, UserRow};

/// A row type that knows how to write itself.
pub trait Persist: Send {
    /// Inserts the row, ignoring any id it carries, and returns the id the
    /// store assigned.
    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64>;
    fn update(&self, conn: &Connection) -> rusqlite::Result<usize>;
    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize>;
}

enum Op {
    Add(Box<dyn Persist>),
    Update(Box<dyn Persist>),
    Delete(Box<dyn Persist>),
}

/// Handle to a staged insert, used to look up its id after saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Staged(usize);

#[derive(Default)]
pub struct ChangeSet {
    ops: Vec<Op>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: Persist + 'static>(&mut self, record: T) -> Staged {
        self.ops.push(Op::Add(Box::new(record)));
        Staged(self.ops.len() - 1)
    }

    pub fn update<T: Persist + 'static>(&mut self, record: T) {
        self.ops.push(Op::Update(Box::new(record)));
    }

    pub fn delete<T: Persist + 'static>(&mut self, record: T) {
        self.ops.push(Op::Delete(Box::new(record)));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Outcome of a committed [`ChangeSet`].
#[derive(Debug, Default)]
pub struct Saved {
    affected: usize,
    inserted: HashMap<Staged, i64>,
}

impl Saved {
    /// True iff at least one row was written.
    pub fn any(&self) -> bool {
        self.affected > 0
    }

    pub fn affected(&self) -> usize {
        self.affected
    }

    pub fn id(&self, staged: Staged) -> Option<i64> {
        self.inserted.get(&staged).copied()
    }
}

impl Database {
    /// Commits every staged change in one transaction. Any failure rolls the
    /// whole set back.
    pub fn save_all(&self, changes: ChangeSet) -> Result<Saved> {
        if changes.is_empty() {
            return Ok(Saved::default());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut saved = Saved::default();

            for (idx, op) in changes.ops.iter().enumerate() {
                match op {
                    Op::Add(record) => {
                        let id = record.insert(&tx)?;
                        saved.inserted.insert(Staged(idx), id);
                        saved.affected += 1;
                    }
                    Op::Update(record) => saved.affected += record.update(&tx)?,
                    Op::Delete(record) => saved.affected += record.delete(&tx)?,
                }
            }

            tx.commit()?;
            Ok(saved)
        })
    }
}

// -- Row persistence --

impl Persist for UserRow {
    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO users (username, password_hash, password_salt, gender, date_of_birth,
                known_as, created, last_active, introduction, looking_for, interests, city, country)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                self.username,
                self.password_hash,
                self.password_salt,
                self.gender,
                self.date_of_birth,
                self.known_as,
                self.created,
                self.last_active,
                self.introduction,
                self.looking_for,
                self.interests,
                self.city,
                self.country,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE users SET gender = ?2, date_of_birth = ?3, known_as = ?4, last_active = ?5,
                introduction = ?6, looking_for = ?7, interests = ?8, city = ?9, country = ?10
             WHERE id = ?1",
            params![
                self.id,
                self.gender,
                self.date_of_birth,
                self.known_as,
                self.last_active,
                self.introduction,
                self.looking_for,
                self.interests,
                self.city,
                self.country,
            ],
        )
    }

    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute("DELETE FROM users WHERE id = ?1", [self.id])
    }
}

impl Persist for PhotoRow {
    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO photos (url, public_id, description, date_added, is_main, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.url,
                self.public_id,
                self.description,
                self.date_added,
                self.is_main,
                self.user_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE photos SET url = ?2, public_id = ?3, description = ?4, is_main = ?5
             WHERE id = ?1",
            params![self.id, self.url, self.public_id, self.description, self.is_main],
        )
    }

    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute("DELETE FROM photos WHERE id = ?1", [self.id])
    }
}

impl Persist for LikeRow {
    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO likes (liker_id, likee_id) VALUES (?1, ?2)",
            [self.liker_id, self.likee_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // Likes are keyed by their only two columns; nothing to update.
    fn update(&self, _conn: &Connection) -> rusqlite::Result<usize> {
        Ok(0)
    }

    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "DELETE FROM likes WHERE liker_id = ?1 AND likee_id = ?2",
            [self.liker_id, self.likee_id],
        )
    }
}

impl Persist for MessageRow {
    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO messages (sender_id, recipient_id, content, is_read, message_read_time,
                message_sent_time, sender_deleted, recipient_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.sender_id,
                self.recipient_id,
                self.content,
                self.is_read,
                self.message_read_time,
                self.message_sent_time,
                self.sender_deleted,
                self.recipient_deleted,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE messages SET content = ?2, is_read = ?3, message_read_time = ?4,
                sender_deleted = ?5, recipient_deleted = ?6
             WHERE id = ?1",
            params![
                self.id,
                self.content,
                self.is_read,
                self.message_read_time,
                self.sender_deleted,
                self.recipient_deleted,
            ],
        )
    }

    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute("DELETE FROM messages WHERE id = ?1", [self.id])
    }
}
