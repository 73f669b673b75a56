//! Database row types — these map directly to SQLite rows.
//! Distinct from kindred-types API models to keep the DB layer independent.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;

pub(crate) const USER_COLUMNS: &str = "u.id, u.username, u.password_hash, u.password_salt, u.gender, \
     u.date_of_birth, u.known_as, u.created, u.last_active, u.introduction, u.looking_for, \
     u.interests, u.city, u.country";

pub(crate) const PHOTO_COLUMNS: &str =
    "p.id, p.url, p.public_id, p.description, p.date_added, p.is_main, p.user_id";

pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.recipient_id, m.content, m.is_read, \
     m.message_read_time, m.message_sent_time, m.sender_deleted, m.recipient_deleted";

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    pub known_as: String,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub introduction: String,
    pub looking_for: String,
    pub interests: String,
    pub city: String,
    pub country: String,
}

impl UserRow {
    /// Reads the columns listed in `USER_COLUMNS`, starting at `offset`.
    pub(crate) fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            username: row.get(offset + 1)?,
            password_hash: row.get(offset + 2)?,
            password_salt: row.get(offset + 3)?,
            gender: row.get(offset + 4)?,
            date_of_birth: row.get(offset + 5)?,
            known_as: row.get(offset + 6)?,
            created: row.get(offset + 7)?,
            last_active: row.get(offset + 8)?,
            introduction: row.get(offset + 9)?,
            looking_for: row.get(offset + 10)?,
            interests: row.get(offset + 11)?,
            city: row.get(offset + 12)?,
            country: row.get(offset + 13)?,
        })
    }
}

/// Profile data for a user that does not exist yet. Credentials are added
/// by the auth repository.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    pub known_as: String,
    pub introduction: String,
    pub looking_for: String,
    pub interests: String,
    pub city: String,
    pub country: String,
    pub created: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct PhotoRow {
    pub id: i64,
    pub url: String,
    /// Media host deletion handle; `None` for seeded placeholder photos.
    pub public_id: Option<String>,
    pub description: String,
    pub date_added: DateTime<Utc>,
    pub is_main: bool,
    pub user_id: i64,
}

impl PhotoRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            public_id: row.get(2)?,
            description: row.get(3)?,
            date_added: row.get(4)?,
            is_main: row.get(5)?,
            user_id: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeRow {
    pub liker_id: i64,
    pub likee_id: i64,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub is_read: bool,
    pub message_read_time: Option<DateTime<Utc>>,
    pub message_sent_time: DateTime<Utc>,
    pub sender_deleted: bool,
    pub recipient_deleted: bool,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender_id: row.get(1)?,
            recipient_id: row.get(2)?,
            content: row.get(3)?,
            is_read: row.get(4)?,
            message_read_time: row.get(5)?,
            message_sent_time: row.get(6)?,
            sender_deleted: row.get(7)?,
            recipient_deleted: row.get(8)?,
        })
    }

    /// Sets the soft-delete flag for whichever side `user_id` is on.
    /// Returns false when the user is not a participant.
    pub fn mark_deleted_by(&mut self, user_id: i64) -> bool {
        let mut participant = false;
        if self.sender_id == user_id {
            self.sender_deleted = true;
            participant = true;
        }
        if self.recipient_id == user_id {
            self.recipient_deleted = true;
            participant = true;
        }
        participant
    }

    /// Both participants have hidden the message; the row can go.
    pub fn is_deleted_by_both(&self) -> bool {
        self.sender_deleted && self.recipient_deleted
    }
}

/// A user together with every photo they own.
#[derive(Debug, Clone)]
pub struct UserWithPhotos {
    pub user: UserRow,
    pub photos: Vec<PhotoRow>,
}

impl UserWithPhotos {
    pub fn main_photo(&self) -> Option<&PhotoRow> {
        self.photos.iter().find(|p| p.is_main)
    }

    pub fn main_photo_url(&self) -> Option<&str> {
        self.main_photo().map(|p| p.url.as_str())
    }
}

/// A message joined with the display fields of both participants.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub message: MessageRow,
    pub sender_known_as: String,
    pub sender_photo_url: Option<String>,
    pub recipient_known_as: String,
    pub recipient_photo_url: Option<String>,
}
