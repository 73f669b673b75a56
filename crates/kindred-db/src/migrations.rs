use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT NOT NULL UNIQUE,
            password_hash   BLOB NOT NULL,
            password_salt   BLOB NOT NULL,
            gender          TEXT NOT NULL DEFAULT '',
            date_of_birth   TEXT,
            known_as        TEXT NOT NULL DEFAULT '',
            created         TEXT NOT NULL,
            last_active     TEXT NOT NULL,
            introduction    TEXT NOT NULL DEFAULT '',
            looking_for     TEXT NOT NULL DEFAULT '',
            interests       TEXT NOT NULL DEFAULT '',
            city            TEXT NOT NULL DEFAULT '',
            country         TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS photos (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            url         TEXT NOT NULL,
            public_id   TEXT,
            description TEXT NOT NULL DEFAULT '',
            date_added  TEXT NOT NULL,
            is_main     INTEGER NOT NULL DEFAULT 0,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_photos_user
            ON photos(user_id);

        CREATE TABLE IF NOT EXISTS likes (
            liker_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
            likee_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
            PRIMARY KEY (liker_id, likee_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_likee
            ON likes(likee_id);

        CREATE TABLE IF NOT EXISTS messages (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id           INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
            recipient_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
            content             TEXT NOT NULL,
            is_read             INTEGER NOT NULL DEFAULT 0,
            message_read_time   TEXT,
            message_sent_time   TEXT NOT NULL,
            sender_deleted      INTEGER NOT NULL DEFAULT 0,
            recipient_deleted   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient_id, message_sent_time);

        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id, message_sent_time);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
