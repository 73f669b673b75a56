//! Development seed: loads a JSON array of users into an empty database.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::changes::ChangeSet;
use crate::models::{NewUser, PhotoRow};
use crate::Database;

/// Every seeded account gets this password.
pub const SEED_PASSWORD: &str = "password";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SeedUser {
    #[serde(alias = "UserName")]
    username: String,
    #[serde(default)]
    gender: String,
    date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    known_as: String,
    created: Option<NaiveDate>,
    last_active: Option<NaiveDate>,
    #[serde(default)]
    introduction: String,
    #[serde(default)]
    looking_for: String,
    #[serde(default)]
    interests: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    photos: Vec<SeedPhoto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedPhoto {
    #[serde(alias = "Url")]
    url: String,
    #[serde(default, alias = "IsMain")]
    is_main: bool,
    #[serde(default, alias = "Description")]
    description: String,
}

/// Seeds users from `path` unless the database already has users.
/// Returns how many users were inserted.
pub fn seed_users(db: &Database, path: &Path) -> Result<usize> {
    let existing: i64 =
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))?;
    if existing > 0 {
        info!("Skipping seed: database already has {} users", existing);
        return Ok(0);
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let seed: Vec<SeedUser> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;

    let mut photos = Vec::with_capacity(seed.len());
    let new_users = seed
        .into_iter()
        .map(|user| {
            photos.push(user.photos);
            NewUser {
                username: user.username.to_lowercase(),
                gender: user.gender,
                date_of_birth: user.date_of_birth,
                known_as: user.known_as,
                introduction: user.introduction,
                looking_for: user.looking_for,
                interests: user.interests,
                city: user.city,
                country: user.country,
                created: user.created.map(|d| d.and_time(NaiveTime::MIN).and_utc()),
                last_active: user.last_active.map(|d| d.and_time(NaiveTime::MIN).and_utc()),
            }
        })
        .collect();

    let stored = db.register_many(new_users, SEED_PASSWORD)?;

    let now = Utc::now();
    let mut changes = ChangeSet::new();
    for (user, user_photos) in stored.iter().zip(photos) {
        // Keep the single-main invariant even if the file marks several.
        let main_idx = user_photos.iter().position(|p| p.is_main).unwrap_or(0);
        for (idx, photo) in user_photos.into_iter().enumerate() {
            changes.add(PhotoRow {
                id: 0,
                url: photo.url,
                public_id: None,
                description: photo.description,
                date_added: now,
                is_main: idx == main_idx,
                user_id: user.id,
            });
        }
    }
    db.save_all(changes)?;

    info!("Seeded {} users from {}", stored.len(), path.display());
    Ok(stored.len())
}
