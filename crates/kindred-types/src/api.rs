use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Bearer token claims. `nameid` carries the user id, `unique_name` the
/// lowercased username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub nameid: i64,
    pub unique_name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub gender: Option<String>,
    pub known_as: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(rename = "tokenString")]
    pub token: String,
    pub user: UserForList,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForList {
    pub id: i64,
    pub username: String,
    pub gender: String,
    pub age: Option<u32>,
    pub known_as: String,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub city: String,
    pub country: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForDetail {
    pub id: i64,
    pub username: String,
    pub gender: String,
    pub age: Option<u32>,
    pub known_as: String,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub introduction: String,
    pub looking_for: String,
    pub interests: String,
    pub city: String,
    pub country: String,
    pub photo_url: Option<String>,
    pub photos: Vec<PhotoForDetail>,
}

/// Profile fields a user may edit. Absent fields are cleared, matching a
/// full-form submit from the client.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserForUpdate {
    pub introduction: String,
    pub looking_for: String,
    pub interests: String,
    pub city: String,
    pub country: String,
}

// -- Photos --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoForDetail {
    pub id: i64,
    pub url: String,
    pub description: String,
    pub date_added: DateTime<Utc>,
    pub is_main: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoForReturn {
    pub id: i64,
    pub url: String,
    pub description: String,
    pub date_added: DateTime<Utc>,
    pub is_main: bool,
    pub public_id: Option<String>,
}

// -- Messages --

/// Clients may also send `senderId` and `messageSentTime`; the server
/// sets both itself, so they are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageForCreation {
    pub recipient_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageForReturn {
    pub id: i64,
    pub sender_id: i64,
    pub sender_known_as: String,
    pub sender_photo_url: Option<String>,
    pub recipient_id: i64,
    pub recipient_known_as: String,
    pub recipient_photo_url: Option<String>,
    pub content: String,
    pub is_read: bool,
    pub message_read_time: Option<DateTime<Utc>>,
    pub message_sent_time: DateTime<Utc>,
}

// -- Pagination --

/// Value of the `Pagination` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationHeader {
    pub current_page: u32,
    pub items_per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}
