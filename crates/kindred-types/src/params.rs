//! Query-string parameter objects for the paged list endpoints.

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_MIN_AGE: u32 = 18;
pub const DEFAULT_MAX_AGE: u32 = 99;

/// `GET /api/users?pageNumber=&pageSize=&gender=&minAge=&maxAge=&orderBy=&likers=&likees=`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserParams {
    pub page_number: u32,
    pub page_size: u32,
    pub gender: Option<String>,
    pub min_age: u32,
    pub max_age: u32,
    pub order_by: Option<String>,
    pub likers: bool,
    pub likees: bool,
}

impl Default for UserParams {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            gender: None,
            min_age: DEFAULT_MIN_AGE,
            max_age: DEFAULT_MAX_AGE,
            order_by: None,
            likers: false,
            likees: false,
        }
    }
}

/// `GET /api/users/{id}/messages?pageNumber=&pageSize=&messageContainer=`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageParams {
    pub page_number: u32,
    pub page_size: u32,
    pub message_container: Option<String>,
}

impl Default for MessageParams {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            message_container: None,
        }
    }
}
