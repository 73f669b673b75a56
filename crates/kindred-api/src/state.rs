use std::sync::Arc;

use kindred_db::Database;

use crate::error::ApiError;
use crate::media::MediaHost;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub media: Arc<dyn MediaHost>,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenService, media: Arc<dyn MediaHost>) -> AppState {
        Arc::new(Self { db, tokens, media })
    }
}

/// Runs a store call off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(ApiError::Internal)
}
