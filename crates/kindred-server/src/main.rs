mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderName;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use kindred_api::PAGINATION;
use kindred_api::error::APPLICATION_ERROR;
use kindred_api::media::{CloudinaryHost, MediaHost, UnconfiguredHost};
use kindred_api::state::AppStateInner;
use kindred_api::token::TokenService;
use kindred_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindred=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;
    if let Some(seed_file) = &config.seed_file {
        kindred_db::seed::seed_users(&db, seed_file)?;
    }

    let media: Arc<dyn MediaHost> = match config.cloudinary.clone() {
        Some(credentials) => {
            info!("Media host: cloudinary ({})", credentials.cloud_name);
            Arc::new(CloudinaryHost::new(credentials))
        }
        None => {
            warn!("CLOUDINARY_* not set; photo uploads will fail");
            Arc::new(UnconfiguredHost)
        }
    };

    let state = AppStateInner::new(db, TokenService::new(&config.token_key), media);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any())
        .expose_headers([PAGINATION, APPLICATION_ERROR, HeaderName::from_static("location")]);

    // Unknown non-API paths fall through to the SPA shell.
    let index = config.static_dir.join("index.html");
    let spa = ServeDir::new(&config.static_dir).fallback(ServeFile::new(index));

    let app = kindred_api::router(state)
        .fallback_service(spa)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Kindred server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
