//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/upload-photo`, `/api/employees` - Local photo store
//! - `/api/authenticate-gdrive`, `/api/upload-to-gdrive`, `/api/upload-session` - Google Drive
//! - `/api/health` - Health checks
//! - `/` - Static file serving (capture page)

pub mod drive;
pub mod health;
pub mod photos;
pub mod static_files;

use axum::Router;
use crate::middleware::cors_layer;
use crate::models::AppState;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the main application router
///
/// API routes take precedence over static files.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);
    let static_dir = state.config.server.static_dir.clone();

    let api_router = Router::new()
        .merge(photos::router(state.clone()))
        .merge(drive::router(state.clone()))
        .merge(health::router(state));

    Router::new()
        .merge(api_router)
        .merge(static_files::router(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
