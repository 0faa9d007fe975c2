//! Google Drive API Routes
//!
//! - POST /api/authenticate-gdrive - Connect (cached token, refresh, or consent flow)
//! - POST /api/upload-to-gdrive - Mirror every employee folder
//! - POST /api/upload-session - Mirror one employee's session

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use crate::drive::{self, AuthOutcome, GoogleDriveClient};
use crate::models::{
    AppState, AuthResponse, DriveUploadRequest, SessionUploadRequest, SyncResponse,
};
use crate::storage::EmployeeKey;
use crate::types::{ApiJson, AppError, AppResult};
use std::sync::Arc;
use tracing::{error, info};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/authenticate-gdrive", post(authenticate))
        .route("/api/upload-to-gdrive", post(upload_all))
        .route("/api/upload-session", post(upload_session))
        .with_state(state)
}

/// POST /api/authenticate-gdrive
async fn authenticate(State(state): State<AppState>) -> impl IntoResponse {
    match state.auth.authenticate().await {
        Ok(AuthOutcome::Connected(token)) => {
            let client = GoogleDriveClient::new(state.auth.clone(), token);
            state.drive.connect(Arc::new(client)).await;
            info!("Connected to Google Drive");
            (
                StatusCode::OK,
                Json(AuthResponse {
                    success: true,
                    message: "Connected to Google Drive".to_string(),
                }),
            )
                .into_response()
        }
        Ok(AuthOutcome::MissingCredentials) => (
            StatusCode::OK,
            Json(AuthResponse {
                success: false,
                message: "Please upload credentials.json first".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Google Drive authentication failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// POST /api/upload-to-gdrive - Upload all photos under one root folder
///
/// The connection check comes before the body is looked at, so an
/// unauthenticated caller always gets 401.
async fn upload_all(
    State(state): State<AppState>,
    body: Result<ApiJson<DriveUploadRequest>, AppError>,
) -> AppResult<Json<SyncResponse>> {
    let client = state.drive.require().await?;
    let ApiJson(request) = body?;
    let root_folder = request
        .folder_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| state.config.drive.root_folder.clone());

    let report = drive::sync_all(client.as_ref(), &state.store, &root_folder).await?;

    Ok(Json(SyncResponse {
        success: true,
        message: format!("Uploaded {} photos to Google Drive", report.uploaded),
        folder_id: report.folder_id,
    }))
}

/// POST /api/upload-session - Upload one employee's photos
async fn upload_session(
    State(state): State<AppState>,
    body: Result<ApiJson<SessionUploadRequest>, AppError>,
) -> AppResult<Json<SyncResponse>> {
    let client = state.drive.require().await?;
    let ApiJson(request) = body?;
    let employee = EmployeeKey::new(request.employee_name, request.employee_id);

    let report = drive::sync_session(
        client.as_ref(),
        &state.store,
        &state.config.drive.root_folder,
        &employee,
    )
    .await?;

    Ok(Json(SyncResponse {
        success: true,
        message: format!("Uploaded {} photos to Google Drive", report.uploaded),
        folder_id: report.folder_id,
    }))
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::drive::testing::MemoryDrive;
    use crate::drive::StoredToken;
    use crate::models::AppState;
    use crate::routes::test_support::{post_empty, post_json};
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn seeded_state(temp_dir: &TempDir) -> AppState {
        let photos = temp_dir.path().join("photos");
        for (dir, poses) in [("Alice_1", vec!["front", "left"]), ("Bob_2", vec!["front"])] {
            std::fs::create_dir_all(photos.join(dir)).unwrap();
            for pose in poses {
                std::fs::write(photos.join(dir).join(format!("{}.jpg", pose)), b"jpeg").unwrap();
            }
        }
        AppState::new(Config::with_base_dir(temp_dir.path()))
    }

    #[tokio::test]
    async fn test_sync_before_authentication_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);

        for (uri, body) in [
            ("/api/upload-to-gdrive", json!({ "folder_name": "Booth" })),
            ("/api/upload-session", json!({ "employee_name": "Alice", "employee_id": "1" })),
        ] {
            let (status, body) = post_json(crate::create_router(state.clone()), uri, body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Not connected to Google Drive. Authenticate first.");
        }
        assert!(!state.drive.is_connected().await);
    }

    #[tokio::test]
    async fn test_bodyless_sync_before_authentication_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);

        for uri in ["/api/upload-to-gdrive", "/api/upload-session"] {
            let (status, body) = post_empty(crate::create_router(state.clone()), uri).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["error"], "Not connected to Google Drive. Authenticate first.");
        }
    }

    #[tokio::test]
    async fn test_malformed_sync_body_is_json_error() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);
        let drive = Arc::new(MemoryDrive::default());
        state.drive.connect(drive.clone()).await;

        let (status, body) =
            post_empty(crate::create_router(state.clone()), "/api/upload-to-gdrive").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Content-Type"));

        let (status, body) = post_json(
            crate::create_router(state),
            "/api/upload-session",
            json!({ "employee_name": null, "employee_id": "1" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(drive.folders().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_upload() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);
        let drive = Arc::new(MemoryDrive::default());
        state.drive.connect(drive.clone()).await;

        let (status, body) = post_json(
            crate::create_router(state),
            "/api/upload-to-gdrive",
            json!({ "folder_name": "Booth" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "Uploaded 3 photos to Google Drive",
                "folder_id": "folder-1"
            })
        );
        assert_eq!(drive.folders()[0].name, "Booth");
        assert_eq!(drive.uploads().len(), 3);
    }

    #[tokio::test]
    async fn test_bulk_upload_default_folder_name() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);
        let drive = Arc::new(MemoryDrive::default());
        state.drive.connect(drive.clone()).await;

        let (status, _) =
            post_json(crate::create_router(state), "/api/upload-to-gdrive", json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(drive.folders()[0].name, "Employee Photos");
    }

    #[tokio::test]
    async fn test_session_upload() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);
        let drive = Arc::new(MemoryDrive::default());
        state.drive.connect(drive.clone()).await;

        let (status, body) = post_json(
            crate::create_router(state),
            "/api/upload-session",
            json!({ "employee_name": "Alice", "employee_id": "1" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Uploaded 2 photos to Google Drive");
        assert_eq!(body["folder_id"], "folder-2");
        assert!(drive.uploads().iter().all(|u| u.parent == "folder-2"));
    }

    #[tokio::test]
    async fn test_session_upload_unknown_employee() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);
        let drive = Arc::new(MemoryDrive::default());
        state.drive.connect(drive.clone()).await;

        let (status, body) = post_json(
            crate::create_router(state),
            "/api/upload-session",
            json!({ "employee_name": "Ghost", "employee_id": "404" }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No photos found for this employee");
        assert!(drive.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_without_credentials() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);

        let app = crate::create_router(state.clone());
        let (status, body) = post_json(app, "/api/authenticate-gdrive", json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": false, "message": "Please upload credentials.json first" })
        );
        assert!(!state.drive.is_connected().await);
    }

    #[tokio::test]
    async fn test_authenticate_with_cached_token() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state(&temp_dir);
        StoredToken {
            token: Some("ya29.cached".to_string()),
            refresh_token: Some("1//r".to_string()),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec![],
            expiry: Some(Utc::now() + Duration::hours(1)),
        }
        .save(&temp_dir.path().join("token.json"))
        .await
        .unwrap();

        let app = crate::create_router(state.clone());
        let (status, body) = post_json(app, "/api/authenticate-gdrive", json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "Connected to Google Drive" }));
        assert!(state.drive.is_connected().await);
    }
}
