use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use crate::models::{AppState, EmployeesResponse, UploadPhotoRequest, UploadPhotoResponse};
use crate::storage::EmployeeKey;
use crate::types::{ApiJson, AppError, AppResult};
use tracing::info;

// Full-resolution webcam frames arrive base64-encoded inside JSON
const MAX_PHOTO_PAYLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/upload-photo",
            post(upload_photo).layer(DefaultBodyLimit::max(MAX_PHOTO_PAYLOAD_BYTES)),
        )
        .route("/api/employees", get(list_employees))
        .with_state(state)
}

/// POST /api/upload-photo - Store one pose for an employee
async fn upload_photo(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UploadPhotoRequest>,
) -> AppResult<Json<UploadPhotoResponse>> {
    let photo = request
        .photo
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("No photo data".to_string()))?;

    let employee = EmployeeKey::new(request.employee_name, request.employee_id);
    info!(employee = %employee.folder_name(), pose = %request.pose, "Photo upload received");

    let path = state.store.save_photo(&employee, &request.pose, &photo).await?;

    Ok(Json(UploadPhotoResponse {
        success: true,
        message: format!("Photo saved for {}", employee.name),
        path: path.display().to_string(),
    }))
}

/// GET /api/employees - Employee directories with their photo counts
async fn list_employees(State(state): State<AppState>) -> AppResult<Json<EmployeesResponse>> {
    let employees = state.store.list_employees().await?;
    Ok(Json(EmployeesResponse { employees }))
}
