use crate::config::Config;
use crate::drive::{Authenticator, DriveHandle};
use crate::storage::{EmployeeSummary, PhotoStore};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: PhotoStore,
    pub drive: DriveHandle,
    pub auth: Authenticator,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            store: PhotoStore::new(config.storage.photos_dir.clone()),
            drive: DriveHandle::new(),
            auth: Authenticator::from_config(&config.drive),
            config,
        }
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn unknown_pose() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadPhotoRequest {
    #[serde(default = "unknown")]
    pub employee_name: String,
    #[serde(default = "unknown")]
    pub employee_id: String,
    /// Data URL (`data:image/...;base64,...`)
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default = "unknown_pose")]
    pub pose: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadPhotoResponse {
    pub success: bool,
    pub message: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveUploadRequest {
    pub folder_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUploadRequest {
    #[serde(default = "unknown")]
    pub employee_name: String,
    #[serde(default = "unknown")]
    pub employee_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub folder_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeesResponse {
    pub employees: Vec<EmployeeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub drive: String,
}
