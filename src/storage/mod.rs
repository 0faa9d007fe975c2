// Local photo store
//
// Layout: {photos_dir}/{employee_name}_{employee_id}/{pose}.jpg

pub mod photo;

use crate::types::{AppError, AppResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

pub const PHOTO_EXTENSION: &str = "jpg";

/// Employee identity, materialized on disk only as a directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeKey {
    pub name: String,
    pub id: String,
}

impl EmployeeKey {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// Directory name used both locally and on Drive
    pub fn folder_name(&self) -> String {
        format!("{}_{}", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeSummary {
    pub name: String,
    pub photo_count: usize,
}

#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn employee_dir(&self, employee: &EmployeeKey) -> AppResult<PathBuf> {
        validate_component("employee_name", &employee.name)?;
        validate_component("employee_id", &employee.id)?;
        Ok(self.root.join(employee.folder_name()))
    }

    pub fn photo_path(&self, employee: &EmployeeKey, pose: &str) -> AppResult<PathBuf> {
        // An empty pose would produce a hidden `.jpg` that listings skip
        if pose.is_empty() {
            return Err(AppError::InvalidRequest("Invalid pose: \"\"".to_string()));
        }
        validate_component("pose", pose)?;
        Ok(self
            .employee_dir(employee)?
            .join(format!("{}.{}", pose, PHOTO_EXTENSION)))
    }

    /// Decode a data-URL photo and store it as `{pose}.jpg`, replacing any
    /// earlier capture of the same pose.
    pub async fn save_photo(
        &self,
        employee: &EmployeeKey,
        pose: &str,
        data_url: &str,
    ) -> AppResult<PathBuf> {
        let path = self.photo_path(employee, pose)?;

        let data_url = data_url.to_string();
        let jpeg = tokio::task::spawn_blocking(move || {
            let raw = photo::decode_data_url(&data_url)?;
            photo::encode_jpeg(&raw)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Photo encoder task failed: {}", e)))??;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &jpeg).await?;

        info!(path = %path.display(), bytes = jpeg.len(), "Saved photo");
        Ok(path)
    }

    /// Every employee directory in the store, sorted by name.
    /// A missing store is treated as empty.
    pub async fn employee_dirs(&self) -> AppResult<Vec<PathBuf>> {
        if !fs::try_exists(&self.root).await? {
            debug!(root = %self.root.display(), "Photo store does not exist yet");
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if metadata(&path).await.is_some_and(|m| m.is_dir()) {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// The `.jpg` files directly inside `dir`, sorted by file name
    pub async fn photos_in(dir: &Path) -> AppResult<Vec<PathBuf>> {
        let mut photos = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_jpg = path.extension().and_then(|e| e.to_str()) == Some(PHOTO_EXTENSION);
            if is_jpg && metadata(&path).await.is_some_and(|m| m.is_file()) {
                photos.push(path);
            }
        }
        photos.sort();
        Ok(photos)
    }

    pub async fn list_employees(&self) -> AppResult<Vec<EmployeeSummary>> {
        let mut employees = Vec::new();
        for dir in self.employee_dirs().await? {
            let photo_count = Self::photos_in(&dir).await?.len();
            employees.push(EmployeeSummary {
                name: dir_name(&dir),
                photo_count,
            });
        }
        Ok(employees)
    }

    /// Directory holding one employee's session, if it exists
    pub async fn session_dir(&self, employee: &EmployeeKey) -> AppResult<PathBuf> {
        let dir = self.employee_dir(employee)?;
        if fs::try_exists(&dir).await? && fs::metadata(&dir).await?.is_dir() {
            Ok(dir)
        } else {
            Err(AppError::NotFound("No photos found for this employee".to_string()))
        }
    }
}

pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Metadata with symlinks followed; `None` for dangling links
async fn metadata(path: &Path) -> Option<std::fs::Metadata> {
    match fs::metadata(path).await {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            debug!(path = %path.display(), "Skipping unreadable entry: {}", e);
            None
        }
    }
}

/// Components are joined as `{name}_{id}` and `{pose}.jpg`, so only
/// separators and NUL can escape the store
fn validate_component(field: &str, value: &str) -> AppResult<()> {
    if value.contains(['/', '\\', '\0']) {
        return Err(AppError::InvalidRequest(format!(
            "Invalid {}: {:?}",
            field, value
        )));
    }
    Ok(())
}
