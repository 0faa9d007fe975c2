// Mirror the local photo store onto Drive
//
// Remote folders are matched by name, not by a stored id. Lookup-or-create
// is not atomic: two concurrent syncs can both create the same folder.

use super::DriveAdapter;
use crate::storage::{dir_name, EmployeeKey, PhotoStore};
use crate::types::AppResult;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Root folder for a bulk sync, employee folder for a session sync
    pub folder_id: String,
    pub uploaded: usize,
}

/// Id of the folder called `name` under `parent_id`, creating it if absent
pub async fn ensure_folder(
    drive: &dyn DriveAdapter,
    name: &str,
    parent_id: Option<&str>,
) -> AppResult<String> {
    if let Some(id) = drive.find_folder(name, parent_id).await? {
        debug!(folder = name, %id, "Reusing existing Drive folder");
        return Ok(id);
    }

    let id = drive.create_folder(name, parent_id).await?;
    info!(folder = name, %id, "Created Drive folder");
    Ok(id)
}

/// Upload every `.jpg` in `dir` as a new file under `folder_id`
async fn upload_dir(drive: &dyn DriveAdapter, dir: &Path, folder_id: &str) -> AppResult<usize> {
    let mut uploaded = 0;
    for photo in PhotoStore::photos_in(dir).await? {
        let data = fs::read(&photo).await?;
        drive
            .upload_file(&dir_name(&photo), folder_id, mime::IMAGE_JPEG.as_ref(), data)
            .await?;
        uploaded += 1;
    }
    Ok(uploaded)
}

/// Mirror all employee directories under a root folder called `root_folder`
pub async fn sync_all(
    drive: &dyn DriveAdapter,
    store: &PhotoStore,
    root_folder: &str,
) -> AppResult<SyncReport> {
    let root_id = ensure_folder(drive, root_folder, None).await?;

    let mut uploaded = 0;
    for dir in store.employee_dirs().await? {
        let folder_id = ensure_folder(drive, &dir_name(&dir), Some(&root_id)).await?;
        uploaded += upload_dir(drive, &dir, &folder_id).await?;
    }

    info!(root = root_folder, uploaded, "Bulk Drive sync complete");
    Ok(SyncReport {
        folder_id: root_id,
        uploaded,
    })
}

/// Mirror one employee's session
///
/// Fails with `NotFound` before touching Drive if the employee has no
/// local directory.
pub async fn sync_session(
    drive: &dyn DriveAdapter,
    store: &PhotoStore,
    root_folder: &str,
    employee: &EmployeeKey,
) -> AppResult<SyncReport> {
    let local_dir = store.session_dir(employee).await?;

    let root_id = ensure_folder(drive, root_folder, None).await?;
    let folder_id = ensure_folder(drive, &employee.folder_name(), Some(&root_id)).await?;
    let uploaded = upload_dir(drive, &local_dir, &folder_id).await?;

    info!(employee = %employee.folder_name(), uploaded, "Session Drive sync complete");
    Ok(SyncReport { folder_id, uploaded })
}
