//! Google Drive mirroring
//!
//! - `auth` - installed-app OAuth flow and the cached token file
//! - `google` - Drive v3 REST client
//! - `sync` - walks the local photo store and mirrors it remotely
//!
//! Handlers never talk to a global client. The connected client lives in a
//! [`DriveHandle`] carried by `AppState`, and every Drive call goes through
//! the [`DriveAdapter`] trait.

pub mod auth;
pub mod google;
pub mod sync;

use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use auth::{AuthOutcome, Authenticator, StoredToken};
pub use google::GoogleDriveClient;
pub use sync::{ensure_folder, sync_all, sync_session, SyncReport};

/// Folder/file operations needed to mirror the photo store
#[async_trait]
pub trait DriveAdapter: Send + Sync {
    /// Id of the first non-trashed folder called `name` (under `parent_id` when given)
    async fn find_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> AppResult<Option<String>>;

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String>;

    /// Always creates a new remote file, even if one with the same name exists
    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> AppResult<String>;
}

/// Shared slot for the connected Drive client
#[derive(Clone, Default)]
pub struct DriveHandle {
    inner: Arc<RwLock<Option<Arc<dyn DriveAdapter>>>>,
}

impl DriveHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, adapter: Arc<dyn DriveAdapter>) {
        *self.inner.write().await = Some(adapter);
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// The connected client, or `NotAuthenticated`
    pub async fn require(&self) -> AppResult<Arc<dyn DriveAdapter>> {
        self.inner
            .read()
            .await
            .clone()
            .ok_or(AppError::NotAuthenticated)
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory Drive used by sync and route tests

    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Folder {
        pub id: String,
        pub name: String,
        pub parent: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Upload {
        pub name: String,
        pub parent: String,
        pub size: usize,
    }

    #[derive(Default)]
    pub struct MemoryDrive {
        pub folders: Mutex<Vec<Folder>>,
        pub uploads: Mutex<Vec<Upload>>,
        pub fail_uploads: bool,
    }

    impl MemoryDrive {
        pub fn folders(&self) -> Vec<Folder> {
            self.folders.lock().unwrap().clone()
        }

        pub fn uploads(&self) -> Vec<Upload> {
            self.uploads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DriveAdapter for MemoryDrive {
        async fn find_folder(
            &self,
            name: &str,
            parent_id: Option<&str>,
        ) -> AppResult<Option<String>> {
            Ok(self
                .folders
                .lock()
                .unwrap()
                .iter()
                .find(|f| f.name == name && f.parent.as_deref() == parent_id)
                .map(|f| f.id.clone()))
        }

        async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String> {
            let mut folders = self.folders.lock().unwrap();
            let id = format!("folder-{}", folders.len() + 1);
            folders.push(Folder {
                id: id.clone(),
                name: name.to_string(),
                parent: parent_id.map(str::to_string),
            });
            Ok(id)
        }

        async fn upload_file(
            &self,
            name: &str,
            parent_id: &str,
            _mime_type: &str,
            data: Vec<u8>,
        ) -> AppResult<String> {
            if self.fail_uploads {
                return Err(AppError::Drive("quota exceeded".to_string()));
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(Upload {
                name: name.to_string(),
                parent: parent_id.to_string(),
                size: data.len(),
            });
            Ok(format!("file-{}", uploads.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryDrive;
    use super::*;

    #[tokio::test]
    async fn test_handle_starts_disconnected() {
        let handle = DriveHandle::new();
        assert!(!handle.is_connected().await);
        assert!(matches!(handle.require().await, Err(AppError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_handle_shared_between_clones() {
        let handle = DriveHandle::new();
        let clone = handle.clone();
        clone.connect(Arc::new(MemoryDrive::default())).await;
        assert!(handle.is_connected().await);
        assert!(handle.require().await.is_ok());
    }
}
