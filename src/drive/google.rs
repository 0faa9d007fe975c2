// Google Drive v3 REST client
// API Reference: https://developers.google.com/drive/api/reference/rest/v3/files
//
// Only the three calls the mirror needs: files.list (folder lookup),
// files.create (folder), and files.create with uploadType=multipart (photo).

use super::auth::{Authenticator, StoredToken};
use super::DriveAdapter;
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

pub struct GoogleDriveClient {
    client: Client,
    auth: Authenticator,
    token: Mutex<StoredToken>,
    api_base: String,
    upload_base: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct DriveErrorResponse {
    error: DriveError,
}

#[derive(Deserialize)]
struct DriveError {
    message: String,
    code: Option<u16>,
}

impl GoogleDriveClient {
    pub fn new(auth: Authenticator, token: StoredToken) -> Self {
        Self {
            client: Client::new(),
            auth,
            token: Mutex::new(token),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }

    /// Point the client at a different host (used against a mock server in tests)
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
        self
    }

    /// Current access token, refreshing and persisting it first if it expired
    async fn access_token(&self) -> AppResult<String> {
        let mut token = self.token.lock().await;
        if !token.is_valid() && token.can_refresh() {
            let refreshed = self.auth.refresh(&token).await?;
            refreshed.save(self.auth.token_file()).await?;
            *token = refreshed;
        }
        token.token.clone().ok_or(AppError::NotAuthenticated)
    }

    async fn check(response: Response, action: &str) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        if let Ok(error_response) = serde_json::from_str::<DriveErrorResponse>(&error_text) {
            return Err(AppError::Drive(format!(
                "{} failed ({}): {} (code: {:?})",
                action, status, error_response.error.message, error_response.error.code
            )));
        }
        Err(AppError::Drive(format!("{} failed ({}): {}", action, status, error_text)))
    }

    async fn created_id(response: Response, action: &str) -> AppResult<String> {
        let file: DriveFile = Self::check(response, action)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to parse {} response: {}", action, e)))?;
        Ok(file.id)
    }
}

#[async_trait]
impl DriveAdapter for GoogleDriveClient {
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<String>> {
        let token = self.access_token().await?;
        let query = folder_query(name, parent_id);
        debug!(%query, "Looking up Drive folder");

        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
                ("pageSize", "1"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Drive(format!("Folder lookup request failed: {}", e)))?;

        let list: FileList = Self::check(response, "Folder lookup")
            .await?
            .json()
            .await
            .map_err(|e| {
                AppError::Drive(format!("Failed to parse folder lookup response: {}", e))
            })?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String> {
        let token = self.access_token().await?;
        let metadata = file_metadata(name, Some(FOLDER_MIME_TYPE), parent_id);

        let response = self
            .client
            .post(format!("{}/files", self.api_base))
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| AppError::Drive(format!("Folder create request failed: {}", e)))?;

        Self::created_id(response, "Folder create").await
    }

    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> AppResult<String> {
        let token = self.access_token().await?;
        let metadata = file_metadata(name, None, Some(parent_id));
        let boundary = random_boundary();
        let body = multipart_related(&boundary, &metadata, mime_type, &data);

        let response = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Drive(format!("Upload request failed: {}", e)))?;

        Self::created_id(response, "Upload").await
    }
}

/// Drive search query for a non-trashed folder by exact name
fn folder_query(name: &str, parent_id: Option<&str>) -> String {
    let mut query = format!(
        "name='{}' and mimeType='{}' and trashed=false",
        escape_query(name),
        FOLDER_MIME_TYPE
    );
    if let Some(parent) = parent_id {
        query.push_str(&format!(" and '{}' in parents", escape_query(parent)));
    }
    query
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn file_metadata(
    name: &str,
    mime_type: Option<&str>,
    parent_id: Option<&str>,
) -> serde_json::Value {
    let mut metadata = serde_json::json!({ "name": name });
    if let Some(mime_type) = mime_type {
        metadata["mimeType"] = mime_type.into();
    }
    if let Some(parent) = parent_id {
        metadata["parents"] = serde_json::json!([parent]);
    }
    metadata
}

fn random_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("photo_boundary_{}", suffix)
}

/// Body for Drive's `uploadType=multipart`: a JSON metadata part followed by the media part
fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
