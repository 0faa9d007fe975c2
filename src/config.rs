use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub drive: DriveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Empty means any origin is allowed.
    pub cors_allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub photos_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub root_folder: String,
    pub redirect_port: u16,
    pub oauth_timeout_secs: u64,
}

pub const DEFAULT_ROOT_FOLDER: &str = "Employee Photos";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: parse_origins(
                    &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                static_dir: env::var("STATIC_DIR")
                    .unwrap_or_else(|_| "static".to_string())
                    .into(),
            },
            storage: StorageConfig {
                photos_dir: env::var("PHOTOS_DIR")
                    .unwrap_or_else(|_| "photos".to_string())
                    .into(),
            },
            drive: DriveConfig {
                credentials_file: env::var("GOOGLE_CREDENTIALS_FILE")
                    .unwrap_or_else(|_| "credentials.json".to_string())
                    .into(),
                token_file: env::var("GOOGLE_TOKEN_FILE")
                    .unwrap_or_else(|_| "token.json".to_string())
                    .into(),
                root_folder: env::var("DRIVE_ROOT_FOLDER")
                    .unwrap_or_else(|_| DEFAULT_ROOT_FOLDER.to_string()),
                redirect_port: env::var("OAUTH_REDIRECT_PORT")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()?,
                oauth_timeout_secs: env::var("OAUTH_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()?,
            },
        })
    }

    /// Configuration rooted in a single directory (useful for Docker/testing)
    pub fn with_base_dir(base_dir: &Path) -> Self {
        Self {
            server: ServerConfig {
                port: 5000,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: Vec::new(),
                static_dir: base_dir.join("static"),
            },
            storage: StorageConfig {
                photos_dir: base_dir.join("photos"),
            },
            drive: DriveConfig {
                credentials_file: base_dir.join("credentials.json"),
                token_file: base_dir.join("token.json"),
                root_folder: DEFAULT_ROOT_FOLDER.to_string(),
                redirect_port: 0,
                oauth_timeout_secs: 300,
            },
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "*")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert!(parse_origins("*").is_empty());
        assert_eq!(
            parse_origins("http://localhost:5000, http://kiosk.local"),
            vec!["http://localhost:5000", "http://kiosk.local"]
        );
    }

    #[test]
    fn test_with_base_dir() {
        let config = Config::with_base_dir(Path::new("/tmp/booth"));
        assert_eq!(config.storage.photos_dir, PathBuf::from("/tmp/booth/photos"));
        assert_eq!(config.drive.token_file, PathBuf::from("/tmp/booth/token.json"));
        assert_eq!(config.drive.root_folder, "Employee Photos");
    }
}
