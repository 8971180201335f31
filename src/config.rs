//! Configuration types and validation for the pipeline
//! Author: kartik4091
//! Created: 2025-06-03

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::FillColor;

/// Label the tool was built to remove
pub const DEFAULT_TARGET_PHRASE: &str = "Link Disposisi";

/// Configuration for the per-document redaction core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub target_phrase: String,
    pub fill_color: FillColor,
    pub remove_overlapping_annotations: bool,
}

/// Destination folder and endpoints of the Drive API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub folder_id: String,
    pub api_base: String,
    pub upload_base: String,
    pub list_page_size: u32,
}

/// OAuth web client registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub project_id: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub token_path: PathBuf,
}

/// How listings are shown to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub utc_offset_hours: i32,
}

/// Top-level application config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sanitizer: SanitizerConfig,
    pub drive: DriveConfig,
    pub oauth: OAuthSettings,
    pub display: DisplayConfig,
}

// Defaults
impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            target_phrase: DEFAULT_TARGET_PHRASE.to_string(),
            fill_color: FillColor::WHITE,
            remove_overlapping_annotations: true,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
            list_page_size: 10,
        }
    }
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            project_id: None,
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            redirect_uri: "http://localhost:8080/".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
            token_path: PathBuf::from(".linkstrip-token.json"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { utc_offset_hours: 7 }
    }
}

impl SanitizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_phrase.trim().is_empty() {
            return Err(Error::ConfigError("Target phrase must not be empty".into()));
        }
        if !self.fill_color.is_valid() {
            return Err(Error::ConfigError("Fill color components must be within 0.0..=1.0".into()));
        }
        Ok(())
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.list_page_size) {
            return Err(Error::ConfigError("List page size must be between 1 and 100".into()));
        }
        Ok(())
    }

    /// Upload and listing need a destination folder; local sanitizing does not
    pub fn require_folder(&self) -> Result<&str> {
        if self.folder_id.trim().is_empty() {
            return Err(Error::ConfigError("drive.folder_id is not set".into()));
        }
        Ok(&self.folder_id)
    }
}

impl OAuthSettings {
    pub fn require_client(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::ConfigError("oauth.client_id is not set".into()));
        }
        Ok(())
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<()> {
        if !(-14..=14).contains(&self.utc_offset_hours) {
            return Err(Error::ConfigError("UTC offset must be within -14..=14 hours".into()));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Parses a config document, trying JSON first and YAML second
    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| Error::ConfigError(format!("Config parsing error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.sanitizer.validate()?;
        self.drive.validate()?;
        self.display.validate()?;
        Ok(())
    }
}
