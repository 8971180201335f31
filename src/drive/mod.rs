//! Cloud storage collaborators: upload, listing and authorization
//! Author: kartik4091
//! Created: 2025-06-14

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod auth;
pub mod client;
pub mod token;

pub use auth::{OAuthFlow, TokenSet};
pub use client::DriveClient;
pub use token::TokenStore;

/// MIME type of everything this tool stores
pub const PDF_MIME: &str = "application/pdf";

/// Identifier of a file created by a [`FileSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
}

/// A file in the destination folder, as listed back to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: String,
    pub created_time: DateTime<Utc>,
}

/// Destination for sanitized documents
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn upload(&self, name: &str, folder_id: &str, mime_type: &str, bytes: Vec<u8>) -> Result<StoredFile>;
}

/// Source of the recent-files listing
#[async_trait]
pub trait FileLister: Send + Sync {
    /// Newest first, at most `limit` entries
    async fn list_recent(&self, folder_id: &str, limit: u32) -> Result<Vec<DriveFile>>;
}
