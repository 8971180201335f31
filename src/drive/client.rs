//! Drive v3 REST client
//! Author: kartik4091
//! Created: 2025-06-14

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use super::{DriveFile, FileLister, FileSink, StoredFile, PDF_MIME};
use crate::config::DriveConfig;
use crate::error::{DriveError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const LIST_FIELDS: &str = "files(id, name, webViewLink, createdTime)";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Authenticated client for one access token
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: Client,
    api_base: String,
    upload_base: String,
    access_token: String,
}

impl DriveClient {
    pub fn new(config: &DriveConfig, access_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(DriveError::Request)?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Folder query for PDFs that are not in the trash
    pub fn folder_query(folder_id: &str) -> String {
        let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
        format!("'{}' in parents and mimeType='{}' and trashed=false", escaped, PDF_MIME)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.map_err(DriveError::Request)?;
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);
        Err(DriveError::Api { status: status.as_u16(), message }.into())
    }
}

/// Body of a `multipart/related` upload: JSON metadata, then the media
fn multipart_related(boundary: &str, metadata: &serde_json::Value, mime_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl FileSink for DriveClient {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, name: &str, folder_id: &str, mime_type: &str, bytes: Vec<u8>) -> Result<StoredFile> {
        let boundary = format!("linkstrip-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({ "name": name, "parents": [folder_id] });
        let body = multipart_related(&boundary, &metadata, mime_type, &bytes);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .query(&[("uploadType", "multipart"), ("supportsAllDrives", "true"), ("fields", "id")])
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, format!("multipart/related; boundary={}", boundary))
            .body(body)
            .send()
            .await
            .map_err(DriveError::Request)?;

        let stored: StoredFile = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Response(e.to_string()))?;
        info!("☁️ Uploaded {} as {}", name, stored.id);
        Ok(stored)
    }
}

#[async_trait]
impl FileLister for DriveClient {
    #[instrument(skip(self))]
    async fn list_recent(&self, folder_id: &str, limit: u32) -> Result<Vec<DriveFile>> {
        let page_size = limit.to_string();
        let query = Self::folder_query(folder_id);
        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .query(&[
                ("q", query.as_str()),
                ("orderBy", "createdTime desc"),
                ("pageSize", page_size.as_str()),
                ("fields", LIST_FIELDS),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(DriveError::Request)?;

        let list: FileList = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Response(e.to_string()))?;
        debug!("Listed {} files in folder {}", list.files.len(), folder_id);
        Ok(list.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use mockito::Matcher;

    fn config(base: &str) -> DriveConfig {
        DriveConfig {
            folder_id: "folder-1".into(),
            api_base: base.to_string(),
            upload_base: format!("{}/upload", base),
            ..DriveConfig::default()
        }
    }

    #[test]
    fn folder_query_escapes_quotes() {
        assert_eq!(
            DriveClient::folder_query("ab'c"),
            "'ab\\'c' in parents and mimeType='application/pdf' and trashed=false"
        );
    }

    #[test]
    fn multipart_body_has_metadata_then_media() {
        let body = multipart_related("b0", &json!({"name": "a.pdf"}), PDF_MIME, b"%PDF-1.4");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b0\r\nContent-Type: application/json"));
        let meta = text.find("\"name\":\"a.pdf\"").unwrap();
        let media = text.find("%PDF-1.4").unwrap();
        assert!(meta < media);
        assert!(text.ends_with("\r\n--b0--\r\n"));
    }

    #[tokio::test]
    async fn upload_posts_multipart_to_shared_drive() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "multipart".into()),
                Matcher::UrlEncoded("supportsAllDrives".into(), "true".into()),
                Matcher::UrlEncoded("fields".into(), "id".into()),
            ]))
            .match_header("authorization", "Bearer token-1")
            .match_header("content-type", Matcher::Regex("^multipart/related; boundary=".into()))
            .match_body(Matcher::Regex("\"parents\":\\[\"folder-1\"\\]".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "file-42"}"#)
            .create_async()
            .await;

        let client = DriveClient::new(&config(&server.url()), "token-1").unwrap();
        let stored = client.upload("a.pdf", "folder-1", PDF_MIME, b"%PDF-1.4".to_vec()).await.unwrap();

        assert_eq!(stored.id, "file-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_recent_parses_files() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "q".into(),
                    "'folder-1' in parents and mimeType='application/pdf' and trashed=false".into(),
                ),
                Matcher::UrlEncoded("orderBy".into(), "createdTime desc".into()),
                Matcher::UrlEncoded("pageSize".into(), "10".into()),
                Matcher::UrlEncoded("includeItemsFromAllDrives".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"files": [{"id": "1", "name": "surat.pdf",
                    "webViewLink": "https://drive.google.com/file/d/1/view",
                    "createdTime": "2025-06-14T03:04:05.000Z"}]}"#,
            )
            .create_async()
            .await;

        let client = DriveClient::new(&config(&server.url()), "token-1").unwrap();
        let files = client.list_recent("folder-1", 10).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "surat.pdf");
        assert_eq!(files[0].created_time.to_rfc3339(), "2025-06-14T03:04:05+00:00");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error": {"code": 404, "message": "File not found: folder-1."}}"#)
            .create_async()
            .await;

        let client = DriveClient::new(&config(&server.url()), "token-1").unwrap();
        let err = client.list_recent("folder-1", 10).await.unwrap_err();
        match err {
            Error::DriveError(DriveError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found: folder-1.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
