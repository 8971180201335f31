//! On-disk token persistence between CLI runs
//! Author: kartik4091
//! Created: 2025-06-14

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::auth::TokenSet;
use crate::error::{AuthError, Result};

/// JSON file holding one [`TokenSet`]
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when nobody has logged in yet
    pub async fn load(&self) -> Result<Option<TokenSet>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let token = serde_json::from_str(&content)
            .map_err(|e| AuthError::Store(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(token))
    }

    pub async fn save(&self, token: &TokenSet) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, content).await?;
        debug!("Token saved to {}", self.path.display());
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[tokio::test]
    async fn round_trips_and_clears() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        assert!(store.load().await.unwrap().is_none());

        let token = TokenSet {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            token_type: "Bearer".into(),
            expires_at: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            scope: Some("https://www.googleapis.com/auth/drive.file".into()),
        };
        store.save(&token).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(token));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_a_store_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        let err = TokenStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, crate::error::Error::AuthError(AuthError::Store(_))));
    }
}
