//! Writes sanitized documents into a local directory
//! Author: kartik4091
//! Created: 2025-06-15

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use crate::drive::{FileSink, StoredFile};
use crate::error::{Error, Result};

/// [`FileSink`] that stores each upload as `<dir>/<name>`
#[derive(Debug, Clone)]
pub struct LocalSink {
    dir: PathBuf,
    overwrite: bool,
}

impl LocalSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), overwrite: false }
    }

    pub fn overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target(&self, name: &str) -> Result<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| Error::ConfigError(format!("Invalid output file name: {:?}", name)))?;
        Ok(self.dir.join(file_name))
    }
}

#[async_trait]
impl FileSink for LocalSink {
    async fn upload(&self, name: &str, _folder_id: &str, _mime_type: &str, bytes: Vec<u8>) -> Result<StoredFile> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.target(name)?;

        if !self.overwrite {
            match fs::metadata(&path).await {
                Ok(_) => {
                    return Err(std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        format!("{} already exists (use --force to overwrite)", path.display()),
                    )
                    .into())
                }
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
                Err(_) => {}
            }
        }

        fs::write(&path, &bytes).await?;
        info!("💾 Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(StoredFile { id: path.display().to_string() })
    }
}
