//! Upload session state and the batch loop
//! Author: kartik4091
//! Created: 2025-06-15

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::drive::{FileSink, PDF_MIME};
use crate::error::{Error, Result};
use crate::pipeline::DocumentSanitizer;

/// Per-request state: which files were already handled in this session
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    processed: Vec<String>,
    seen: HashSet<String>,
    generation: u64,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processed(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn mark_processed(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.processed.push(name.to_string());
        }
    }

    /// Names in the order they were processed
    pub fn processed_names(&self) -> &[String] {
        &self.processed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Forgets processed names and starts a new upload generation
    pub fn reset(&mut self) {
        self.processed.clear();
        self.seen.clear();
        self.generation += 1;
        info!("🔄 Upload session reset (generation {})", self.generation);
    }
}

/// A document as handed in by the user
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::ConfigError(format!("Not a file path: {}", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }
}

/// One entry of a batch: a file that was read, or one that could not be read
#[derive(Debug)]
pub enum BatchItem {
    File(UploadedFile),
    Unreadable { name: String, error: Error },
}

impl BatchItem {
    /// Reads `path`; a read failure becomes an `Unreadable` entry
    pub async fn read(path: &Path) -> Self {
        match UploadedFile::from_path(path).await {
            Ok(file) => BatchItem::File(file),
            Err(error) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                BatchItem::Unreadable { name, error }
            }
        }
    }
}

impl From<UploadedFile> for BatchItem {
    fn from(file: UploadedFile) -> Self {
        BatchItem::File(file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Label removed, document stored
    Redacted { regions: usize, annotations_removed: usize },
    /// Label not found, document stored as it was
    Unchanged,
    /// Already processed in this session
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl DocumentOutcome {
    pub fn failed(name: &str, err: &Error) -> Self {
        Self {
            name: name.to_string(),
            status: OutcomeStatus::Failed { reason: err.to_string() },
            file_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub redacted: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcomes of one batch, in input order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub generation: u64,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary { total: self.outcomes.len(), ..BatchSummary::default() };
        for outcome in &self.outcomes {
            match outcome.status {
                OutcomeStatus::Redacted { .. } => summary.redacted += 1,
                OutcomeStatus::Unchanged => summary.unchanged += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
                OutcomeStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.summary().failed > 0
    }
}

/// Sanitizes each file and hands it to a [`FileSink`], one at a time
pub struct BatchProcessor<S> {
    sanitizer: DocumentSanitizer,
    sink: S,
    folder_id: String,
}

impl<S: FileSink> BatchProcessor<S> {
    pub fn new(sanitizer: DocumentSanitizer, sink: S, folder_id: impl Into<String>) -> Self {
        Self { sanitizer, sink, folder_id: folder_id.into() }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn process(&self, session: &mut UploadSession, files: Vec<UploadedFile>) -> BatchReport {
        self.process_items(session, files.into_iter().map(BatchItem::from).collect()).await
    }

    /// Failures are recorded per document, in input order, and never stop the batch
    #[instrument(skip_all, fields(items = items.len(), generation = session.generation()))]
    pub async fn process_items(&self, session: &mut UploadSession, items: Vec<BatchItem>) -> BatchReport {
        let mut report = BatchReport { generation: session.generation(), outcomes: Vec::with_capacity(items.len()) };
        for item in items {
            let outcome = match item {
                BatchItem::File(file) => self.process_one(session, file).await,
                BatchItem::Unreadable { name, error } => {
                    error!("❌ Cannot read {}: {}", name, error);
                    DocumentOutcome::failed(&name, &error)
                }
            };
            report.outcomes.push(outcome);
        }

        let summary = report.summary();
        info!(
            "📊 Batch done: {} total, {} redacted, {} unchanged, {} skipped, {} failed",
            summary.total, summary.redacted, summary.unchanged, summary.skipped, summary.failed
        );
        report
    }

    async fn process_one(&self, session: &mut UploadSession, file: UploadedFile) -> DocumentOutcome {
        if session.is_processed(&file.name) {
            info!("⏭️ {} already processed in this session", file.name);
            return DocumentOutcome { name: file.name, status: OutcomeStatus::Skipped, file_id: None };
        }

        let result = match self.sanitizer.sanitize(&file.bytes) {
            Ok(result) => result,
            Err(e) => {
                warn!("❌ {} could not be sanitized: {}", file.name, e);
                return DocumentOutcome::failed(&file.name, &e);
            }
        };

        let status = if result.redacted {
            OutcomeStatus::Redacted {
                regions: result.regions_redacted(),
                annotations_removed: result.annotations_removed(),
            }
        } else {
            OutcomeStatus::Unchanged
        };

        match self.sink.upload(&file.name, &self.folder_id, PDF_MIME, result.bytes).await {
            Ok(stored) => {
                session.mark_processed(&file.name);
                DocumentOutcome { name: file.name, status, file_id: Some(stored.id) }
            }
            Err(e) => {
                error!("❌ Upload of {} failed: {}", file.name, e);
                DocumentOutcome::failed(&file.name, &e)
            }
        }
    }
}
