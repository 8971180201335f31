//! Main Library File for the Link Disposisi sanitizer
//! Locates a printed label on every page of a PDF, erases it together
//! with the link annotations lying over it, and hands the result to a
//! storage backend.

// Configuration and Core Pipeline
pub mod config;
pub mod error;
pub mod hash_utils;
pub mod pdf_document;
pub mod pipeline;
pub mod types;

// Stage 1: Text Extraction
pub mod content;

// Stage 2: Label Location
pub mod scanner;

// Stage 3: Redaction
pub mod cleaner;

// Stage 4: Storage Collaborators
pub mod drive;
pub mod output;
pub mod session;

// Stage 5: Report Generation
pub mod report;

// Shared Utilities
pub mod utils;

// Re-exports for crate consumers
pub use cleaner::Redactor;
pub use config::{AppConfig, DisplayConfig, DriveConfig, OAuthSettings, SanitizerConfig, DEFAULT_TARGET_PHRASE};
pub use drive::{DriveClient, DriveFile, FileLister, FileSink, OAuthFlow, StoredFile, TokenSet, TokenStore};
pub use error::{Error, Result};
pub use output::LocalSink;
pub use pdf_document::PdfDocument;
pub use pipeline::DocumentSanitizer;
pub use report::{ListingFormatter, ReportFormat, ReportFormatter};
pub use scanner::LabelLocator;
pub use session::{BatchItem, BatchProcessor, BatchReport, DocumentOutcome, OutcomeStatus, UploadSession, UploadedFile};
pub use types::{FillColor, MatchRegion, PageRedaction, Rect, SanitizationResult};
