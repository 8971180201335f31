//! Error types and handling for the link stripping library
//! Created: 2025-06-03 11:31:05 UTC
//! Author: kartik4905

use std::{
    error::Error as StdError,
    io,
    result::Result as StdResult,
};

use thiserror::Error;

/// Custom result type for linkstrip operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for linkstrip operations
#[derive(Error, Debug)]
#[non_exhaustive]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Encode error: {0}")]
    EncodeError(#[from] EncodeError),

    #[error("Content error: {0}")]
    ContentError(#[from] ContentError),

    #[error("Drive error: {0}")]
    DriveError(#[from] DriveError),

    #[error("Authorization error: {0}")]
    AuthError(#[from] AuthError),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Internal error: {0}")]
    InternalError(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    /// Helper for creating an `InternalError` with a boxed source
    pub fn internal<E: StdError + Send + Sync + 'static>(e: E) -> Self {
        Error::InternalError(Box::new(e))
    }

    /// True when the failure happened before any output could be produced
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::DecodeError(_))
    }
}

// -------------------- Sub-Error Categories --------------------

/// Input bytes could not be opened as a PDF document
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("Input buffer is empty")]
    Empty,

    #[error("Invalid PDF header: {0}")]
    InvalidHeader(String),

    #[error("Encrypted documents are not supported")]
    Encrypted,

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// The mutated document could not be written back to bytes
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("Content stream encoding failed: {0}")]
    Content(String),

    #[error("Document serialization failed: {0}")]
    Serialize(String),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ContentError {
    #[error("Page {0} not found")]
    MissingPage(u32),

    #[error("Page object {0:?} is not a dictionary")]
    InvalidPage((u32, u16)),

    #[error("Annotation array is malformed: {0}")]
    InvalidAnnotations(String),

    #[error("Content stream could not be parsed: {0}")]
    Unparseable(String),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DriveError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Drive API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Response(String),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider rejected the request: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Not logged in; run `linkstrip login` first")]
    NotLoggedIn,

    #[error("Redirect URL carries no authorization code")]
    MissingCode,

    #[error("Token store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::internal(err)
    }
}
