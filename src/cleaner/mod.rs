//! Cleaner modules: content rewriting and page redaction
//! Author: kartik4091

pub mod content_rewriter;
pub mod redactor;

pub use content_rewriter::{erase_regions, PendingFill, RewriteOutcome};
pub use redactor::Redactor;
