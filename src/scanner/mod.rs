//! Scanner Module: locating the target label on pages
//! Author: kartik4091
//! Created: 2025-06-03 08:45:26 UTC

pub mod label_locator;
pub mod phrase_matcher;

pub use self::{label_locator::LabelLocator, phrase_matcher::PhraseMatcher};
