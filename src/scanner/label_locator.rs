//! Label Locator
//! Author: kartik4091
//! Created: 2025-06-12

use tracing::{debug, instrument};

use crate::config::SanitizerConfig;
use crate::error::Result;
use crate::types::{MatchRegion, RedactablePage};

/// Finds every occurrence of a configured label on a page
#[derive(Debug, Clone)]
pub struct LabelLocator {
    phrase: String,
}

impl LabelLocator {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self { phrase: phrase.into() }
    }

    pub fn from_config(config: &SanitizerConfig) -> Self {
        Self::new(config.target_phrase.clone())
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Ordered match regions of the phrase on `page`; empty when absent
    #[instrument(skip(self, page), fields(page = page.number()))]
    pub fn locate<P: RedactablePage>(&self, page: &P) -> Result<Vec<MatchRegion>> {
        if self.phrase.trim().is_empty() {
            return Ok(Vec::new());
        }
        let regions = page.find_text_regions(&self.phrase)?;
        if !regions.is_empty() {
            debug!("Found {} regions for {:?}", regions.len(), self.phrase);
        }
        Ok(regions)
    }
}
