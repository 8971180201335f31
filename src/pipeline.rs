//! Document Sanitizer Pipeline
//! Author: kartik4091
//! Created: 2025-06-05
//!
//! open → per page locate → redact → strip overlapping annotations →
//! serialize → release. Each call owns its document and drops it on every
//! exit path.

use tracing::{debug, info, instrument};

use crate::{
    cleaner::Redactor,
    config::SanitizerConfig,
    error::Result,
    hash_utils::sha256_hex,
    pdf_document::PdfDocument,
    scanner::LabelLocator,
    types::{PageRedaction, RedactableDocument, SanitizationResult},
};

/// What one pass over a decoded document produced
#[derive(Debug, Clone, Default)]
pub struct DocumentPass {
    /// Pages where the label was found, in page order
    pub pages: Vec<PageRedaction>,
    /// Serialized document, present only when something was redacted
    pub output: Option<Vec<u8>>,
}

impl DocumentPass {
    pub fn redacted(&self) -> bool {
        self.pages.iter().any(PageRedaction::matched)
    }
}

/// Removes the configured label from every page of a document
#[derive(Debug, Clone)]
pub struct DocumentSanitizer {
    config: SanitizerConfig,
    locator: LabelLocator,
    redactor: Redactor,
}

impl DocumentSanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        let locator = LabelLocator::from_config(&config);
        let redactor = Redactor::from_config(&config);
        Self { config, locator, redactor }
    }

    /// Sanitizes raw PDF bytes.
    ///
    /// When the label is not found anywhere the input bytes are returned
    /// as they are, so running the sanitizer twice yields the same output.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn sanitize(&self, bytes: &[u8]) -> Result<SanitizationResult> {
        info!("🚦 Sanitizing document ({} bytes)", bytes.len());
        let input_sha256 = sha256_hex(bytes);

        let (page_count, pass) = {
            let mut document = PdfDocument::load(bytes)?;
            let pass = self.sanitize_document(&mut document)?;
            (document.page_count(), pass)
        };

        let redacted = pass.redacted();
        let output = match pass.output {
            Some(output) => output,
            None => bytes.to_vec(),
        };
        let result = SanitizationResult {
            output_sha256: sha256_hex(&output),
            bytes: output,
            redacted,
            page_count,
            pages: pass.pages,
            input_sha256,
        };

        if redacted {
            info!(
                "✅ Removed {} label regions and {} annotations",
                result.regions_redacted(),
                result.annotations_removed()
            );
        } else {
            info!("ℹ️ Label {:?} not found; document left unchanged", self.config.target_phrase);
        }
        Ok(result)
    }

    /// Runs locate and redact over every page of an opened document
    pub fn sanitize_document<D: RedactableDocument>(&self, document: &mut D) -> Result<DocumentPass> {
        let mut pass = DocumentPass::default();

        for index in 0..document.page_count() {
            let mut page = document.page(index)?;
            let regions = self.locator.locate(&page)?;
            if regions.is_empty() {
                continue;
            }
            let outcome = self.redactor.redact_page(&mut page, &regions)?;
            debug!("Page {} redacted", outcome.page);
            pass.pages.push(outcome);
        }

        if pass.redacted() {
            pass.output = Some(document.serialize()?);
        }
        Ok(pass)
    }
}

impl Default for DocumentSanitizer {
    fn default() -> Self {
        Self::new(SanitizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ContentError, Error};
    use crate::types::{Annotation, AnnotationHandle, FillColor, MatchRegion, RedactablePage, Rect};

    /// In-memory document: page `i` contains the label when `labels[i]`
    struct FakeDocument {
        labels: Vec<bool>,
        committed: Vec<u32>,
        serialized: usize,
        fail_commit: bool,
    }

    struct FakePage<'a> {
        doc: &'a mut FakeDocument,
        number: u32,
        queued: usize,
    }

    impl RedactablePage for FakePage<'_> {
        fn number(&self) -> u32 {
            self.number
        }

        fn find_text_regions(&self, _phrase: &str) -> Result<Vec<MatchRegion>> {
            if self.doc.labels[self.number as usize - 1] {
                Ok(vec![MatchRegion { page: self.number, rect: Rect::new(0.0, 0.0, 10.0, 10.0) }])
            } else {
                Ok(Vec::new())
            }
        }

        fn fill_region(&mut self, _region: &MatchRegion, _color: FillColor) {
            self.queued += 1;
        }

        fn commit_redactions(&mut self) -> Result<usize> {
            if self.doc.fail_commit {
                return Err(ContentError::Unparseable("bad stream".into()).into());
            }
            self.doc.committed.push(self.number);
            self.doc.labels[self.number as usize - 1] = false;
            Ok(self.queued)
        }

        fn annotations(&self) -> Result<Vec<Annotation>> {
            Ok(Vec::new())
        }

        fn remove_annotation(&mut self, _handle: AnnotationHandle) -> Result<bool> {
            Ok(false)
        }
    }

    impl RedactableDocument for FakeDocument {
        type Page<'a> = FakePage<'a>;

        fn page_count(&self) -> usize {
            self.labels.len()
        }

        fn page(&mut self, index: usize) -> Result<FakePage<'_>> {
            Ok(FakePage { doc: self, number: index as u32 + 1, queued: 0 })
        }

        fn serialize(&mut self) -> Result<Vec<u8>> {
            self.serialized += 1;
            Ok(b"%PDF-fake".to_vec())
        }
    }

    fn fake(labels: &[bool]) -> FakeDocument {
        FakeDocument { labels: labels.to_vec(), committed: Vec::new(), serialized: 0, fail_commit: false }
    }

    #[test]
    fn only_matching_pages_are_committed() {
        let mut doc = fake(&[true, false, true]);
        let pass = DocumentSanitizer::default().sanitize_document(&mut doc).unwrap();
        assert!(pass.redacted());
        assert_eq!(doc.committed, vec![1, 3]);
        assert_eq!(pass.pages.len(), 2);
        assert_eq!(doc.serialized, 1);
        assert_eq!(pass.output.as_deref(), Some(&b"%PDF-fake"[..]));
    }

    #[test]
    fn no_match_skips_serialization() {
        let mut doc = fake(&[false, false]);
        let pass = DocumentSanitizer::default().sanitize_document(&mut doc).unwrap();
        assert!(!pass.redacted());
        assert!(pass.output.is_none());
        assert_eq!(doc.serialized, 0);
    }

    #[test]
    fn second_pass_finds_nothing() {
        let sanitizer = DocumentSanitizer::default();
        let mut doc = fake(&[true]);
        assert!(sanitizer.sanitize_document(&mut doc).unwrap().redacted());
        assert!(!sanitizer.sanitize_document(&mut doc).unwrap().redacted());
    }

    #[test]
    fn commit_failure_propagates() {
        let mut doc = fake(&[true]);
        doc.fail_commit = true;
        let err = DocumentSanitizer::default().sanitize_document(&mut doc).unwrap_err();
        assert!(matches!(err, Error::ContentError(_)));
        assert_eq!(doc.serialized, 0);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = DocumentSanitizer::default().sanitize(b"not a pdf").unwrap_err();
        assert!(err.is_decode());
    }
}
