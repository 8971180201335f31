use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::geometry::{FillColor, Rect};

/// Area on one page where the target phrase was found
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchRegion {
    /// 1-based page number
    pub page: u32,
    pub rect: Rect,
}

/// Where an annotation lives inside the page's `/Annots` array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationHandle {
    /// Indirect annotation object
    Object(u32, u16),
    /// Dictionary stored inline in the array, by position at listing time
    Inline(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub handle: AnnotationHandle,
    pub subtype: String,
    pub rect: Rect,
}

impl Annotation {
    pub fn is_link(&self) -> bool {
        self.subtype == "Link"
    }
}

/// Outcome of redacting a single page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRedaction {
    pub page: u32,
    pub regions: Vec<MatchRegion>,
    pub glyphs_removed: usize,
    pub annotations_removed: usize,
}

impl PageRedaction {
    pub fn matched(&self) -> bool {
        !self.regions.is_empty()
    }
}

/// Output of one sanitizer invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub redacted: bool,
    pub page_count: usize,
    pub pages: Vec<PageRedaction>,
    pub input_sha256: String,
    pub output_sha256: String,
}

impl SanitizationResult {
    pub fn regions_redacted(&self) -> usize {
        self.pages.iter().map(|p| p.regions.len()).sum()
    }

    pub fn annotations_removed(&self) -> usize {
        self.pages.iter().map(|p| p.annotations_removed).sum()
    }
}

/// The operations the redaction core needs from a page, and nothing more.
///
/// Implementations queue fills with [`fill_region`](Self::fill_region) and
/// apply them in [`commit_redactions`](Self::commit_redactions); annotation
/// geometry must only be read after the commit.
pub trait RedactablePage {
    /// 1-based page number
    fn number(&self) -> u32;

    fn find_text_regions(&self, phrase: &str) -> Result<Vec<MatchRegion>>;

    fn fill_region(&mut self, region: &MatchRegion, color: FillColor);

    /// Applies queued fills, returning the number of glyphs erased
    fn commit_redactions(&mut self) -> Result<usize>;

    fn annotations(&self) -> Result<Vec<Annotation>>;

    /// Returns false when the annotation is no longer on the page
    fn remove_annotation(&mut self, handle: AnnotationHandle) -> Result<bool>;
}

/// A decoded document that hands out pages in order and serializes back to bytes
pub trait RedactableDocument {
    type Page<'a>: RedactablePage
    where
        Self: 'a;

    fn page_count(&self) -> usize;

    /// Page by 0-based index
    fn page(&mut self, index: usize) -> Result<Self::Page<'_>>;

    fn serialize(&mut self) -> Result<Vec<u8>>;
}
