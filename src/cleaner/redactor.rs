//! Region redaction over a single page
//! Author: kartik4091
//! Created: 2025-06-11

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::SanitizerConfig;
use crate::error::Result;
use crate::types::{AnnotationHandle, FillColor, MatchRegion, PageRedaction, RedactablePage};

/// Erases located regions and strips the annotations lying over them
#[derive(Debug, Clone)]
pub struct Redactor {
    fill: FillColor,
    remove_overlapping_annotations: bool,
}

impl Redactor {
    pub fn new(fill: FillColor) -> Self {
        Self { fill, remove_overlapping_annotations: true }
    }

    pub fn from_config(config: &SanitizerConfig) -> Self {
        Self {
            fill: config.fill_color,
            remove_overlapping_annotations: config.remove_overlapping_annotations,
        }
    }

    pub fn with_annotation_removal(mut self, enabled: bool) -> Self {
        self.remove_overlapping_annotations = enabled;
        self
    }

    /// Fills and commits every region, then removes intersecting annotations.
    ///
    /// Annotations are only read after the commit, since committing rewrites
    /// the page. Each annotation is removed at most once even when it overlaps
    /// several regions.
    pub fn redact_page<P: RedactablePage>(&self, page: &mut P, regions: &[MatchRegion]) -> Result<PageRedaction> {
        let number = page.number();
        let mut outcome = PageRedaction { page: number, ..PageRedaction::default() };
        if regions.is_empty() {
            return Ok(outcome);
        }

        for region in regions {
            page.fill_region(region, self.fill);
        }
        outcome.glyphs_removed = page.commit_redactions()?;
        outcome.regions = regions.to_vec();

        if self.remove_overlapping_annotations {
            outcome.annotations_removed = self.strip_annotations(page, regions)?;
        }

        debug!(
            "Page {}: {} regions, {} glyphs erased, {} annotations removed",
            number,
            outcome.regions.len(),
            outcome.glyphs_removed,
            outcome.annotations_removed
        );
        Ok(outcome)
    }

    fn strip_annotations<P: RedactablePage>(&self, page: &mut P, regions: &[MatchRegion]) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut doomed: Vec<AnnotationHandle> = page
            .annotations()?
            .into_iter()
            .filter(|annot| regions.iter().any(|r| annot.rect.intersects(&r.rect)))
            .map(|annot| annot.handle)
            .filter(|handle| seen.insert(*handle))
            .collect();

        // inline entries are addressed by position: drop them back to front,
        // before any removal by object id shifts the array
        doomed.sort_by(|a, b| match (a, b) {
            (AnnotationHandle::Inline(x), AnnotationHandle::Inline(y)) => y.cmp(x),
            (AnnotationHandle::Inline(_), AnnotationHandle::Object(..)) => std::cmp::Ordering::Less,
            (AnnotationHandle::Object(..), AnnotationHandle::Inline(_)) => std::cmp::Ordering::Greater,
            (AnnotationHandle::Object(..), AnnotationHandle::Object(..)) => std::cmp::Ordering::Equal,
        });

        let mut removed = 0;
        for handle in doomed {
            if page.remove_annotation(handle)? {
                removed += 1;
            } else {
                warn!("Annotation {:?} on page {} was already gone", handle, page.number());
            }
        }
        Ok(removed)
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(FillColor::WHITE)
    }
}
