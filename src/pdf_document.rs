//! PDF Document abstraction over lopdf
//! Created: 2025-06-03
//! Author: kartik4905
//!
//! `PdfDocument` owns a decoded lopdf document for the length of one
//! sanitizer pass and hands out `PdfPage` views that implement the narrow
//! redaction interface. Nothing outside this module touches lopdf objects
//! directly, apart from the content helpers it calls.

use std::collections::HashSet;

use lopdf::content::Operation;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::cleaner::{erase_regions, PendingFill};
use crate::content::font_processor::{name_of, resolve_array, resolve_number, stream_bytes};
use crate::content::{decode_content, encode_content, FontSet, TextLayer};
use crate::error::{ContentError, DecodeError, EncodeError, Result};
use crate::scanner::PhraseMatcher;
use crate::types::{
    Annotation, AnnotationHandle, FillColor, MatchRegion, RedactableDocument, RedactablePage, Rect,
};

/// How far into the buffer the `%PDF-` marker may appear
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A decoded document, released when dropped
#[derive(Debug)]
pub struct PdfDocument {
    inner: lopdf::Document,
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty.into());
        }
        let head = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
        if !head.windows(5).any(|w| w == b"%PDF-") {
            let preview: String = String::from_utf8_lossy(&bytes[..bytes.len().min(8)]).into_owned();
            return Err(DecodeError::InvalidHeader(format!("expected %PDF-, found {:?}", preview)).into());
        }

        let inner = lopdf::Document::load_mem(bytes).map_err(|e| {
            if contains(bytes, b"/Encrypt") {
                DecodeError::Encrypted
            } else {
                DecodeError::Malformed(e.to_string())
            }
        })?;
        if inner.trailer.get(b"Encrypt").is_ok() {
            return Err(DecodeError::Encrypted.into());
        }

        let pages: Vec<ObjectId> = inner.get_pages().into_values().collect();
        debug!("Loaded PDF {} with {} pages, {} objects", inner.version, pages.len(), inner.objects.len());
        Ok(Self { inner, pages })
    }

    /// The underlying lopdf document
    pub fn document(&self) -> &lopdf::Document {
        &self.inner
    }

    /// Positioned glyphs of the page at `index` (0-based)
    pub fn text_layer(&self, index: usize) -> Result<TextLayer> {
        let id = self.page_id(index)?;
        let ops = page_operations(&self.inner, id)?;
        Ok(TextLayer::from_operations(&ops, &FontSet::for_page(&self.inner, id)))
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| ContentError::MissingPage(index as u32 + 1).into())
    }
}

impl Drop for PdfDocument {
    fn drop(&mut self) {
        debug!("Releasing document with {} pages", self.pages.len());
    }
}

impl RedactableDocument for PdfDocument {
    type Page<'a> = PdfPage<'a>;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&mut self, index: usize) -> Result<PdfPage<'_>> {
        let id = self.page_id(index)?;
        Ok(PdfPage {
            doc: &mut self.inner,
            id,
            number: index as u32 + 1,
            pending: Vec::new(),
        })
    }

    fn serialize(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.inner
            .save_to(&mut out)
            .map_err(|e| EncodeError::Serialize(e.to_string()))?;
        Ok(out)
    }
}

/// One page of a [`PdfDocument`], with its queued fills
pub struct PdfPage<'a> {
    doc: &'a mut lopdf::Document,
    id: ObjectId,
    number: u32,
    pending: Vec<PendingFill>,
}

impl<'a> PdfPage<'a> {
    pub fn text_layer(&self) -> Result<TextLayer> {
        let ops = page_operations(self.doc, self.id)?;
        Ok(TextLayer::from_operations(&ops, &FontSet::for_page(self.doc, self.id)))
    }

    fn page_dict_mut(&mut self) -> Result<&mut Dictionary> {
        let id = self.id;
        self.doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|_| ContentError::InvalidPage(id).into())
    }

    /// Content stream objects referenced by pages other than this one
    fn shared_contents(&self) -> HashSet<ObjectId> {
        self.doc
            .get_pages()
            .into_values()
            .filter(|id| *id != self.id)
            .flat_map(|id| self.doc.get_page_contents(id))
            .collect()
    }

    /// Points `/Contents` at a fresh stream and drops the old streams
    fn replace_contents(&mut self, content: Vec<u8>) -> Result<()> {
        let old_streams = self.doc.get_page_contents(self.id);
        let old_holder = match self.doc.get_dictionary(self.id).and_then(|d| d.get(b"Contents")) {
            Ok(Object::Reference(id)) if !old_streams.contains(id) => Some(*id),
            _ => None,
        };
        let shared = self.shared_contents();

        let new_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        self.page_dict_mut()?.set("Contents", Object::Reference(new_id));

        for id in old_streams.into_iter().chain(old_holder) {
            if !shared.contains(&id) {
                self.doc.objects.remove(&id);
            }
        }
        Ok(())
    }

    /// Where the page keeps its `/Annots` array: inline or an indirect object
    fn annots_location(&self) -> Option<Option<ObjectId>> {
        match self.doc.get_dictionary(self.id).ok()?.get(b"Annots").ok()? {
            Object::Reference(id) => Some(Some(*id)),
            Object::Array(_) => Some(None),
            _ => None,
        }
    }

    fn annots_mut(&mut self, location: Option<ObjectId>) -> Result<&mut Vec<Object>> {
        let invalid = |e: lopdf::Error| ContentError::InvalidAnnotations(e.to_string());
        match location {
            Some(id) => Ok(self.doc.get_object_mut(id).and_then(Object::as_array_mut).map_err(invalid)?),
            None => Ok(self
                .page_dict_mut()?
                .get_mut(b"Annots")
                .and_then(Object::as_array_mut)
                .map_err(invalid)?),
        }
    }
}

impl RedactablePage for PdfPage<'_> {
    fn number(&self) -> u32 {
        self.number
    }

    fn find_text_regions(&self, phrase: &str) -> Result<Vec<MatchRegion>> {
        let matcher = PhraseMatcher::new(phrase)?;
        if matcher.is_empty() {
            return Ok(Vec::new());
        }
        let layer = self.text_layer().inspect_err(|e| {
            warn!("Text search failed on page {}: {}", self.number, e);
        })?;
        Ok(matcher.find_regions(&layer, self.number))
    }

    fn fill_region(&mut self, region: &MatchRegion, color: FillColor) {
        self.pending.push(PendingFill { rect: region.rect, color });
    }

    fn commit_redactions(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let fills = std::mem::take(&mut self.pending);
        let ops = page_operations(self.doc, self.id)?;
        let fonts = FontSet::for_page(self.doc, self.id);

        let outcome = erase_regions(ops, &fonts, &fills);
        let encoded = encode_content(outcome.operations)?;
        self.replace_contents(encoded)?;

        debug!("Committed {} fills on page {}", fills.len(), self.number);
        Ok(outcome.glyphs_removed)
    }

    fn annotations(&self) -> Result<Vec<Annotation>> {
        let doc = &*self.doc;
        let page = doc.get_dictionary(self.id).map_err(|_| ContentError::InvalidPage(self.id))?;
        let Some(entries) = page.get(b"Annots").ok().and_then(|obj| resolve_array(doc, obj)) else {
            return Ok(Vec::new());
        };

        let mut annotations = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let (handle, dict) = match entry {
                Object::Reference(id) => match doc.get_dictionary(*id) {
                    Ok(dict) => (AnnotationHandle::Object(id.0, id.1), dict),
                    Err(_) => continue,
                },
                Object::Dictionary(dict) => (AnnotationHandle::Inline(index), dict),
                _ => continue,
            };
            let Some(rect) = annotation_rect(doc, dict) else {
                continue;
            };
            annotations.push(Annotation {
                handle,
                subtype: name_of(dict, b"Subtype").unwrap_or_default(),
                rect,
            });
        }
        Ok(annotations)
    }

    fn remove_annotation(&mut self, handle: AnnotationHandle) -> Result<bool> {
        let Some(location) = self.annots_location() else {
            return Ok(false);
        };
        let annots = self.annots_mut(location)?;

        let position = match handle {
            AnnotationHandle::Object(num, gen) => annots
                .iter()
                .position(|obj| matches!(obj, Object::Reference(id) if *id == (num, gen))),
            AnnotationHandle::Inline(index) => {
                matches!(annots.get(index), Some(Object::Dictionary(_))).then_some(index)
            }
        };
        let Some(position) = position else {
            return Ok(false);
        };
        annots.remove(position);

        if let AnnotationHandle::Object(num, gen) = handle {
            let id = (num, gen);
            // widgets stay reachable from the form, so only unlink them
            let is_widget = self
                .doc
                .get_dictionary(id)
                .ok()
                .and_then(|d| name_of(d, b"Subtype"))
                .is_some_and(|s| s == "Widget");
            if !is_widget {
                self.doc.objects.remove(&id);
            }
        }
        Ok(true)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Decoded operations of all content streams of a page, in order
fn page_operations(doc: &lopdf::Document, page_id: ObjectId) -> Result<Vec<Operation>> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        if let Ok(Object::Stream(stream)) = doc.get_object(id) {
            content.extend(stream_bytes(stream));
            content.push(b'\n');
        }
    }
    decode_content(&content)
}

fn annotation_rect(doc: &lopdf::Document, dict: &Dictionary) -> Option<Rect> {
    let values = resolve_array(doc, dict.get(b"Rect").ok()?)?;
    let nums: Vec<f64> = values.iter().filter_map(|v| resolve_number(doc, v)).collect();
    match nums.as_slice() {
        [x0, y0, x1, y1] => Some(Rect::new(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}
