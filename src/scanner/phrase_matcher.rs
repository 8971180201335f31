//! Phrase matching over a page text layer
//! Author: kartik4091
//! Created: 2025-06-12

use regex::{Regex, RegexBuilder};

use crate::content::{Glyph, TextLayer};
use crate::error::{Error, Result};
use crate::types::{MatchRegion, Rect};

/// Baseline shift, relative to the font size, that starts a new line
const LINE_BREAK_RATIO: f64 = 0.5;
/// Horizontal gap, relative to the font size, read as a word break
const WORD_GAP_RATIO: f64 = 0.15;

/// Case-insensitive matcher where any whitespace run in the phrase matches
/// any whitespace run in the page text
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    pattern: Option<Regex>,
}

/// Page text with implicit spaces, and the glyph behind each byte
struct SearchText {
    text: String,
    owners: Vec<Option<usize>>,
}

impl PhraseMatcher {
    pub fn new(phrase: &str) -> Result<Self> {
        let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
        if words.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = RegexBuilder::new(&words.join(r"\s+"))
            .case_insensitive(true)
            .build()
            .map_err(Error::internal)?;
        Ok(Self { pattern: Some(pattern) })
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    /// Regions of every occurrence, left to right, one per line segment
    pub fn find_regions(&self, layer: &TextLayer, page: u32) -> Vec<MatchRegion> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        let search = SearchText::build(layer);

        let mut regions = Vec::new();
        for found in pattern.find_iter(&search.text) {
            let mut glyphs: Vec<usize> = search.owners[found.start()..found.end()].iter().flatten().copied().collect();
            glyphs.dedup();
            regions.extend(line_segments(&layer.glyphs, &glyphs).into_iter().map(|rect| MatchRegion { page, rect }));
        }
        regions
    }
}

impl SearchText {
    fn build(layer: &TextLayer) -> Self {
        let mut text = String::new();
        let mut owners = Vec::new();

        for (index, glyph) in layer.glyphs.iter().enumerate() {
            if index > 0 && implicit_space(&layer.glyphs[index - 1], glyph) {
                text.push(' ');
                owners.push(None);
            }
            text.push_str(&glyph.text);
            owners.extend(std::iter::repeat(Some(index)).take(glyph.text.len()));
        }

        Self { text, owners }
    }
}

fn is_blank(glyph: &Glyph) -> bool {
    glyph.text.chars().all(char::is_whitespace)
}

fn on_new_line(anchor: &Glyph, glyph: &Glyph) -> bool {
    let size = anchor.size.max(glyph.size);
    (glyph.origin.1 - anchor.origin.1).abs() > LINE_BREAK_RATIO * size
}

fn implicit_space(prev: &Glyph, next: &Glyph) -> bool {
    if is_blank(prev) || is_blank(next) {
        return false;
    }
    let size = prev.size.max(next.size);
    on_new_line(prev, next) || next.rect.x0 - prev.rect.x1 > WORD_GAP_RATIO * size
}

/// Splits matched glyphs into visual lines and returns each line's bounds
fn line_segments(glyphs: &[Glyph], matched: &[usize]) -> Vec<Rect> {
    let mut segments: Vec<(usize, Rect)> = Vec::new();

    for &index in matched {
        let glyph = &glyphs[index];
        if is_blank(glyph) {
            continue;
        }
        match segments.last_mut() {
            Some((anchor, rect)) if !on_new_line(&glyphs[*anchor], glyph) => *rect = rect.union(&glyph.rect),
            _ => segments.push((index, glyph.rect)),
        }
    }

    segments.into_iter().map(|(_, rect)| rect).collect()
}
