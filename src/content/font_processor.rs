//! Font resolution for text extraction
//! Author: kartik4091
//! Created: 2025-06-09
//!
//! Resolves the `/Font` resources visible to a page into [`PdfFont`]s that
//! know how to split a shown string into character codes, how wide each code
//! is, and which Unicode text it stands for.

use std::collections::HashMap;
use std::sync::OnceLock;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use super::cmap::{code_value, CMap};

/// Helvetica advance widths for codes 32..=126, in glyph space units
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

const DEFAULT_ASCENT: f64 = 718.0;
const DEFAULT_DESCENT: f64 = -207.0;
const MAX_PARENT_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinMetrics {
    Helvetica,
    Monospace,
}

#[derive(Debug, Clone)]
enum FontKind {
    Simple {
        first_char: u32,
        widths: Vec<f64>,
        builtin: Option<BuiltinMetrics>,
    },
    Composite {
        default_width: f64,
        widths: HashMap<u32, f64>,
        encoding: Option<CMap>,
    },
}

/// A font as far as text positioning and extraction are concerned
#[derive(Debug, Clone)]
pub struct PdfFont {
    kind: FontKind,
    missing_width: f64,
    to_unicode: Option<CMap>,
    pub ascent: f64,
    pub descent: f64,
}

/// One character code taken from a shown string
#[derive(Debug, Clone, PartialEq)]
pub struct CharCode {
    pub bytes: Vec<u8>,
    pub code: u32,
}

impl CharCode {
    /// Word spacing only applies to the single-byte code 32
    pub fn is_word_space(&self) -> bool {
        self.bytes.len() == 1 && self.code == 32
    }
}

impl PdfFont {
    /// Metrics used when a `Tf` names a font the page does not define
    pub fn fallback() -> Self {
        Self {
            kind: FontKind::Simple { first_char: 0, widths: Vec::new(), builtin: Some(BuiltinMetrics::Helvetica) },
            missing_width: 500.0,
            to_unicode: None,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
        }
    }

    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let subtype = name_of(dict, b"Subtype").unwrap_or_default();
        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|obj| resolve_stream(doc, obj))
            .map(|stream| CMap::parse(&stream_bytes(stream)));

        if subtype == "Type0" {
            Self::composite(doc, dict, to_unicode)
        } else {
            Self::simple(doc, dict, to_unicode)
        }
    }

    fn simple(doc: &Document, dict: &Dictionary, to_unicode: Option<CMap>) -> Self {
        let first_char = dict.get(b"FirstChar").ok().and_then(number).unwrap_or(0.0).max(0.0) as u32;
        let widths: Vec<f64> = dict
            .get(b"Widths")
            .ok()
            .and_then(|obj| resolve_array(doc, obj))
            .map(|arr| arr.iter().map(|w| resolve_number(doc, w).unwrap_or(0.0)).collect())
            .unwrap_or_default();

        let base_font = name_of(dict, b"BaseFont").unwrap_or_default();
        let builtin = if widths.is_empty() {
            Some(if base_font.contains("Courier") { BuiltinMetrics::Monospace } else { BuiltinMetrics::Helvetica })
        } else {
            None
        };

        let descriptor = dict.get(b"FontDescriptor").ok().and_then(|obj| resolve_dict(doc, obj));
        let (ascent, descent, missing_width) = descriptor_metrics(descriptor);

        Self {
            kind: FontKind::Simple { first_char, widths, builtin },
            missing_width: missing_width.unwrap_or(if builtin.is_some() { 500.0 } else { 0.0 }),
            to_unicode,
            ascent,
            descent,
        }
    }

    fn composite(doc: &Document, dict: &Dictionary, to_unicode: Option<CMap>) -> Self {
        let descendant = dict
            .get(b"DescendantFonts")
            .ok()
            .and_then(|obj| resolve_array(doc, obj))
            .and_then(|arr| arr.first())
            .and_then(|obj| resolve_dict(doc, obj));

        let default_width = descendant
            .and_then(|d| d.get(b"DW").ok())
            .and_then(number)
            .unwrap_or(1000.0);
        let widths = descendant
            .and_then(|d| d.get(b"W").ok())
            .and_then(|obj| resolve_array(doc, obj))
            .map(|arr| parse_cid_widths(doc, arr))
            .unwrap_or_default();

        // Predefined CMaps such as Identity-H are two-byte; embedded ones declare their codespace
        let encoding = dict
            .get(b"Encoding")
            .ok()
            .and_then(|obj| resolve_stream(doc, obj))
            .map(|stream| CMap::parse(&stream_bytes(stream)))
            .filter(CMap::has_codespaces);

        let descriptor = descendant
            .and_then(|d| d.get(b"FontDescriptor").ok())
            .and_then(|obj| resolve_dict(doc, obj));
        let (ascent, descent, _) = descriptor_metrics(descriptor);

        Self {
            kind: FontKind::Composite { default_width, widths, encoding },
            missing_width: default_width,
            to_unicode,
            ascent,
            descent,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, FontKind::Composite { .. })
    }

    /// Splits a shown string into character codes
    pub fn decode_codes(&self, bytes: &[u8]) -> Vec<CharCode> {
        let mut codes = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            let rest = &bytes[i..];
            let len = match &self.kind {
                FontKind::Simple { .. } => 1,
                FontKind::Composite { encoding, .. } => encoding
                    .as_ref()
                    .and_then(|cmap| cmap.code_length(rest))
                    .or_else(|| self.to_unicode.as_ref().filter(|c| c.has_codespaces()).and_then(|c| c.code_length(rest)))
                    .unwrap_or(2),
            };
            let len = len.min(rest.len());
            let code_bytes = rest[..len].to_vec();
            codes.push(CharCode { code: code_value(&code_bytes), bytes: code_bytes });
            i += len;
        }

        codes
    }

    /// Advance width in glyph space units (1/1000 of text space)
    pub fn width(&self, code: u32) -> f64 {
        match &self.kind {
            FontKind::Simple { first_char, widths, builtin } => {
                if code >= *first_char {
                    if let Some(w) = widths.get((code - first_char) as usize) {
                        return *w;
                    }
                }
                match builtin {
                    Some(BuiltinMetrics::Monospace) => 600.0,
                    Some(BuiltinMetrics::Helvetica) if (32..=126).contains(&code) => {
                        f64::from(HELVETICA_WIDTHS[(code - 32) as usize])
                    }
                    _ => self.missing_width,
                }
            }
            FontKind::Composite { default_width, widths, encoding } => {
                let cid = Self::cid(encoding.as_ref(), code);
                widths.get(&cid).copied().unwrap_or(*default_width)
            }
        }
    }

    /// CID selected by a composite code.
    ///
    /// Embedded CMaps are consulted; codes they leave unmapped select CID 0.
    /// Without one the encoding is taken as Identity, which is wrong for
    /// predefined non-Identity CMaps such as `UniGB-UCS2-H` (widths then fall
    /// back to `/DW` for most codes).
    fn cid(encoding: Option<&CMap>, code: u32) -> u32 {
        match encoding.filter(|cmap| cmap.has_cid_mappings()) {
            Some(cmap) => cmap.cid(code).unwrap_or(0),
            None => code,
        }
    }

    /// Unicode text of a code; unmapped composite codes become U+FFFD
    pub fn unicode(&self, code: &CharCode) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|cmap| cmap.lookup(code.code)) {
            return text;
        }
        match self.kind {
            FontKind::Simple { .. } => char::from_u32(code.code)
                .filter(|c| !c.is_control())
                .map(String::from)
                .unwrap_or_default(),
            FontKind::Composite { .. } => "\u{FFFD}".to_string(),
        }
    }
}

/// Shared Helvetica-metrics font for undefined or missing `Tf` resources
pub fn fallback_font() -> &'static PdfFont {
    static FALLBACK: OnceLock<PdfFont> = OnceLock::new();
    FALLBACK.get_or_init(PdfFont::fallback)
}

/// Fonts visible to one page, keyed by resource name
#[derive(Debug, Clone, Default)]
pub struct FontSet {
    fonts: HashMap<Vec<u8>, PdfFont>,
}

impl FontSet {
    pub fn for_page(doc: &Document, page_id: ObjectId) -> Self {
        let mut fonts = HashMap::new();

        if let Some(font_dict) = page_resources(doc, page_id)
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|obj| resolve_dict(doc, obj))
        {
            for (name, value) in font_dict.iter() {
                if let Some(dict) = resolve_dict(doc, value) {
                    fonts.insert(name.clone(), PdfFont::from_dict(doc, dict));
                }
            }
        }

        debug!("Resolved {} fonts for page object {:?}", fonts.len(), page_id);
        Self { fonts }
    }

    pub fn insert(&mut self, name: &[u8], font: PdfFont) {
        self.fonts.insert(name.to_vec(), font);
    }

    pub fn get(&self, name: &[u8]) -> Option<&PdfFont> {
        self.fonts.get(name)
    }
}

/// Walks up the page tree until a `/Resources` entry is found
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = Some(page_id);
    for _ in 0..MAX_PARENT_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(res) = dict.get(b"Resources") {
            return resolve_dict(doc, res);
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
    }
    None
}

pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub fn resolve_number(doc: &Document, obj: &Object) -> Option<f64> {
    number(resolve(doc, obj))
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn resolve_array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    match resolve(doc, obj) {
        Object::Array(arr) => Some(arr),
        _ => None,
    }
}

fn resolve_stream<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Stream> {
    match resolve(doc, obj) {
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

pub fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream.decompressed_content().unwrap_or_else(|_| stream.content.clone())
}

pub fn name_of(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn descriptor_metrics(descriptor: Option<&Dictionary>) -> (f64, f64, Option<f64>) {
    fn read(descriptor: Option<&Dictionary>, key: &[u8]) -> Option<f64> {
        descriptor.and_then(|d| d.get(key).ok()).and_then(number)
    }
    let ascent = read(descriptor, b"Ascent").filter(|a| *a > 0.0).unwrap_or(DEFAULT_ASCENT);
    let descent = read(descriptor, b"Descent").filter(|d| *d < 0.0).unwrap_or(DEFAULT_DESCENT);
    (ascent, descent, read(descriptor, b"MissingWidth"))
}

/// `/W` entries come as `c [w1 w2 ...]` or `c_first c_last w`
fn parse_cid_widths(doc: &Document, arr: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;

    while i < arr.len() {
        let Some(first) = resolve_number(doc, &arr[i]) else { break };
        let first = first.max(0.0) as u32;
        match arr.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    if let Some(w) = resolve_number(doc, w) {
                        widths.insert(first.saturating_add(offset as u32), w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(w)) = (number(last), arr.get(i + 2).and_then(|o| resolve_number(doc, o))) else {
                    break;
                };
                let last = last.max(0.0) as u32;
                for cid in first..=last.min(first.saturating_add(0xFFFF)) {
                    widths.insert(cid, w);
                }
                i += 3;
            }
            None => break,
        }
    }

    widths
}
