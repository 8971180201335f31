//! Text layer extraction from page content streams
//! Author: kartik4091
//! Created: 2025-06-10
//!
//! Interprets the text and graphics state operators of a content stream and
//! reports every text-showing operation as a list of positioned glyphs in
//! default user space. The same walk drives both searching and rewriting, so
//! the two always agree on where a glyph is.

use lopdf::content::Operation;
use lopdf::Object;

use super::font_processor::{fallback_font, number, CharCode, FontSet, PdfFont};
use crate::types::{Matrix, Rect};

/// Operator that produced a [`TextShow`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShowOperator {
    /// `Tj`
    Show,
    /// `TJ`
    ShowPositioned,
    /// `'`
    NextLineShow,
    /// `"`
    NextLineSpacedShow { word_spacing: f64, char_spacing: f64 },
}

#[derive(Debug, Clone)]
pub struct ShownGlyph {
    pub code: CharCode,
    pub text: String,
    pub rect: Rect,
    pub origin: (f64, f64),
    /// Em size in user space
    pub size: f64,
    /// Horizontal displacement in thousandths of the font size, spacing included
    pub advance: f64,
}

#[derive(Debug, Clone)]
pub enum ShowItem {
    Glyph(ShownGlyph),
    /// `TJ` adjustment, in thousandths of the font size
    Adjust(f64),
}

/// One text-showing operation, decomposed
#[derive(Debug, Clone)]
pub struct TextShow {
    pub op_index: usize,
    pub operator: ShowOperator,
    pub font_size: f64,
    pub composite: bool,
    pub items: Vec<ShowItem>,
}

impl TextShow {
    pub fn glyphs(&self) -> impl Iterator<Item = &ShownGlyph> {
        self.items.iter().filter_map(|item| match item {
            ShowItem::Glyph(g) => Some(g),
            ShowItem::Adjust(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

struct Interpreter<'f> {
    fonts: &'f FontSet,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
}

impl<'f> Interpreter<'f> {
    fn new(fonts: &'f FontSet) -> Self {
        Self {
            fonts,
            state: GraphicsState::default(),
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn font(&self) -> &'f PdfFont {
        let fonts = self.fonts;
        self.state
            .text
            .font
            .as_deref()
            .and_then(|name| fonts.get(name))
            .unwrap_or_else(|| fallback_font())
    }

    fn show_string(&mut self, bytes: &[u8], items: &mut Vec<ShowItem>) {
        let font = self.font();
        let ts = self.state.text.clone();

        for code in font.decode_codes(bytes) {
            let w0 = font.width(code.code) / 1000.0;
            let trm = Matrix::new(ts.size * ts.h_scale, 0.0, 0.0, ts.size, 0.0, ts.rise)
                .then(&self.tm)
                .then(&self.state.ctm);
            let rect = trm.transform_rect(&Rect::new(0.0, font.descent / 1000.0, w0, font.ascent / 1000.0));
            let origin = trm.apply(0.0, 0.0);
            let size = (trm.c * trm.c + trm.d * trm.d).sqrt();

            let spacing = ts.char_spacing + if code.is_word_space() { ts.word_spacing } else { 0.0 };
            let tx = (w0 * ts.size + spacing) * ts.h_scale;
            let advance = if ts.size.abs() > f64::EPSILON {
                w0 * 1000.0 + spacing * 1000.0 / ts.size
            } else {
                0.0
            };

            let text = font.unicode(&code);
            items.push(ShowItem::Glyph(ShownGlyph { code, text, rect, origin, size, advance }));
            self.tm = Matrix::translate(tx, 0.0).then(&self.tm);
        }
    }

    fn adjust(&mut self, amount: f64, items: &mut Vec<ShowItem>) {
        let ts = &self.state.text;
        let tx = -amount / 1000.0 * ts.size * ts.h_scale;
        self.tm = Matrix::translate(tx, 0.0).then(&self.tm);
        items.push(ShowItem::Adjust(amount));
    }

    fn step(&mut self, op_index: usize, op: &Operation) -> Option<TextShow> {
        let nums: Vec<f64> = op.operands.iter().filter_map(number).collect();
        let ts = &mut self.state.text;

        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" if nums.len() == 6 => {
                let m = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                self.state.ctm = m.then(&self.state.ctm);
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    ts.font = Some(name.clone());
                }
                if let Some(size) = op.operands.get(1).and_then(number) {
                    ts.size = size;
                }
            }
            "Tc" if !nums.is_empty() => ts.char_spacing = nums[0],
            "Tw" if !nums.is_empty() => ts.word_spacing = nums[0],
            "Tz" if !nums.is_empty() => ts.h_scale = nums[0] / 100.0,
            "TL" if !nums.is_empty() => ts.leading = nums[0],
            "Ts" if !nums.is_empty() => ts.rise = nums[0],
            "Td" if nums.len() == 2 => self.next_line(nums[0], nums[1]),
            "TD" if nums.len() == 2 => {
                ts.leading = -nums[1];
                self.next_line(nums[0], nums[1]);
            }
            "Tm" if nums.len() == 6 => {
                self.tlm = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                self.tm = self.tlm;
            }
            "T*" => {
                let leading = ts.leading;
                self.next_line(0.0, -leading);
            }
            "Tj" | "'" | "\"" => {
                let operator = match op.operator.as_str() {
                    "Tj" => ShowOperator::Show,
                    "'" => ShowOperator::NextLineShow,
                    _ => {
                        let (Some(aw), Some(ac)) = (
                            op.operands.first().and_then(number),
                            op.operands.get(1).and_then(number),
                        ) else {
                            return None;
                        };
                        ts.word_spacing = aw;
                        ts.char_spacing = ac;
                        ShowOperator::NextLineSpacedShow { word_spacing: aw, char_spacing: ac }
                    }
                };
                if operator != ShowOperator::Show {
                    let leading = ts.leading;
                    self.next_line(0.0, -leading);
                }
                let Some(Object::String(bytes, _)) = op.operands.last() else {
                    return None;
                };
                let mut items = Vec::new();
                self.show_string(bytes, &mut items);
                return Some(self.finish(op_index, operator, items));
            }
            "TJ" => {
                let Some(Object::Array(parts)) = op.operands.first() else {
                    return None;
                };
                let mut items = Vec::new();
                for part in parts {
                    match part {
                        Object::String(bytes, _) => self.show_string(bytes, &mut items),
                        other => {
                            if let Some(amount) = number(other) {
                                self.adjust(amount, &mut items);
                            }
                        }
                    }
                }
                return Some(self.finish(op_index, ShowOperator::ShowPositioned, items));
            }
            _ => {}
        }

        None
    }

    fn finish(&self, op_index: usize, operator: ShowOperator, items: Vec<ShowItem>) -> TextShow {
        TextShow {
            op_index,
            operator,
            font_size: self.state.text.size,
            composite: self.font().is_composite(),
            items,
        }
    }
}

/// Walks `ops` and hands every text-showing operation to `visit`
pub fn walk_text(ops: &[Operation], fonts: &FontSet, mut visit: impl FnMut(TextShow)) {
    let mut interpreter = Interpreter::new(fonts);
    for (index, op) in ops.iter().enumerate() {
        if let Some(show) = interpreter.step(index, op) {
            visit(show);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Glyph {
    pub text: String,
    pub rect: Rect,
    pub origin: (f64, f64),
    pub size: f64,
    pub op_index: usize,
}

/// Positioned glyphs of a page in content-stream order
#[derive(Debug, Clone, Default)]
pub struct TextLayer {
    pub glyphs: Vec<Glyph>,
}

impl TextLayer {
    pub fn from_operations(ops: &[Operation], fonts: &FontSet) -> Self {
        let mut glyphs = Vec::new();
        walk_text(ops, fonts, |show| {
            glyphs.extend(show.glyphs().map(|g| Glyph {
                text: g.text.clone(),
                rect: g.rect,
                origin: g.origin,
                size: g.size,
                op_index: show.op_index,
            }));
        });
        Self { glyphs }
    }

    /// Concatenated glyph text, without any inferred spacing
    pub fn raw_text(&self) -> String {
        self.glyphs.iter().map(|g| g.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
