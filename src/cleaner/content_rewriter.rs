//! Content stream rewriting for committed redactions
//! Author: kartik4091
//! Created: 2025-06-11
//!
//! Glyphs whose box center falls inside a redaction region are dropped from
//! their text-showing operator and replaced by an equal `TJ` displacement, so
//! the remaining glyphs keep their positions. The original content is wrapped
//! in `q … Q` and a filled rectangle is painted over every region.

use std::collections::HashMap;

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use tracing::debug;

use crate::content::{walk_text, FontSet, ShowItem, ShowOperator, ShownGlyph, TextShow};
use crate::types::{FillColor, Rect};

/// A queued redaction: area to erase and color to paint over it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingFill {
    pub rect: Rect,
    pub color: FillColor,
}

#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub operations: Vec<Operation>,
    pub glyphs_removed: usize,
}

fn is_erased(glyph: &ShownGlyph, fills: &[PendingFill]) -> bool {
    let (cx, cy) = glyph.rect.center();
    fills.iter().any(|fill| fill.rect.contains_point(cx, cy))
}

/// Accumulates the operand array of a rebuilt `TJ`
struct TjBuilder {
    parts: Vec<Object>,
    bytes: Vec<u8>,
    shift: f64,
    format: StringFormat,
}

impl TjBuilder {
    fn new(format: StringFormat) -> Self {
        Self { parts: Vec::new(), bytes: Vec::new(), shift: 0.0, format }
    }

    fn flush_bytes(&mut self) {
        if !self.bytes.is_empty() {
            let bytes = std::mem::take(&mut self.bytes);
            self.parts.push(Object::String(bytes, self.format));
        }
    }

    fn flush_shift(&mut self) {
        if self.shift.abs() > 1e-6 {
            self.parts.push(Object::Real(self.shift as f32));
        }
        self.shift = 0.0;
    }

    fn keep(&mut self, glyph: &ShownGlyph) {
        self.flush_shift();
        self.bytes.extend_from_slice(&glyph.code.bytes);
    }

    fn displace(&mut self, amount: f64) {
        self.flush_bytes();
        self.shift += amount;
    }

    fn finish(mut self) -> Vec<Object> {
        self.flush_bytes();
        self.flush_shift();
        self.parts
    }
}

/// Rebuilds one text-showing operation without its erased glyphs
fn rebuild(show: &TextShow, fills: &[PendingFill]) -> (Vec<Operation>, usize) {
    let format = if show.composite { StringFormat::Hexadecimal } else { StringFormat::Literal };
    let mut builder = TjBuilder::new(format);
    let mut removed = 0;

    for item in &show.items {
        match item {
            ShowItem::Glyph(glyph) if is_erased(glyph, fills) => {
                // a TJ number n moves the pen by -n/1000 of the font size
                builder.displace(-glyph.advance);
                removed += 1;
            }
            ShowItem::Glyph(glyph) => builder.keep(glyph),
            ShowItem::Adjust(amount) => builder.displace(*amount),
        }
    }

    let mut ops = Vec::new();
    match show.operator {
        ShowOperator::Show | ShowOperator::ShowPositioned => {}
        ShowOperator::NextLineShow => ops.push(Operation::new("T*", vec![])),
        ShowOperator::NextLineSpacedShow { word_spacing, char_spacing } => {
            ops.push(Operation::new("Tw", vec![Object::Real(word_spacing as f32)]));
            ops.push(Operation::new("Tc", vec![Object::Real(char_spacing as f32)]));
            ops.push(Operation::new("T*", vec![]));
        }
    }
    ops.push(Operation::new("TJ", vec![Object::Array(builder.finish())]));

    (ops, removed)
}

fn fill_operations(fill: &PendingFill) -> Vec<Operation> {
    let r = fill.rect;
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![Object::Real(fill.color.r), Object::Real(fill.color.g), Object::Real(fill.color.b)],
        ),
        Operation::new(
            "re",
            vec![
                Object::Real(r.x0 as f32),
                Object::Real(r.y0 as f32),
                Object::Real(r.width() as f32),
                Object::Real(r.height() as f32),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Removes glyphs under `fills` from `ops` and paints the fills on top
pub fn erase_regions(ops: Vec<Operation>, fonts: &FontSet, fills: &[PendingFill]) -> RewriteOutcome {
    if fills.is_empty() {
        return RewriteOutcome { operations: ops, glyphs_removed: 0 };
    }

    let mut replacements: HashMap<usize, Vec<Operation>> = HashMap::new();
    let mut glyphs_removed = 0;

    walk_text(&ops, fonts, |show| {
        if show.glyphs().any(|g| is_erased(g, fills)) {
            let (rebuilt, removed) = rebuild(&show, fills);
            glyphs_removed += removed;
            replacements.insert(show.op_index, rebuilt);
        }
    });

    debug!(
        "Rewriting {} text operations, {} glyphs erased, {} fills",
        replacements.len(),
        glyphs_removed,
        fills.len()
    );

    let mut operations = Vec::with_capacity(ops.len() + 2 + fills.len() * 5);
    operations.push(Operation::new("q", vec![]));
    for (index, op) in ops.into_iter().enumerate() {
        match replacements.remove(&index) {
            Some(rebuilt) => operations.extend(rebuilt),
            None => operations.push(op),
        }
    }
    operations.push(Operation::new("Q", vec![]));
    for fill in fills {
        operations.extend(fill_operations(fill));
    }

    RewriteOutcome { operations, glyphs_removed }
}
