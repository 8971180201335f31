//! Content processing module: fonts, CMaps and the page text layer
//! Created: 2025-06-03 15:29:09 UTC
//! Author: kartik4091

pub mod cmap;
pub mod font_processor;
pub mod stream;
pub mod text_layer;

pub use cmap::CMap;
pub use font_processor::{FontSet, PdfFont};
pub use stream::{decode_content, encode_content};
pub use text_layer::{walk_text, Glyph, ShowItem, ShowOperator, ShownGlyph, TextLayer, TextShow};
