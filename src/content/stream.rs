//! Content stream decoding and encoding
//! Author: kartik4091
//! Created: 2025-06-16
//!
//! lopdf's content parser stops at the first inline image and reports the
//! operations before it as a complete stream. Inline images are therefore
//! cut out here and carried through as one opaque operation, and every
//! segment handed to lopdf is checked against a count of its operators so a
//! short parse is an error rather than a silently truncated page.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use crate::error::{ContentError, EncodeError, Result};

/// Operator of the placeholder holding a raw `BI … ID … EI` sequence
pub const INLINE_IMAGE: &str = "BI";

/// Decodes a page content stream, keeping inline images byte for byte
pub fn decode_content(bytes: &[u8]) -> Result<Vec<Operation>> {
    let mut lexer = Lexer::new(bytes);
    let mut operations = Vec::new();
    let mut segment_start = 0;
    let mut operators = 0;

    while let Some(token) = lexer.next_token() {
        let Token::Operator(start, end) = token else {
            continue;
        };
        if &bytes[start..end] != b"BI" {
            operators += 1;
            continue;
        }

        decode_segment(&bytes[segment_start..start], operators, &mut operations)?;
        let image_end = lexer.skip_inline_image()?;
        operations.push(Operation::new(
            INLINE_IMAGE,
            vec![Object::String(bytes[start..image_end].to_vec(), StringFormat::Literal)],
        ));
        segment_start = image_end;
        operators = 0;
    }

    decode_segment(&bytes[segment_start..], operators, &mut operations)?;
    Ok(operations)
}

/// Encodes operations produced by [`decode_content`]
pub fn encode_content(operations: Vec<Operation>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut run = Vec::new();

    for op in operations {
        match inline_image_bytes(&op) {
            Some(raw) => {
                flush_run(&mut run, &mut out)?;
                out.extend_from_slice(raw);
                out.push(b'\n');
            }
            None => run.push(op),
        }
    }
    flush_run(&mut run, &mut out)?;
    Ok(out)
}

pub fn is_inline_image(op: &Operation) -> bool {
    inline_image_bytes(op).is_some()
}

fn inline_image_bytes(op: &Operation) -> Option<&[u8]> {
    match op.operands.as_slice() {
        [Object::String(raw, _)] if op.operator == INLINE_IMAGE => Some(raw.as_slice()),
        _ => None,
    }
}

fn flush_run(run: &mut Vec<Operation>, out: &mut Vec<u8>) -> Result<()> {
    if run.is_empty() {
        return Ok(());
    }
    let encoded = Content { operations: std::mem::take(run) }
        .encode()
        .map_err(|e| EncodeError::Content(e.to_string()))?;
    out.extend_from_slice(&encoded);
    out.push(b'\n');
    Ok(())
}

fn decode_segment(segment: &[u8], expected: usize, operations: &mut Vec<Operation>) -> Result<()> {
    if expected == 0 {
        return Ok(());
    }
    let decoded = Content::decode(segment)
        .map_err(|e| ContentError::Unparseable(e.to_string()))?
        .operations;
    if decoded.len() < expected {
        return Err(ContentError::Unparseable(format!(
            "content parser stopped after {} of {} operators",
            decoded.len(),
            expected
        ))
        .into());
    }
    operations.extend(decoded);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// Byte range of a bare keyword
    Operator(usize, usize),
    Operand,
}

/// Just enough of the content syntax to tell operators from operands
struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.peek().is_some_and(|b| b != b'\n' && b != b'\r') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let b = self.peek()?;
        match b {
            b'(' => self.skip_literal_string(),
            b'<' if self.bytes.get(self.pos + 1) == Some(&b'<') => self.pos += 2,
            b'>' if self.bytes.get(self.pos + 1) == Some(&b'>') => self.pos += 2,
            b'<' => {
                while self.peek().is_some_and(|b| b != b'>') {
                    self.pos += 1;
                }
                self.pos += 1;
            }
            b'/' => {
                self.pos += 1;
                self.skip_regular();
            }
            b'[' | b']' | b'{' | b'}' | b')' | b'>' => self.pos += 1,
            _ => {
                let start = self.pos;
                self.skip_regular();
                let word = &self.bytes[start..self.pos];
                let is_operand = matches!(word[0], b'0'..=b'9' | b'+' | b'-' | b'.')
                    || matches!(word, b"true" | b"false" | b"null");
                return Some(if is_operand { Token::Operand } else { Token::Operator(start, self.pos) });
            }
        }
        Some(Token::Operand)
    }

    fn skip_regular(&mut self) {
        while self.peek().is_some_and(|b| !is_whitespace(b) && !is_delimiter(b)) {
            self.pos += 1;
        }
    }

    fn skip_literal_string(&mut self) {
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Moves past the image dictionary and data that follow a `BI`, returning
    /// the offset just after the closing `EI`
    fn skip_inline_image(&mut self) -> Result<usize> {
        loop {
            match self.next_token() {
                Some(Token::Operator(start, end)) if &self.bytes[start..end] == b"ID" => break,
                Some(_) => {}
                None => return Err(ContentError::Unparseable("inline image without ID".into()).into()),
            }
        }

        // one whitespace byte separates ID from the data
        let data_start = (self.pos + 1).min(self.bytes.len());
        let mut i = data_start;
        while i + 2 <= self.bytes.len() {
            let preceded = i == data_start || is_whitespace(self.bytes[i - 1]);
            let followed = self.bytes.get(i + 2).map_or(true, |b| is_whitespace(*b) || is_delimiter(*b));
            if preceded && followed && &self.bytes[i..i + 2] == b"EI" {
                self.pos = i + 2;
                return Ok(self.pos);
            }
            i += 1;
        }
        Err(ContentError::Unparseable("inline image without EI".into()).into())
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}
