//! ToUnicode / encoding CMap parsing
//! Author: kartik4091
//! Created: 2025-06-09
//!
//! Only the parts needed to read text back out of a page: codespace ranges
//! (how many bytes make one character code), `bfchar` / `bfrange`
//! mappings to Unicode, and the `cidchar` / `cidrange` mappings of embedded
//! encoding CMaps.

use std::collections::HashMap;

/// Inclusive byte-wise range of valid codes of a given length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodespaceRange {
    pub low: Vec<u8>,
    pub high: Vec<u8>,
}

impl CodespaceRange {
    pub fn len(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() == self.low.len()
            && bytes
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(b, (lo, hi))| lo <= b && b <= hi)
    }
}

#[derive(Debug, Clone)]
enum RangeTarget {
    /// Destination of the first code; later codes increment its last unit
    Offset(Vec<u16>),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct BfRange {
    low: u32,
    high: u32,
    target: RangeTarget,
}

#[derive(Debug, Clone, Default)]
pub struct CMap {
    codespaces: Vec<CodespaceRange>,
    chars: HashMap<u32, String>,
    ranges: Vec<BfRange>,
    cid_chars: HashMap<u32, u32>,
    /// `(low, high, first CID)`
    cid_ranges: Vec<(u32, u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Keyword(String),
    Other,
}

impl CMap {
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = CMap::default();
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Keyword(k) if k == "begincodespacerange" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(lo), Token::Hex(hi)) if lo.len() == hi.len() => {
                                cmap.codespaces.push(CodespaceRange { low: lo.clone(), high: hi.clone() });
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Keyword(k) if k == "beginbfchar" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(src), Token::Hex(dst)) => {
                                cmap.chars.insert(code_value(src), utf16_string(dst));
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Keyword(k) if k == "beginbfrange" => {
                    i += 1;
                    while i + 2 < tokens.len() {
                        let (low, high) = match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(lo), Token::Hex(hi)) => (code_value(lo), code_value(hi)),
                            _ => break,
                        };
                        match &tokens[i + 2] {
                            Token::Hex(dst) => {
                                cmap.ranges.push(BfRange { low, high, target: RangeTarget::Offset(utf16_units(dst)) });
                                i += 3;
                            }
                            Token::ArrayStart => {
                                let mut list = Vec::new();
                                i += 3;
                                while i < tokens.len() {
                                    match &tokens[i] {
                                        Token::Hex(dst) => list.push(utf16_string(dst)),
                                        Token::ArrayEnd => break,
                                        _ => {}
                                    }
                                    i += 1;
                                }
                                i += 1;
                                cmap.ranges.push(BfRange { low, high, target: RangeTarget::List(list) });
                            }
                            _ => break,
                        }
                    }
                }
                Token::Keyword(k) if k == "begincidchar" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], integer(&tokens[i + 1])) {
                            (Token::Hex(src), Some(cid)) => {
                                cmap.cid_chars.insert(code_value(src), cid);
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Keyword(k) if k == "begincidrange" => {
                    i += 1;
                    while i + 2 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1], integer(&tokens[i + 2])) {
                            (Token::Hex(lo), Token::Hex(hi), Some(cid)) => {
                                cmap.cid_ranges.push((code_value(lo), code_value(hi), cid));
                                i += 3;
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }

        cmap
    }

    pub fn has_cid_mappings(&self) -> bool {
        !self.cid_chars.is_empty() || !self.cid_ranges.is_empty()
    }

    /// CID selected by `code`, if the CMap maps it
    pub fn cid(&self, code: u32) -> Option<u32> {
        if let Some(cid) = self.cid_chars.get(&code) {
            return Some(*cid);
        }
        self.cid_ranges
            .iter()
            .find(|(low, high, _)| *low <= code && code <= *high)
            .map(|(low, _, first)| first.saturating_add(code - low))
    }

    pub fn has_codespaces(&self) -> bool {
        !self.codespaces.is_empty()
    }

    /// Length in bytes of the code starting at `bytes[0]`, if a codespace matches
    pub fn code_length(&self, bytes: &[u8]) -> Option<usize> {
        (1..=4)
            .take_while(|n| *n <= bytes.len())
            .find(|n| self.codespaces.iter().any(|r| r.matches(&bytes[..*n])))
    }

    pub fn lookup(&self, code: u32) -> Option<String> {
        if let Some(s) = self.chars.get(&code) {
            return Some(s.clone());
        }
        self.ranges
            .iter()
            .find(|r| r.low <= code && code <= r.high)
            .and_then(|r| {
                let offset = code - r.low;
                match &r.target {
                    RangeTarget::Offset(units) => {
                        let mut units = units.clone();
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        Some(String::from_utf16_lossy(&units))
                    }
                    RangeTarget::List(list) => list.get(offset as usize).cloned(),
                }
            })
    }
}

pub fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn integer(token: &Token) -> Option<u32> {
    match token {
        Token::Keyword(word) => word.parse().ok(),
        _ => None,
    }
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16_string(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b if b.is_ascii_whitespace() || b == 0 => i += 1,
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(Token::Other);
                i += 2;
            }
            b'>' => {
                tokens.push(Token::Other);
                i += if data.get(i + 1) == Some(&b'>') { 2 } else { 1 };
            }
            b'<' => {
                i += 1;
                let mut digits = Vec::new();
                while i < data.len() && data[i] != b'>' {
                    if data[i].is_ascii_hexdigit() {
                        digits.push(data[i]);
                    }
                    i += 1;
                }
                i += 1;
                if digits.len() % 2 == 1 {
                    digits.push(b'0');
                }
                let bytes = digits
                    .chunks(2)
                    .filter_map(|pair| std::str::from_utf8(pair).ok())
                    .filter_map(|s| u8::from_str_radix(s, 16).ok())
                    .collect();
                tokens.push(Token::Hex(bytes));
            }
            b'(' => {
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
                tokens.push(Token::Other);
            }
            _ => {
                let start = i;
                i += 1;
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                let word = String::from_utf8_lossy(&data[start..i]).into_owned();
                tokens.push(Token::Keyword(word));
            }
        }
    }

    tokens
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'[' | b']' | b'<' | b'>' | b'(' | b')' | b'/' | b'%' | b'{' | b'}')
}
