//! ToUnicode CMap support.
//!
//! A font's `/ToUnicode` stream maps character codes to Unicode text through
//! `bfchar` (single code) and `bfrange` (code range) sections. The CMap is
//! PostScript-like, so it is read with the content stream tokenizer.

use std::collections::HashMap;

use crate::error::BackendError;
use crate::tokenizer::{Operand, tokenize};

/// Character code to Unicode mapping parsed from a ToUnicode stream.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    mappings: HashMap<u32, String>,
    /// Bytes per character code, from `codespacerange` (1 when absent).
    code_width: usize,
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn utf16be(bytes: &[u8]) -> String {
    if bytes.len() == 1 {
        return char::from(bytes[0]).to_string();
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Increment the last UTF-16 unit of a destination string, for ranges.
fn offset_destination(bytes: &[u8], offset: u32) -> String {
    let mut bytes = bytes.to_vec();
    if bytes.len() >= 2 {
        let n = bytes.len();
        let last = u16::from_be_bytes([bytes[n - 2], bytes[n - 1]]).wrapping_add(offset as u16);
        bytes[n - 2..].copy_from_slice(&last.to_be_bytes());
    } else if let Some(b) = bytes.last_mut() {
        *b = b.wrapping_add(offset as u8);
    }
    utf16be(&bytes)
}

/// Guard against absurd ranges in broken CMaps.
const MAX_RANGE: u32 = 0x1_0000;

impl ToUnicodeMap {
    /// Parse the decoded bytes of a ToUnicode stream.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut mappings = HashMap::new();
        let mut code_width = 0;

        for op in tokenize(data)? {
            match op.operator.as_str() {
                "endcodespacerange" => {
                    if let Some(Operand::Str(lo)) = op.operands.first() {
                        code_width = code_width.max(lo.len());
                    }
                }
                "endbfchar" => {
                    for pair in op.operands.chunks_exact(2) {
                        if let (Operand::Str(src), Operand::Str(dst)) = (&pair[0], &pair[1]) {
                            code_width = code_width.max(src.len());
                            mappings.insert(code_of(src), utf16be(dst));
                        }
                    }
                }
                "endbfrange" => {
                    for triple in op.operands.chunks_exact(3) {
                        let (Operand::Str(lo), Operand::Str(hi)) = (&triple[0], &triple[1]) else {
                            continue;
                        };
                        code_width = code_width.max(lo.len());
                        let (lo, hi) = (code_of(lo), code_of(hi));
                        if hi < lo || hi - lo > MAX_RANGE {
                            continue;
                        }
                        match &triple[2] {
                            Operand::Str(dst) => {
                                for offset in 0..=hi - lo {
                                    mappings.insert(lo + offset, offset_destination(dst, offset));
                                }
                            }
                            Operand::Array(items) => {
                                for (offset, item) in (0..=hi - lo).zip(items) {
                                    if let Operand::Str(dst) = item {
                                        mappings.insert(lo + offset, utf16be(dst));
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            mappings,
            code_width: code_width.max(1),
        })
    }

    pub fn code_width(&self) -> usize {
        self.code_width
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Decode a shown string. Unmapped codes become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes
            .chunks(self.code_width)
            .map(|chunk| self.get(code_of(chunk)).unwrap_or("\u{FFFD}"))
            .collect()
    }
}
