//! Plain-text extraction from RTF documents.
//!
//! Quotations exported from word processors arrive as RTF. Only the visible
//! text matters for price detection, so formatting is dropped: destination
//! groups (font and colour tables, metadata, pictures) are skipped, paragraph
//! and table controls become line breaks and tabs.
//!
//! Text reaches the output two ways. `\'xx` escapes are code page bytes and
//! are decoded with `\ansicpgN` when the header has one. Raw 8-bit bytes are
//! whatever the writing program used, often UTF-8 regardless of the header,
//! so their encoding is chosen by scoring the whole document.

use crate::encoding::{TextEncoding, decode_best, detect_encoding, encoding_for_codepage};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn without_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Whether `bytes` start with an RTF header (UTF-8 BOM and leading
/// whitespace allowed).
pub fn is_rtf(bytes: &[u8]) -> bool {
    without_bom(bytes).trim_ascii_start().starts_with(b"{\\rtf")
}

/// Destinations whose content is never visible text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "xmlnstbl",
    "object",
    "objdata",
    "fldinst",
    "filetbl",
    "revtbl",
];

/// Decoded output, keeping 8-bit bytes apart until their encoding is known.
#[derive(Debug)]
enum Segment {
    Text(String),
    /// From `\'xx` escapes.
    Escaped(Vec<u8>),
    /// Unescaped non-ASCII bytes.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, Copy)]
struct Group {
    skip: bool,
    /// `\ucN`: fallback characters following each `\uN`.
    unicode_skip: usize,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            skip: false,
            unicode_skip: 1,
        }
    }
}

struct Stripper<'a> {
    /// The whole document, BOM included.
    document: &'a [u8],
    input: &'a [u8],
    pos: usize,
    groups: Vec<Group>,
    current: Group,
    segments: Vec<Segment>,
    codepage: Option<u32>,
    /// Fallback characters still to drop after a `\uN`.
    pending_fallback: usize,
    high_surrogate: Option<u16>,
}

impl<'a> Stripper<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            document: input,
            input: without_bom(input),
            pos: 0,
            groups: Vec::new(),
            current: Group::default(),
            segments: Vec::new(),
            codepage: None,
            pending_fallback: 0,
            high_surrogate: None,
        }
    }

    fn push_str(&mut self, s: &str) {
        if self.current.skip {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Text(text)) => text.push_str(s),
            _ => self.segments.push(Segment::Text(s.to_string())),
        }
    }

    fn push_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.push_str(c.encode_utf8(&mut buf));
    }

    fn push_byte(&mut self, b: u8, raw: bool) {
        if self.current.skip {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Raw(bytes)) if raw => bytes.push(b),
            Some(Segment::Escaped(bytes)) if !raw => bytes.push(b),
            _ if raw => self.segments.push(Segment::Raw(vec![b])),
            _ => self.segments.push(Segment::Escaped(vec![b])),
        }
    }

    /// Consume one fallback character if a `\uN` is still owed some.
    fn take_fallback(&mut self) -> bool {
        if self.pending_fallback > 0 {
            self.pending_fallback -= 1;
            true
        } else {
            false
        }
    }

    fn run(mut self) -> String {
        while let Some(&b) = self.input.get(self.pos) {
            self.pos += 1;
            match b {
                b'{' => {
                    self.groups.push(self.current);
                    self.pending_fallback = 0;
                }
                b'}' => {
                    self.current = self.groups.pop().unwrap_or_default();
                    self.pending_fallback = 0;
                }
                b'\\' => self.control(),
                b'\r' | b'\n' => {}
                _ => {
                    if self.take_fallback() {
                        continue;
                    }
                    if b.is_ascii() {
                        self.push_char(char::from(b));
                    } else {
                        self.push_byte(b, true);
                    }
                }
            }
        }
        self.finish()
    }

    fn control(&mut self) {
        let Some(&b) = self.input.get(self.pos) else {
            return;
        };
        if !b.is_ascii_alphabetic() {
            self.pos += 1;
            self.control_symbol(b);
            return;
        }

        let start = self.pos;
        while self.input.get(self.pos).is_some_and(u8::is_ascii_alphabetic) {
            self.pos += 1;
        }
        let word = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();

        let num_start = self.pos;
        if self.input.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        while self.input.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        let param = std::str::from_utf8(&self.input[num_start..self.pos])
            .ok()
            .and_then(|s| s.parse::<i64>().ok());
        if self.input.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }

        self.control_word(&word, param);
    }

    fn control_symbol(&mut self, symbol: u8) {
        match symbol {
            b'\'' => {
                let hex = self.input.get(self.pos..self.pos + 2);
                let byte = hex
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                if let Some(byte) = byte {
                    self.pos += 2;
                    if !self.take_fallback() {
                        self.push_byte(byte, false);
                    }
                }
            }
            b'*' => self.current.skip = true,
            b'\\' | b'{' | b'}' => {
                if !self.take_fallback() {
                    self.push_char(char::from(symbol));
                }
            }
            b'~' => self.push_char('\u{00A0}'),
            b'_' => self.push_char('-'),
            b'\r' | b'\n' => self.push_char('\n'),
            _ => {}
        }
    }

    fn control_word(&mut self, word: &str, param: Option<i64>) {
        if SKIPPED_DESTINATIONS.contains(&word) {
            self.current.skip = true;
            return;
        }
        match word {
            "par" | "line" | "row" | "sect" | "page" => self.push_char('\n'),
            "tab" | "cell" => self.push_char('\t'),
            "emdash" => self.push_char('\u{2014}'),
            "endash" => self.push_char('\u{2013}'),
            "bullet" => self.push_char('\u{2022}'),
            "lquote" => self.push_char('\u{2018}'),
            "rquote" => self.push_char('\u{2019}'),
            "ldblquote" => self.push_char('\u{201C}'),
            "rdblquote" => self.push_char('\u{201D}'),
            "ansicpg" => self.codepage = param.and_then(|p| u32::try_from(p).ok()),
            "uc" => self.current.unicode_skip = param.and_then(|p| usize::try_from(p).ok()).unwrap_or(1),
            "u" => {
                if let Some(p) = param {
                    self.unicode(p);
                }
            }
            "bin" => {
                let len = param.and_then(|p| usize::try_from(p).ok()).unwrap_or(0);
                self.pos = (self.pos + len).min(self.input.len());
            }
            _ => {}
        }
    }

    /// `\uN`: a signed 16-bit UTF-16 code unit.
    fn unicode(&mut self, param: i64) {
        let unit = (param as i16) as u16;
        self.pending_fallback = self.current.unicode_skip;
        match (self.high_surrogate.take(), unit) {
            (None, 0xD800..=0xDBFF) => self.high_surrogate = Some(unit),
            (Some(high), 0xDC00..=0xDFFF) => {
                let decoded = char::decode_utf16([high, unit])
                    .next()
                    .and_then(Result::ok)
                    .unwrap_or('\u{FFFD}');
                self.push_char(decoded);
            }
            (_, unit) => {
                let c = char::from_u32(u32::from(unit)).unwrap_or('\u{FFFD}');
                self.push_char(c);
            }
        }
    }

    fn finish(self) -> String {
        let escape_encoding = self
            .codepage
            .and_then(encoding_for_codepage)
            .unwrap_or_else(|| {
                let escaped: Vec<u8> = self
                    .segments
                    .iter()
                    .filter_map(|s| match s {
                        Segment::Escaped(b) => Some(b.as_slice()),
                        _ => None,
                    })
                    .flatten()
                    .copied()
                    .collect();
                if escaped.is_empty() {
                    TextEncoding::Standard(encoding_rs::WINDOWS_1252)
                } else {
                    detect_encoding(&escaped)
                }
            });
        let raw_encoding = if self.segments.iter().any(|s| matches!(s, Segment::Raw(_))) {
            decode_best(self.document).encoding
        } else {
            TextEncoding::Standard(encoding_rs::UTF_8)
        };
        tracing::debug!(
            codepage = ?self.codepage,
            escapes = escape_encoding.name(),
            raw = raw_encoding.name(),
            "decoding RTF text"
        );

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Escaped(bytes) => out.push_str(&escape_encoding.decode(bytes)),
                Segment::Raw(bytes) => out.push_str(&raw_encoding.decode(bytes)),
            }
        }
        out.trim().to_string()
    }
}

/// Strip RTF markup and return the visible text.
///
/// Malformed input (unbalanced braces, truncated escapes) is tolerated; the
/// result is whatever text could be recovered.
pub fn strip_rtf(bytes: &[u8]) -> String {
    Stripper::new(bytes).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rtf_header() {
        assert!(is_rtf(b"{\\rtf1\\ansi hello}"));
        assert!(is_rtf(b"  \n{\\rtf1}"));
        assert!(!is_rtf(b"%PDF-1.7"));
    }

    #[test]
    fn utf8_bom_before_header() {
        let rtf = b"\xEF\xBB\xBF{\\rtf1\\ansi{\\fonttbl{\\f0 Arial;}}\\f0 Total 10,00 EUR\\par}";
        assert!(is_rtf(rtf));
        assert_eq!(strip_rtf(rtf), "Total 10,00 EUR");
    }

    #[test]
    fn raw_utf8_ignores_ansicpg() {
        let rtf = "{\\rtf1\\ansi\\ansicpg1253{\\fonttbl{\\f0 Arial;}}\\f0 Σύνολο: 55,80\\par}";
        assert_eq!(strip_rtf(rtf.as_bytes()), "Σύνολο: 55,80");
    }

    #[test]
    fn raw_utf8_next_to_code_page_escapes() {
        let rtf = "{\\rtf1\\ansicpg1253 Σύνολο \\'80 5,00}";
        assert_eq!(strip_rtf(rtf.as_bytes()), "Σύνολο € 5,00");
    }

    #[test]
    fn raw_legacy_bytes_are_scored() {
        let rtf = b"{\\rtf1\\ansi\\ansicpg1253 \xD3\xFD\xED\xEF\xEB\xEF: 55,80}";
        assert_eq!(strip_rtf(rtf), "Σύνολο: 55,80");
    }

    #[test]
    fn plain_paragraphs() {
        let text = strip_rtf(b"{\\rtf1\\ansi Item A 12,50\\par Item B 7,00\\par}");
        assert_eq!(text, "Item A 12,50\nItem B 7,00");
    }

    #[test]
    fn skips_destination_groups() {
        let rtf = b"{\\rtf1{\\fonttbl{\\f0 Times 12.50;}}{\\colortbl;\\red0\\green0\\blue0;}\
                    {\\*\\generator Writer 9.99;}\\f0 Total 12,50}";
        assert_eq!(strip_rtf(rtf), "Total 12,50");
    }

    #[test]
    fn greek_escapes_with_ansicpg() {
        let rtf = b"{\\rtf1\\ansi\\ansicpg1253{\\fonttbl{\\f0 Arial;}}\\f0 \
                    \\'d4\\'e9\\'ec\\'de: 45,00 \\'80\\par}";
        assert_eq!(strip_rtf(rtf), "Τιμή: 45,00 €");
    }

    #[test]
    fn greek_escapes_without_codepage_are_detected() {
        let rtf = b"{\\rtf1\\ansi \\'d3\\'fd\\'ed\\'ef\\'eb\\'ef 100,00}";
        assert_eq!(strip_rtf(rtf), "Σύνολο 100,00");
    }

    #[test]
    fn e6_escape_is_greek_zeta() {
        let rtf = b"{\\rtf1\\ansicpg1253 \\'e6}";
        assert_eq!(strip_rtf(rtf), "ζ");
    }

    #[test]
    fn unicode_escapes_skip_fallback() {
        let rtf = b"{\\rtf1\\uc1 \\u932?\\u953?\\u956?\\u942? 9,90}";
        assert_eq!(strip_rtf(rtf), "Τιμή 9,90");
    }

    #[test]
    fn unicode_fallback_can_be_an_escape() {
        let rtf = b"{\\rtf1\\uc1 \\u8364\\'80 5,00}";
        assert_eq!(strip_rtf(rtf), "€ 5,00");
    }

    #[test]
    fn uc0_has_no_fallback() {
        let rtf = b"{\\rtf1\\uc0 \\u8364 5}";
        assert_eq!(strip_rtf(rtf), "€5");
    }

    #[test]
    fn tabs_and_cells() {
        let rtf = b"{\\rtf1 Qty\\tab Price\\cell 2\\cell 4,00\\row}";
        assert_eq!(strip_rtf(rtf), "Qty\tPrice\t2\t4,00");
    }

    #[test]
    fn escaped_braces_and_backslash() {
        let rtf = b"{\\rtf1 a\\{b\\}c\\\\d}";
        assert_eq!(strip_rtf(rtf), "a{b}c\\d");
    }

    #[test]
    fn unbalanced_input_is_tolerated() {
        assert_eq!(strip_rtf(b"{\\rtf1 open 3,00"), "open 3,00");
        assert_eq!(strip_rtf(b"}}text"), "text");
        assert_eq!(strip_rtf(b"{\\rtf1 trailing\\"), "trailing");
    }

    #[test]
    fn empty_input() {
        assert_eq!(strip_rtf(b""), "");
    }
}
